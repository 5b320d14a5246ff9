use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use ytrag_db::models::Video;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    channel_id: Option<i64>,
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    100
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Video>>, ApiError> {
    let all = match query.channel_id {
        Some(channel_id) => state.videos.list_by_channel(channel_id).await?,
        None => state.videos.list_all().await?,
    };
    let page = all.into_iter().skip(query.skip).take(query.limit).collect();
    Ok(Json(page))
}

#[derive(Debug, Serialize)]
pub struct VideoWithCounts {
    #[serde(flatten)]
    pub video: Video,
    pub segment_count: usize,
    pub chunk_count: i64,
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoWithCounts>, ApiError> {
    let video = state.videos.get(&video_id).await?;
    let segments = state.segments.list_by_video(&video_id).await?;
    let chunk_count = state.chunks.count_by_video(&video_id).await?;

    Ok(Json(VideoWithCounts {
        segment_count: segments.len(),
        chunk_count,
        video,
    }))
}
