use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use ytrag_db::models::Channel;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
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
) -> Result<Json<Vec<Channel>>, ApiError> {
    let all = state.channels.list().await?;
    let page = all.into_iter().skip(query.skip).take(query.limit).collect();
    Ok(Json(page))
}

#[derive(Debug, Serialize)]
pub struct ChannelWithStats {
    #[serde(flatten)]
    pub channel: Channel,
    pub video_count: usize,
    pub downloaded_count: usize,
    pub transcribed_count: usize,
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<ChannelWithStats>, ApiError> {
    let channel = state.channels.get(id).await?;
    let videos = state.videos.list_by_channel(id).await?;
    let downloaded_count = videos.iter().filter(|v| v.downloaded).count();
    let transcribed_count = videos.iter().filter(|v| v.transcribed).count();

    Ok(Json(ChannelWithStats {
        video_count: videos.len(),
        downloaded_count,
        transcribed_count,
        channel,
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateChannelBody {
    pub url: String,
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateChannelBody>,
) -> Result<(StatusCode, Json<Channel>), ApiError> {
    if state.channels.get_by_url(&body.url).await?.is_some() {
        return Err(ytrag_core::YtragError::Validation("channel already exists".to_string()).into());
    }

    let name = body.url.rsplit('@').next().unwrap_or(&body.url).to_string();
    let channel = state.channels.get_or_create(&name, &body.url).await?;
    Ok((StatusCode::CREATED, Json(channel)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateChannelBody {
    pub name: Option<String>,
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateChannelBody>,
) -> Result<Json<Channel>, ApiError> {
    // ensures a 404 surfaces for an unknown id even if `name` is absent.
    let current = state.channels.get(id).await?;
    let name = body.name.unwrap_or(current.name);
    let channel = state.channels.update_name(id, &name).await?;
    Ok(Json(channel))
}

pub async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    if state.channels.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ytrag_core::YtragError::NotFound(format!("channel {id} not found")).into())
    }
}
