use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use ytrag_db::models::{ChatMessage, ChatSession};
use ytrag_rag::{AskRequest, RagEvent};

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

pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ChatSession>>, ApiError> {
    let all = state.chat.list_sessions(query.channel_id).await?;
    let page = all.into_iter().skip(query.skip).take(query.limit).collect();
    Ok(Json(page))
}

#[derive(Debug, Serialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: ChatSession,
    pub messages: Vec<ChatMessage>,
    pub video_ids: Vec<String>,
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionDetail>, ApiError> {
    let session = state.chat.get_session(id).await?;
    let messages = state.chat.all_messages(id).await?;
    let video_ids = state.chat.session_video_ids(id).await?;
    Ok(Json(SessionDetail {
        session,
        messages,
        video_ids,
    }))
}

pub async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    if state.chat.delete_session(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ytrag_core::YtragError::NotFound(format!("chat session {id} not found")).into())
    }
}

#[derive(Debug, Deserialize)]
pub struct AskStreamBody {
    pub question: String,
    pub channel_id: i64,
    #[serde(default)]
    pub video_ids: Vec<String>,
    pub session_id: Option<Uuid>,
}

/// Streams ndjson lines of `RagEvent`; the HTTP layer is a thin
/// serializer over the orchestrator's event channel. A mid-stream
/// `RagError` is encoded as one final `{"type":"error",...}` line
/// rather than severing the HTTP connection, since ndjson has no
/// standard trailer mechanism.
pub async fn ask_stream(State(state): State<Arc<AppState>>, Json(body): Json<AskStreamBody>) -> Response {
    let params = state.rag_params().await;
    let req = AskRequest {
        question: body.question,
        channel_id: body.channel_id,
        video_ids: body.video_ids,
        session_id: body.session_id,
    };

    let events = state.rag.ask_stream(req, params);
    let lines = events.map(|item| -> Result<Bytes, std::convert::Infallible> {
        let line = match item {
            Ok(event) => serde_json::to_string(&event).unwrap_or_default(),
            Err(e) => serde_json::json!({"type": "error", "data": e.to_string()}).to_string(),
        };
        Ok(Bytes::from(format!("{line}\n")))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from_stream(lines))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
