use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use ytrag_core::types::{PipelineRequest, TaskRequest, TaskStatus};
use ytrag_db::models::Task;

use crate::app::AppState;
use crate::error::ApiError;

/// `GET /pipeline/stats` — library-wide counts for the dashboard tile.
#[derive(Debug, Serialize)]
pub struct PipelineStats {
    pub channels: usize,
    pub videos: usize,
    pub downloaded: usize,
    pub transcribed: usize,
    pub pending_tasks: i64,
    pub running_tasks: i64,
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<PipelineStats>, ApiError> {
    let channels = state.channels.list().await?;
    let videos = state.videos.list_all().await?;
    let downloaded = videos.iter().filter(|v| v.downloaded).count();
    let transcribed = videos.iter().filter(|v| v.transcribed).count();
    let (_, pending_tasks) = state.tasks.list(Some(TaskStatus::Pending), 1, 1).await?;
    let (_, running_tasks) = state.tasks.list(Some(TaskStatus::Running), 1, 1).await?;

    Ok(Json(PipelineStats {
        channels: channels.len(),
        videos: videos.len(),
        downloaded,
        transcribed,
        pending_tasks,
        running_tasks,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct PagedTasks {
    pub items: Vec<Task>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTasksQuery>,
) -> Result<Json<PagedTasks>, ApiError> {
    let (items, total) = state.tasks.list(query.status, query.page, query.page_size).await?;
    Ok(Json(PagedTasks {
        items,
        total,
        page: query.page.max(1),
        page_size: query.page_size.clamp(1, 100),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskBody {
    pub task_type: String,
    pub channel_url: String,
    #[serde(default = "default_max_videos")]
    pub max_videos: u32,
    #[serde(default = "default_download")]
    pub download: bool,
}

fn default_max_videos() -> u32 {
    10
}

fn default_download() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct CreateTaskResponse {
    pub task_id: Uuid,
    pub status: TaskStatus,
}

/// `POST /pipeline/tasks` — the only task variant a client may submit;
/// `embed_question` is internal-only and rejected by `enqueue`'s
/// `public` flag regardless of what the caller sends here.
pub async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateTaskBody>,
) -> Result<(StatusCode, Json<CreateTaskResponse>), ApiError> {
    if body.task_type != "pipeline" {
        return Err(ytrag_core::YtragError::Validation(format!(
            "unsupported task_type: {}",
            body.task_type
        ))
        .into());
    }
    if body.max_videos == 0 || body.max_videos > 100 {
        return Err(ytrag_core::YtragError::Validation("max_videos must be between 1 and 100".into()).into());
    }

    let request = TaskRequest::Pipeline(PipelineRequest {
        channel_url: body.channel_url,
        max_videos: body.max_videos,
        download: body.download,
    });
    let task = state.tasks.enqueue(request, true).await?;

    Ok((
        StatusCode::OK,
        Json(CreateTaskResponse {
            task_id: task.id,
            status: task.status,
        }),
    ))
}

pub async fn delete_task(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Result<StatusCode, ApiError> {
    if state.tasks.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ytrag_core::YtragError::NotFound(format!("task {id} not found")).into())
    }
}

#[derive(Debug, Serialize)]
struct TaskUpdatePayload {
    #[serde(rename = "type")]
    kind: &'static str,
    task: TaskView,
}

/// Trimmed projection of `Task` for the `task_update` SSE payload —
/// omits `request`, which is internal dispatch detail the client never needs.
#[derive(Debug, Serialize)]
struct TaskView {
    id: Uuid,
    task_type: String,
    status: TaskStatus,
    progress: i32,
    error_message: Option<String>,
    result: Option<String>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&Task> for TaskView {
    fn from(t: &Task) -> Self {
        TaskView {
            id: t.id,
            task_type: t.task_type.clone(),
            status: t.status,
            progress: t.progress,
            error_message: t.error_message.clone(),
            result: t.result.clone(),
            completed_at: t.completed_at,
        }
    }
}

const SSE_POLL_INTERVAL_SECS: u64 = 5;
const SSE_RECENCY_WINDOW_SECS: i64 = 60;

/// `GET /pipeline/events` — a best-effort, at-least-once SSE broadcaster
/// over terminal task transitions. Each subscriber owns an
/// independent poll loop and an in-session `(task_id, status)` dedup set
/// seeded from the current terminal set on connect, so a client that
/// joins mid-stream never gets flooded with history.
pub async fn events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        yield Ok(Event::default().event("connected").data("{}"));

        let mut seen: HashMap<Uuid, TaskStatus> = HashMap::new();
        match state.tasks.recent_terminal(200).await {
            Ok(initial) => {
                for task in &initial {
                    seen.insert(task.id, task.status);
                }
            }
            Err(e) => {
                yield Ok(Event::default().event("error").data(e.to_string()));
            }
        }

        loop {
            tokio::time::sleep(Duration::from_secs(SSE_POLL_INTERVAL_SECS)).await;

            match state.tasks.recent_terminal(200).await {
                Ok(terminal) => {
                    let now = chrono::Utc::now();
                    for task in &terminal {
                        let within_window = task
                            .completed_at
                            .map(|c| (now - c).num_seconds() <= SSE_RECENCY_WINDOW_SECS)
                            .unwrap_or(false);
                        if !within_window {
                            continue;
                        }
                        if seen.get(&task.id) == Some(&task.status) {
                            continue;
                        }
                        seen.insert(task.id, task.status);

                        let payload = TaskUpdatePayload {
                            kind: "task_update",
                            task: TaskView::from(task),
                        };
                        match serde_json::to_string(&payload) {
                            Ok(json) => yield Ok(Event::default().event("task_update").data(json)),
                            Err(e) => yield Ok(Event::default().event("error").data(e.to_string())),
                        }
                    }
                }
                Err(e) => {
                    yield Ok(Event::default().event("error").data(e.to_string()));
                }
            }

            yield Ok(Event::default().event("heartbeat").data("{}"));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
