use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};
use ytrag_core::llm::LlmClient;
use ytrag_core::types::{EmbedQuestionRequest, PipelineRequest, TaskType};
use ytrag_db::models::Task;
use ytrag_db::{ChannelRepo, ChunkRepo, SegmentRepo, TaskNotifier, TaskStore, VideoRepo};

use crate::services::{MediaFetcher, SentenceEncoder, SpeechToText};
use crate::stages::{chunk, embed, ingest, transcribe};

/// Present but inert: the worker loop does not retry failed tasks today.
/// Kept as a documented placeholder for future bounded retry rather than
/// silently dropped (see DESIGN.md).
#[allow(dead_code)]
const MAX_RETRIES: u32 = 3;

/// The singleton collaborators and repositories a worker process needs
/// to dispatch any task type. Constructed once in `main` and shared
/// across the whole run loop — models are process-local and never
/// reloaded per task.
pub struct WorkerDeps {
    pub tasks: TaskStore,
    pub channels: ChannelRepo,
    pub videos: VideoRepo,
    pub segments: SegmentRepo,
    pub chunks: ChunkRepo,
    pub fetcher: Arc<dyn MediaFetcher>,
    pub stt: Arc<dyn SpeechToText>,
    pub encoder: Arc<dyn SentenceEncoder>,
    pub llm: Arc<dyn LlmClient>,
    pub language: String,
    pub embed_batch_size: i64,
}

enum TaskOutcome {
    Completed,
    Partial { succeeded: usize, total: usize },
    AllFailed { total: usize },
    EmbedQuestion(String),
}

/// Drives the worker's finite state machine: boot → recover → idle →
/// claimed → dispatch → finalize → idle. Exits once `shutdown`
/// reports `true`, always finishing any in-flight task first.
pub async fn run(deps: WorkerDeps, mut notifier: TaskNotifier, mut shutdown: watch::Receiver<bool>) {
    info!("worker boot");
    match deps.tasks.reset_stuck().await {
        Ok(n) if n > 0 => warn!(count = n, "recovered stuck tasks on boot"),
        Ok(_) => {}
        Err(e) => error!(error = %e, "reset_stuck failed on boot"),
    }

    loop {
        if *shutdown.borrow() {
            info!("shutdown requested, worker exiting");
            return;
        }

        let claimed = match deps.tasks.claim_one().await {
            Ok(Some(task)) => task,
            Ok(None) => {
                tokio::select! {
                    _ = notifier.wait() => continue,
                    _ = shutdown.changed() => continue,
                }
            }
            Err(e) => {
                error!(error = %e, "claim_one failed, pausing before retry");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        let task_id = claimed.id;
        info!(task_id = %task_id, task_type = %claimed.task_type, "claimed task");

        match dispatch(&deps, &claimed).await {
            Ok(TaskOutcome::Completed) => {
                if let Err(e) = deps.tasks.complete(task_id, None, None).await {
                    error!(task_id = %task_id, error = %e, "failed to mark task completed");
                }
            }
            Ok(TaskOutcome::Partial { succeeded, total }) => {
                let message = format!("{succeeded}/{total} processed");
                if let Err(e) = deps.tasks.complete(task_id, None, Some(&message)).await {
                    error!(task_id = %task_id, error = %e, "failed to mark task completed");
                }
            }
            Ok(TaskOutcome::AllFailed { total }) => {
                let message = format!("0/{total} processed");
                if let Err(e) = deps.tasks.fail(task_id, &message).await {
                    error!(task_id = %task_id, error = %e, "failed to mark task failed");
                }
            }
            Ok(TaskOutcome::EmbedQuestion(result)) => {
                if let Err(e) = deps.tasks.complete(task_id, Some(&result), None).await {
                    error!(task_id = %task_id, error = %e, "failed to mark task completed");
                }
            }
            Err(message) => {
                warn!(task_id = %task_id, error = %message, "task dispatch failed");
                if let Err(e) = deps.tasks.fail(task_id, &message).await {
                    error!(task_id = %task_id, error = %e, "failed to mark task failed");
                }
            }
        }
    }
}

async fn dispatch(deps: &WorkerDeps, task: &Task) -> Result<TaskOutcome, String> {
    match task.task_type() {
        Some(TaskType::Pipeline) => run_pipeline(deps, task).await,
        Some(TaskType::EmbedQuestion) => run_embed_question(deps, task).await,
        None => Err(format!("unknown task_type: {}", task.task_type)),
    }
}

async fn run_pipeline(deps: &WorkerDeps, task: &Task) -> Result<TaskOutcome, String> {
    let request: PipelineRequest =
        serde_json::from_value(task.request.clone()).map_err(|e| format!("invalid pipeline request: {e}"))?;

    deps.tasks
        .update_progress(task.id, 5, None)
        .await
        .map_err(|e| e.to_string())?;

    let ingest_result = ingest::ingest_channel(
        &deps.channels,
        &deps.videos,
        deps.fetcher.as_ref(),
        &request.channel_url,
        request.max_videos,
        request.download,
    )
    .await
    .map_err(|e| e.to_string())?;

    deps.tasks
        .update_progress(task.id, 10, None)
        .await
        .map_err(|e| e.to_string())?;

    let video_ids = ingest_result.new_video_ids;
    let total = video_ids.len();
    if total == 0 {
        return Ok(TaskOutcome::Completed);
    }

    let slice = 90.0 / total as f64;
    let mut succeeded = 0usize;

    for (index, video_id) in video_ids.iter().enumerate() {
        if deps
            .tasks
            .is_cancelled(task.id)
            .await
            .map_err(|e| e.to_string())?
        {
            info!(task_id = %task.id, "task cancelled externally, stopping pipeline");
            break;
        }

        let base = 10.0 + index as f64 * slice;

        match process_single_video(deps, task, video_id, base, slice).await {
            Ok(()) => succeeded += 1,
            Err(e) => warn!(video_id = %video_id, error = %e, "video processing failed"),
        }
    }

    Ok(if succeeded == 0 {
        TaskOutcome::AllFailed { total }
    } else if succeeded < total {
        TaskOutcome::Partial { succeeded, total }
    } else {
        TaskOutcome::Completed
    })
}

/// Transcribe → Chunk → Embed on a single video. A failure here never
/// aborts the pipeline task — the caller records it against the
/// video's slice and moves on to the next one.
async fn process_single_video(
    deps: &WorkerDeps,
    task: &Task,
    video_id: &str,
    base: f64,
    slice: f64,
) -> Result<(), String> {
    deps.tasks
        .update_progress(task.id, base as i32, None)
        .await
        .map_err(|e| e.to_string())?;
    transcribe::transcribe_video(&deps.segments, &deps.videos, deps.stt.as_ref(), video_id, &deps.language)
        .await
        .map_err(|e| e.to_string())?;

    deps.tasks
        .update_progress(task.id, (base + slice * 0.4) as i32, None)
        .await
        .map_err(|e| e.to_string())?;
    chunk::chunk_video(&deps.chunks, &deps.segments, deps.llm.as_ref(), video_id)
        .await
        .map_err(|e| e.to_string())?;

    deps.tasks
        .update_progress(task.id, (base + slice * 0.7) as i32, None)
        .await
        .map_err(|e| e.to_string())?;
    let scope = [video_id.to_string()];
    embed::embed_pending(&deps.chunks, deps.encoder.as_ref(), Some(&scope), deps.embed_batch_size)
        .await
        .map_err(|e| e.to_string())?;

    Ok(())
}

async fn run_embed_question(deps: &WorkerDeps, task: &Task) -> Result<TaskOutcome, String> {
    let request: EmbedQuestionRequest = serde_json::from_value(task.request.clone())
        .map_err(|e| format!("invalid embed_question request: {e}"))?;

    let vector = embed::embed_question(deps.encoder.as_ref(), &request.question_to_embed)
        .await
        .map_err(|e| e.to_string())?;

    let result = serde_json::to_string(&vector).map_err(|e| e.to_string())?;
    Ok(TaskOutcome::EmbedQuestion(result))
}
