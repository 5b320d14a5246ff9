//! The RAG orchestrator: `ask_stream` classifies the question's intent
//! and routes it across three answer strategies, streaming the result
//! back to the caller as an ordered sequence of events.

use std::pin::Pin;
use std::time::Duration;

use serde::Serialize;
use sqlx::PgPool;
use tokio_stream::Stream;
use uuid::Uuid;

use ytrag_core::llm::LlmClient;
use ytrag_core::types::{EmbedQuestionRequest, Intent, TargetIndex, TaskRequest, TaskStatus};
use ytrag_db::{ChatRepo, ChunkRepo, TaskStore, VideoRepo};
use ytrag_retriever::{deep_link, search_hybrid, HybridQuery, RetrievedChunk};

use crate::error::{RagError, Result};
use crate::prompt::{build_content_prompt, build_global_prompt, VideoSummaries};
use crate::{intent, sql_agent};

const EMBED_WAIT_TIMEOUT_SECS: u64 = ytrag_core::EMBED_WAIT_TIMEOUT_SECS;
const EMBED_WAIT_POLL_MS: u64 = ytrag_core::EMBED_WAIT_POLL_MS;
const RECENT_CONTEXT_MESSAGES: i64 = 6;

/// One event of the ndjson stream protocol. `ytrag-api` is a thin
/// serializer over this channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum RagEvent {
    #[serde(rename = "session_id")]
    SessionId(Uuid),
    #[serde(rename = "sources")]
    Sources(Vec<SourceItem>),
    #[serde(rename = "content")]
    Content(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceItem {
    pub video_id: String,
    pub start: f64,
    pub end: f64,
    pub url: String,
    pub score: f64,
}

impl From<&RetrievedChunk> for SourceItem {
    fn from(c: &RetrievedChunk) -> Self {
        SourceItem {
            video_id: c.video_id.clone(),
            start: c.start,
            end: c.end,
            url: deep_link(&c.video_id, c.start),
            score: c.score,
        }
    }
}

/// Weights and caps the orchestrator pulls from the `rag` settings
/// component, falling back to `RagConfig` defaults.
#[derive(Debug, Clone)]
pub struct RagParams {
    pub top_k: i64,
    pub vector_weight: f64,
    pub text_weight: f64,
    pub llm_temperature: f64,
    pub max_summaries_per_video: i64,
    /// Cap on how many of a channel's videos are drawn into scope when the
    /// caller didn't name any `video_ids` explicitly. Independent of
    /// `max_summaries_per_video`, which bounds per-video summaries instead.
    pub channel_scope_limit: i64,
}

pub struct RagOrchestrator {
    pool: PgPool,
    chat: ChatRepo,
    videos: VideoRepo,
    chunks: ChunkRepo,
    tasks: TaskStore,
    llm: std::sync::Arc<dyn LlmClient>,
}

pub struct AskRequest {
    pub question: String,
    pub channel_id: i64,
    pub video_ids: Vec<String>,
    pub session_id: Option<Uuid>,
}

impl RagOrchestrator {
    pub fn new(
        pool: PgPool,
        chat: ChatRepo,
        videos: VideoRepo,
        chunks: ChunkRepo,
        tasks: TaskStore,
        llm: std::sync::Arc<dyn LlmClient>,
    ) -> Self {
        Self { pool, chat, videos, chunks, tasks, llm }
    }

    /// Public streaming entry point. Returns a boxed stream of
    /// `RagEvent`s; persistence of the (user, assistant) message pair
    /// happens inline at the tail of the stream body, so it only runs
    /// if the caller drains the stream to completion — a client
    /// disconnect simply drops the stream before that point is reached,
    /// so a partial answer is never persisted.
    pub fn ask_stream(&self, req: AskRequest, params: RagParams) -> Pin<Box<dyn Stream<Item = Result<RagEvent>> + Send>> {
        let pool = self.pool.clone();
        let chat = self.chat.clone();
        let videos = self.videos.clone();
        let chunks = self.chunks.clone();
        let tasks = self.tasks.clone();
        let llm = self.llm.clone();

        let stream = async_stream::try_stream! {
            // Upsert the session, then replace its video scope if the caller supplied one.
            let session = chat
                .get_or_create_session(req.session_id, Some(req.channel_id), &derive_title(&req.question))
                .await?;
            if !req.video_ids.is_empty() {
                chat.replace_chat_videos(session.id, &req.video_ids).await?;
            }

            yield RagEvent::SessionId(session.id);

            // Enqueue the question embedding synchronously, before streaming begins.
            let embed_task = tasks
                .enqueue(
                    TaskRequest::EmbedQuestion(EmbedQuestionRequest { question_to_embed: req.question.clone() }),
                    false,
                )
                .await?;

            let classified = intent::classify_intent(llm.as_ref(), &req.question).await;

            // Restrict video_ids to the channel's library, drawing up to the
            // channel-wide scope cap when the caller didn't name any videos.
            let video_ids = videos
                .scope_to_channel(req.channel_id, &req.video_ids, params.channel_scope_limit)
                .await?;

            let mut answer = String::new();
            let mut sources: Vec<SourceItem> = Vec::new();

            match classified {
                Intent::Metadata => {
                    let text = sql_agent::handle_metadata_query(&pool, llm.as_ref(), &req.question).await?;
                    answer = text.clone();
                    yield RagEvent::Content(text);
                }

                Intent::ContentGlobal => {
                    let rows = chunks.summaries_by_video(&video_ids).await?;
                    if rows.is_empty() {
                        let text = "I do not have enough summarized information to extract \
                                    the main points from the selected videos.".to_string();
                        answer = text.clone();
                        yield RagEvent::Content(text);
                    } else {
                        let per_video = group_summaries(rows, params.max_summaries_per_video);
                        for video in &per_video {
                            for (_, start, end) in &video.summaries {
                                sources.push(SourceItem {
                                    video_id: video.video_id.clone(),
                                    start: *start,
                                    end: *end,
                                    url: deep_link(&video.video_id, *start),
                                    score: 1.0,
                                });
                            }
                        }
                        yield RagEvent::Sources(sources.clone());

                        let prompt = build_global_prompt(&per_video);
                        let (mut rx, handle) = spawn_stream(llm.clone(), prompt, params.llm_temperature);
                        while let Some(token) = rx.recv().await {
                            answer.push_str(&token);
                            yield RagEvent::Content(token);
                        }
                        let _ = handle.await;
                    }
                }

                Intent::Content => {
                    let query_vector = wait_for_embedding(&tasks, embed_task.id).await?;
                    let chat_context = chat.recent_context(session.id, RECENT_CONTEXT_MESSAGES).await?;

                    let retrieved = search_hybrid(
                        &pool,
                        HybridQuery {
                            query_text: &req.question,
                            query_embedding: query_vector.as_ref(),
                            video_ids: &video_ids,
                            target_index: TargetIndex::Summaries,
                            top_k: params.top_k,
                            vector_weight: params.vector_weight,
                            text_weight: params.text_weight,
                        },
                    )
                    .await
                    .map_err(ytrag_db::DbError::from)?;

                    if retrieved.is_empty() {
                        let text = "I couldn't find any relevant information in the selected videos.".to_string();
                        answer = text.clone();
                        yield RagEvent::Content(text);
                    } else {
                        sources = retrieved.iter().map(SourceItem::from).collect();
                        yield RagEvent::Sources(sources.clone());

                        let prompt = build_content_prompt(&req.question, &retrieved, &chat_context);
                        let (mut rx, handle) = spawn_stream(llm.clone(), prompt, params.llm_temperature);
                        while let Some(token) = rx.recv().await {
                            answer.push_str(&token);
                            yield RagEvent::Content(token);
                        }
                        let _ = handle.await;
                    }
                }
            }

            // Persist the (user, assistant) pair — only reached if the
            // stream above was fully drained.
            let sources_json = if sources.is_empty() {
                None
            } else {
                Some(serde_json::to_value(&sources).unwrap_or(serde_json::Value::Null))
            };
            chat.record_exchange(session.id, &req.question, &answer, sources_json).await?;
        };

        Box::pin(stream)
    }
}

/// Spawns the LLM's token stream on a background task and returns the
/// receiving half; keeps `ask_stream`'s generator body free of a
/// `dyn LlmClient` borrow across an `.await` boundary held inside the
/// macro-generated state machine.
fn spawn_stream(
    llm: std::sync::Arc<dyn LlmClient>,
    prompt: String,
    temperature: f64,
) -> (tokio::sync::mpsc::Receiver<String>, tokio::task::JoinHandle<()>) {
    let (tx, rx) = tokio::sync::mpsc::channel(32);
    let handle = tokio::spawn(async move {
        let turns: [ytrag_core::llm::ChatTurn; 0] = [];
        if let Err(e) = llm.stream(&prompt, &turns, temperature, tx).await {
            tracing::warn!(error = %e, "answer generation stream failed");
        }
    });
    (rx, handle)
}

/// Polls the `embed_question` task every 200ms up to its configured timeout.
async fn wait_for_embedding(tasks: &TaskStore, task_id: Uuid) -> Result<Option<pgvector::Vector>> {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(EMBED_WAIT_TIMEOUT_SECS);

    loop {
        let row = tasks.peek_status_result(task_id).await?;
        match row {
            Some((TaskStatus::Completed, Some(result))) => {
                let floats: Vec<f32> = serde_json::from_str(&result)
                    .map_err(|e| RagError::EmbedFailed(format!("invalid embedding payload: {e}")))?;
                return Ok(Some(pgvector::Vector::from(floats)));
            }
            Some((TaskStatus::Completed, None)) => return Ok(None),
            Some((TaskStatus::Failed, _)) => {
                return Err(RagError::EmbedFailed("embedding task failed in worker".to_string()))
            }
            _ => {}
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(RagError::EmbedTimeout(EMBED_WAIT_TIMEOUT_SECS));
        }
        tokio::time::sleep(Duration::from_millis(EMBED_WAIT_POLL_MS)).await;
    }
}

fn derive_title(question: &str) -> String {
    let trimmed = question.trim();
    if trimmed.len() > 80 {
        format!("{}…", &trimmed[..80])
    } else {
        trimmed.to_string()
    }
}

/// Groups summary rows by video, capping each video's contribution at
/// `max_summaries_per_video`; the per-video counter resets whenever a
/// new `video_id` is encountered.
fn group_summaries(
    rows: Vec<(String, Option<String>, f64, f64)>,
    max_summaries_per_video: i64,
) -> Vec<VideoSummaries> {
    let mut grouped: Vec<VideoSummaries> = Vec::new();
    for (video_id, summary, start, end) in rows {
        let Some(summary) = summary.filter(|s| !s.trim().is_empty()) else {
            continue;
        };

        let entry = match grouped.last_mut() {
            Some(v) if v.video_id == video_id => v,
            _ => {
                grouped.push(VideoSummaries { video_id: video_id.clone(), summaries: Vec::new() });
                grouped.last_mut().unwrap()
            }
        };

        if (entry.summaries.len() as i64) < max_summaries_per_video {
            entry.summaries.push((summary, start, end));
        }
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_title_truncates_long_questions() {
        let long = "x".repeat(100);
        let title = derive_title(&long);
        assert!(title.ends_with('…'));
        assert_eq!(title.chars().count(), 81);
    }

    #[test]
    fn group_summaries_resets_counter_per_video() {
        let rows = vec![
            ("v1".to_string(), Some("a".to_string()), 0.0, 1.0),
            ("v1".to_string(), Some("b".to_string()), 1.0, 2.0),
            ("v2".to_string(), Some("c".to_string()), 0.0, 1.0),
        ];
        let grouped = group_summaries(rows, 1);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[0].summaries.len(), 1);
        assert_eq!(grouped[1].summaries.len(), 1);
    }

    #[test]
    fn group_summaries_skips_empty_summary() {
        let rows = vec![("v1".to_string(), Some("   ".to_string()), 0.0, 1.0)];
        let grouped = group_summaries(rows, 20);
        assert!(grouped[0].summaries.is_empty());
    }
}
