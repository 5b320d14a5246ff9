use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of durable task accepted by the task store.
///
/// `EmbedQuestion` is internal-only — the public task-submission endpoint
/// rejects it (see `ytrag-db::tasks::enqueue`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Pipeline,
    EmbedQuestion,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskType::Pipeline => "pipeline",
            TaskType::EmbedQuestion => "embed_question",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pipeline" => Ok(TaskType::Pipeline),
            "embed_question" => Ok(TaskType::EmbedQuestion),
            other => Err(format!("unknown task_type: {other}")),
        }
    }
}

/// Lifecycle state of a `Task` row. See spec invariants: `running` implies
/// `started_at` is set; terminal states imply `completed_at` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Role of a single `ChatMessage` within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        write!(f, "{s}")
    }
}

/// Classification of a user question, routed by the RAG orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Metadata,
    Content,
    ContentGlobal,
}

impl std::str::FromStr for Intent {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "METADATA" => Ok(Intent::Metadata),
            "CONTENT" => Ok(Intent::Content),
            "CONTENT_GLOBAL" => Ok(Intent::ContentGlobal),
            _ => Err(()),
        }
    }
}

/// Which vector/text-search column pair the retriever queries against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetIndex {
    Chunks,
    Summaries,
}

/// The typed `request` payload for a `pipeline` task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
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

/// The typed `request` payload for an `embed_question` task (internal only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedQuestionRequest {
    pub question_to_embed: String,
}

/// Tagged union mirroring the DB's `(task_type, request JSON)` pair.
/// Each variant carries its own strongly typed payload and is persisted
/// as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum TaskRequest {
    Pipeline(PipelineRequest),
    EmbedQuestion(EmbedQuestionRequest),
}

impl TaskRequest {
    pub fn task_type(&self) -> TaskType {
        match self {
            TaskRequest::Pipeline(_) => TaskType::Pipeline,
            TaskRequest::EmbedQuestion(_) => TaskType::EmbedQuestion,
        }
    }
}
