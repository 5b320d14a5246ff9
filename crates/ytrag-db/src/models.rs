use chrono::{DateTime, Utc};
use pgvector::Vector;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use ytrag_core::types::{ChatRole, TaskStatus, TaskType};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Video {
    pub video_id: String,
    pub channel_id: i64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
    pub audio_path: Option<String>,
    pub downloaded: bool,
    pub transcribed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Segment {
    pub id: i64,
    pub video_id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

/// A single transcribed segment, not yet persisted — produced by the
/// speech-to-text stage before it is written to the `segments` table.
#[derive(Debug, Clone)]
pub struct RawSegment {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Chunk {
    pub id: i64,
    pub video_id: String,
    pub chunk_index: i32,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub summary: Option<String>,
    #[sqlx(default)]
    #[serde(skip)]
    pub embedding: Option<Vector>,
    #[sqlx(default)]
    #[serde(skip)]
    pub summary_embedding: Option<Vector>,
}

/// A chunk produced by the chunker before it has an index or is persisted.
#[derive(Debug, Clone)]
pub struct PackedChunk {
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: Uuid,
    pub task_type: String,
    pub status: TaskStatus,
    pub request: serde_json::Value,
    pub progress: i32,
    pub error_message: Option<String>,
    pub result: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn task_type(&self) -> Option<TaskType> {
        self.task_type.parse().ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatSession {
    pub id: Uuid,
    pub channel_id: Option<i64>,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub sources: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Setting {
    pub component: String,
    pub section: String,
    pub key: String,
    pub value: String,
    pub value_type: String,
    pub description: Option<String>,
}
