use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{DbError, Result};
use crate::models::{ChatMessage, ChatSession};
use ytrag_core::types::ChatRole;

#[derive(Clone)]
pub struct ChatRepo {
    pool: PgPool,
}

impl ChatRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a new session if `session_id` is absent, otherwise loads
    /// the existing one. The session title is derived from the opening
    /// question.
    pub async fn get_or_create_session(
        &self,
        session_id: Option<Uuid>,
        channel_id: Option<i64>,
        title: &str,
    ) -> Result<ChatSession> {
        if let Some(id) = session_id {
            return self.get_session(id).await;
        }

        let session = sqlx::query_as::<_, ChatSession>(
            r#"
            INSERT INTO chat_sessions (channel_id, title)
            VALUES ($1, $2)
            RETURNING id, channel_id, title, created_at
            "#,
        )
        .bind(channel_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    pub async fn get_session(&self, id: Uuid) -> Result<ChatSession> {
        sqlx::query_as::<_, ChatSession>(
            "SELECT id, channel_id, title, created_at FROM chat_sessions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("chat session {id} not found")))
    }

    pub async fn list_sessions(&self, channel_id: Option<i64>) -> Result<Vec<ChatSession>> {
        let sessions = if let Some(channel_id) = channel_id {
            sqlx::query_as::<_, ChatSession>(
                r#"
                SELECT id, channel_id, title, created_at
                FROM chat_sessions WHERE channel_id = $1
                ORDER BY created_at DESC
                "#,
            )
            .bind(channel_id)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, ChatSession>(
                "SELECT id, channel_id, title, created_at FROM chat_sessions ORDER BY created_at DESC",
            )
            .fetch_all(&self.pool)
            .await?
        };
        Ok(sessions)
    }

    pub async fn delete_session(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replaces the session's scoped video set wholesale.
    pub async fn replace_chat_videos(&self, session_id: Uuid, video_ids: &[String]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chat_videos WHERE chat_id = $1")
            .bind(session_id)
            .execute(&mut *tx)
            .await?;

        for video_id in video_ids {
            sqlx::query("INSERT INTO chat_videos (chat_id, video_id) VALUES ($1, $2)")
                .bind(session_id)
                .bind(video_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn session_video_ids(&self, session_id: Uuid) -> Result<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT video_id FROM chat_videos WHERE chat_id = $1")
                .bind(session_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    /// Every message in a session, oldest first — the session-detail
    /// endpoint's full transcript.
    pub async fn all_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, session_id, role, content, sources, created_at
            FROM chat_messages
            WHERE session_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// The last `limit` messages in ascending order, used to seed the
    /// prompt's conversation context.
    pub async fn recent_context(&self, session_id: Uuid, limit: i64) -> Result<Vec<ChatMessage>> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, session_id, role, content, sources, created_at
            FROM chat_messages
            WHERE session_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(session_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        messages.reverse();
        Ok(messages)
    }

    /// Persists the (user, assistant) pair in a single transaction —
    /// only called after the generator finishes normally, never on
    /// client disconnect.
    pub async fn record_exchange(
        &self,
        session_id: Uuid,
        question: &str,
        answer: &str,
        sources: Option<serde_json::Value>,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO chat_messages (session_id, role, content) VALUES ($1, $2, $3)",
        )
        .bind(session_id)
        .bind(ChatRole::User)
        .bind(question)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO chat_messages (session_id, role, content, sources) VALUES ($1, $2, $3, $4)",
        )
        .bind(session_id)
        .bind(ChatRole::Assistant)
        .bind(answer)
        .bind(sources)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}
