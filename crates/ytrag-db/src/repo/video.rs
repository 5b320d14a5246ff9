use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{DbError, Result};
use crate::models::Video;

#[derive(Clone)]
pub struct VideoRepo {
    pool: PgPool,
}

impl VideoRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent registration: re-running ingest on a channel must not
    /// duplicate a video or clobber `downloaded`/`transcribed` progress
    /// already recorded for it.
    pub async fn register(
        &self,
        video_id: &str,
        channel_id: i64,
        title: Option<&str>,
        description: Option<&str>,
        published_at: Option<DateTime<Utc>>,
        duration: Option<i32>,
    ) -> Result<Video> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            INSERT INTO videos (video_id, channel_id, title, description, published_at, duration)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (video_id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                published_at = EXCLUDED.published_at,
                duration = EXCLUDED.duration
            RETURNING video_id, channel_id, title, description, published_at, duration,
                      audio_path, downloaded, transcribed, created_at
            "#,
        )
        .bind(video_id)
        .bind(channel_id)
        .bind(title)
        .bind(description)
        .bind(published_at)
        .bind(duration)
        .fetch_one(&self.pool)
        .await?;

        Ok(video)
    }

    /// Registers the video only if it does not already exist, returning
    /// `None` when it was already known, so a re-run ingest only reports
    /// genuinely new videos.
    pub async fn register_if_new(
        &self,
        video_id: &str,
        channel_id: i64,
        title: Option<&str>,
        description: Option<&str>,
        published_at: Option<DateTime<Utc>>,
        duration: Option<i32>,
    ) -> Result<Option<Video>> {
        let video = sqlx::query_as::<_, Video>(
            r#"
            INSERT INTO videos (video_id, channel_id, title, description, published_at, duration)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (video_id) DO NOTHING
            RETURNING video_id, channel_id, title, description, published_at, duration,
                      audio_path, downloaded, transcribed, created_at
            "#,
        )
        .bind(video_id)
        .bind(channel_id)
        .bind(title)
        .bind(description)
        .bind(published_at)
        .bind(duration)
        .fetch_optional(&self.pool)
        .await?;

        Ok(video)
    }

    pub async fn mark_downloaded(&self, video_id: &str, audio_path: &str) -> Result<()> {
        sqlx::query("UPDATE videos SET downloaded = TRUE, audio_path = $1 WHERE video_id = $2")
            .bind(audio_path)
            .bind(video_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_transcribed(&self, video_id: &str) -> Result<()> {
        sqlx::query("UPDATE videos SET transcribed = TRUE WHERE video_id = $1")
            .bind(video_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Same as `mark_transcribed`, but runs inside a transaction the
    /// caller owns, so it can be committed together with other writes.
    pub async fn mark_transcribed_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        video_id: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE videos SET transcribed = TRUE WHERE video_id = $1")
            .bind(video_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    pub async fn get(&self, video_id: &str) -> Result<Video> {
        sqlx::query_as::<_, Video>(
            r#"
            SELECT video_id, channel_id, title, description, published_at, duration,
                   audio_path, downloaded, transcribed, created_at
            FROM videos WHERE video_id = $1
            "#,
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("video {video_id} not found")))
    }

    /// Resolves the video scope for a chat session: if the caller supplied
    /// `requested` ids, restrict them to those actually belonging to
    /// `channel_id`; otherwise draw up to `cap` of the channel's videos.
    pub async fn scope_to_channel(&self, channel_id: i64, requested: &[String], cap: i64) -> Result<Vec<String>> {
        if requested.is_empty() {
            let ids: Vec<String> = sqlx::query_scalar(
                r#"
                SELECT video_id FROM videos
                WHERE channel_id = $1
                ORDER BY published_at DESC NULLS LAST
                LIMIT $2
                "#,
            )
            .bind(channel_id)
            .bind(cap)
            .fetch_all(&self.pool)
            .await?;
            return Ok(ids);
        }

        let ids: Vec<String> = sqlx::query_scalar(
            "SELECT video_id FROM videos WHERE channel_id = $1 AND video_id = ANY($2)",
        )
        .bind(channel_id)
        .bind(requested)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    pub async fn list_all(&self) -> Result<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(
            r#"
            SELECT video_id, channel_id, title, description, published_at, duration,
                   audio_path, downloaded, transcribed, created_at
            FROM videos
            ORDER BY published_at DESC NULLS LAST
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(videos)
    }

    pub async fn list_by_channel(&self, channel_id: i64) -> Result<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(
            r#"
            SELECT video_id, channel_id, title, description, published_at, duration,
                   audio_path, downloaded, transcribed, created_at
            FROM videos
            WHERE channel_id = $1
            ORDER BY published_at DESC NULLS LAST
            "#,
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(videos)
    }

    /// Videos downloaded but not yet transcribed — the transcribe stage's
    /// work queue for a given pipeline run.
    pub async fn pending_transcription(&self, channel_id: i64) -> Result<Vec<Video>> {
        let videos = sqlx::query_as::<_, Video>(
            r#"
            SELECT video_id, channel_id, title, description, published_at, duration,
                   audio_path, downloaded, transcribed, created_at
            FROM videos
            WHERE channel_id = $1 AND downloaded = TRUE AND transcribed = FALSE
            ORDER BY published_at ASC NULLS LAST
            "#,
        )
        .bind(channel_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(videos)
    }

    pub async fn delete(&self, video_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE video_id = $1")
            .bind(video_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
