use sqlx::PgPool;

use crate::error::Result;
use crate::models::{RawSegment, Segment};

#[derive(Clone)]
pub struct SegmentRepo {
    pool: PgPool,
}

impl SegmentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Idempotent re-transcription: clears any prior segments for this
    /// video before inserting the fresh batch, so a retried transcribe
    /// stage never duplicates rows.
    pub async fn replace_all(&self, video_id: &str, segments: &[RawSegment]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        Self::replace_all_in_tx(&mut tx, video_id, segments).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Same as `replace_all`, but runs inside a transaction the caller
    /// owns, so it can be committed together with other writes.
    pub async fn replace_all_in_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        video_id: &str,
        segments: &[RawSegment],
    ) -> Result<()> {
        sqlx::query("DELETE FROM segments WHERE video_id = $1")
            .bind(video_id)
            .execute(&mut **tx)
            .await?;

        for segment in segments {
            sqlx::query(
                "INSERT INTO segments (video_id, start_time, end_time, text) VALUES ($1, $2, $3, $4)",
            )
            .bind(video_id)
            .bind(segment.start_time)
            .bind(segment.end_time)
            .bind(&segment.text)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }

    pub async fn list_by_video(&self, video_id: &str) -> Result<Vec<Segment>> {
        let segments = sqlx::query_as::<_, Segment>(
            r#"
            SELECT id, video_id, start_time, end_time, text
            FROM segments
            WHERE video_id = $1
            ORDER BY start_time ASC
            "#,
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(segments)
    }
}
