use pgvector::Vector;
use sqlx::PgPool;

use crate::error::Result;
use crate::models::{Chunk, PackedChunk};

#[derive(Clone)]
pub struct ChunkRepo {
    pool: PgPool,
}

impl ChunkRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent-by-replacement: delete every existing chunk for
    /// `video_id` in one statement, then insert the new sequence with
    /// `chunk_index` starting at 0.
    pub async fn replace_all(&self, video_id: &str, chunks: &[PackedChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE video_id = $1")
            .bind(video_id)
            .execute(&mut *tx)
            .await?;

        for (index, chunk) in chunks.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO chunks (video_id, chunk_index, start_time, end_time, text, summary)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(video_id)
            .bind(index as i32)
            .bind(chunk.start_time)
            .bind(chunk.end_time)
            .bind(&chunk.text)
            .bind(&chunk.summary)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Rows missing either embedding, optionally restricted to `video_ids`,
    /// ordered for stable batching — the embed stage's work queue.
    pub async fn pending_embeddings(
        &self,
        video_ids: Option<&[String]>,
        batch_size: i64,
    ) -> Result<Vec<Chunk>> {
        let chunks = if let Some(ids) = video_ids {
            sqlx::query_as::<_, Chunk>(
                r#"
                SELECT id, video_id, chunk_index, start_time, end_time, text, summary,
                       embedding, summary_embedding
                FROM chunks
                WHERE (embedding IS NULL OR summary_embedding IS NULL)
                  AND video_id = ANY($1)
                ORDER BY video_id, chunk_index
                LIMIT $2
                "#,
            )
            .bind(ids)
            .bind(batch_size)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Chunk>(
                r#"
                SELECT id, video_id, chunk_index, start_time, end_time, text, summary,
                       embedding, summary_embedding
                FROM chunks
                WHERE embedding IS NULL OR summary_embedding IS NULL
                ORDER BY video_id, chunk_index
                LIMIT $1
                "#,
            )
            .bind(batch_size)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(chunks)
    }

    /// Snapshot count taken once at the start of an embed run; the
    /// running total reported against it may undercount if new chunks
    /// appear mid-run (accepted race).
    pub async fn count_pending_embeddings(&self, video_ids: Option<&[String]>) -> Result<i64> {
        let count: i64 = if let Some(ids) = video_ids {
            sqlx::query_scalar(
                r#"
                SELECT count(*) FROM chunks
                WHERE (embedding IS NULL OR summary_embedding IS NULL) AND video_id = ANY($1)
                "#,
            )
            .bind(ids)
            .fetch_one(&self.pool)
            .await?
        } else {
            sqlx::query_scalar(
                "SELECT count(*) FROM chunks WHERE embedding IS NULL OR summary_embedding IS NULL",
            )
            .fetch_one(&self.pool)
            .await?
        };
        Ok(count)
    }

    /// Writes both vectors for one chunk in a single statement; the
    /// caller commits the whole batch as one transaction via
    /// `write_embeddings_batch`.
    pub async fn write_embeddings_batch(
        &self,
        updates: &[(i64, Vector, Option<Vector>)],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (id, embedding, summary_embedding) in updates {
            sqlx::query(
                "UPDATE chunks SET embedding = $1, summary_embedding = $2 WHERE id = $3",
            )
            .bind(embedding)
            .bind(summary_embedding)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Chunk count for a single video — the `video+counts` detail
    /// endpoint's cheap summary stat.
    pub async fn count_by_video(&self, video_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM chunks WHERE video_id = $1")
            .bind(video_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<Chunk>> {
        let chunks = sqlx::query_as::<_, Chunk>(
            r#"
            SELECT id, video_id, chunk_index, start_time, end_time, text, summary,
                   embedding, summary_embedding
            FROM chunks
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(chunks)
    }

    /// Every summarized chunk for the given videos, ordered by
    /// `(video_id, chunk_index)` — the CONTENT_GLOBAL path's raw feed,
    /// which the orchestrator caps at `max_summaries_per_video` itself.
    pub async fn summaries_by_video(&self, video_ids: &[String]) -> Result<Vec<(String, Option<String>, f64, f64)>> {
        let rows: Vec<(String, Option<String>, f64, f64)> = sqlx::query_as(
            r#"
            SELECT video_id, summary, start_time, end_time
            FROM chunks
            WHERE video_id = ANY($1) AND summary IS NOT NULL
            ORDER BY video_id, chunk_index
            "#,
        )
        .bind(video_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
