use sqlx::PgPool;

use crate::error::{DbError, Result};
use crate::models::Channel;

#[derive(Clone)]
pub struct ChannelRepo {
    pool: PgPool,
}

impl ChannelRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Idempotent upsert keyed on `url`: the ingest stage calls this on
    /// every pipeline run regardless of whether the channel already exists.
    pub async fn get_or_create(&self, name: &str, url: &str) -> Result<Channel> {
        if let Some(existing) = self.get_by_url(url).await? {
            return Ok(existing);
        }

        let channel = sqlx::query_as::<_, Channel>(
            r#"
            INSERT INTO channels (name, url)
            VALUES ($1, $2)
            ON CONFLICT (url) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name, url, created_at
            "#,
        )
        .bind(name)
        .bind(url)
        .fetch_one(&self.pool)
        .await?;

        Ok(channel)
    }

    pub async fn get_by_url(&self, url: &str) -> Result<Option<Channel>> {
        let channel = sqlx::query_as::<_, Channel>(
            "SELECT id, name, url, created_at FROM channels WHERE url = $1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        Ok(channel)
    }

    pub async fn get(&self, id: i64) -> Result<Channel> {
        sqlx::query_as::<_, Channel>(
            "SELECT id, name, url, created_at FROM channels WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("channel {id} not found")))
    }

    pub async fn list(&self) -> Result<Vec<Channel>> {
        let channels = sqlx::query_as::<_, Channel>(
            "SELECT id, name, url, created_at FROM channels ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(channels)
    }

    pub async fn update_name(&self, id: i64, name: &str) -> Result<Channel> {
        sqlx::query_as::<_, Channel>(
            "UPDATE channels SET name = $1 WHERE id = $2 RETURNING id, name, url, created_at",
        )
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("channel {id} not found")))
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM channels WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
