use sqlx::PgPool;
use uuid::Uuid;
use ytrag_core::types::{TaskRequest, TaskStatus, TaskType};

use crate::error::{DbError, Result};
use crate::models::Task;

/// The durable task queue. `claim_one` is the sole atomicity guarantee
/// that lets N worker processes run without coordination.
#[derive(Clone)]
pub struct TaskStore {
    pool: PgPool,
}

impl TaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new `pending` task. The `AFTER INSERT` trigger on `tasks`
    /// fires `pg_notify('task_queue', ...)` automatically — no explicit
    /// notify call needed here.
    ///
    /// `public` gates whether `embed_question` may be submitted: it is
    /// internal-only and the public task-submission endpoint must pass
    /// `public = true` to get this rejected as a validation error.
    pub async fn enqueue(&self, request: TaskRequest, public: bool) -> Result<Task> {
        if public && matches!(request, TaskRequest::EmbedQuestion(_)) {
            return Err(DbError::Validation(
                "task_type embed_question can only be used internally".into(),
            ));
        }
        if let TaskRequest::Pipeline(ref p) = request {
            if p.channel_url.trim().is_empty() {
                return Err(DbError::Validation(
                    "task_type pipeline requires channel_url".into(),
                ));
            }
        }
        if let TaskRequest::EmbedQuestion(ref q) = request {
            if q.question_to_embed.trim().is_empty() {
                return Err(DbError::Validation(
                    "task_type embed_question requires question_to_embed".into(),
                ));
            }
        }

        let task_type = request.task_type().to_string();
        let payload = serde_json::to_value(&request)
            .map_err(|e| DbError::Validation(format!("invalid task request: {e}")))?;

        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (task_type, status, request)
            VALUES ($1, 'pending', $2)
            RETURNING id, task_type, status, request, progress,
                      error_message, result, created_at, started_at, completed_at
            "#,
        )
        .bind(task_type)
        .bind(payload)
        .fetch_one(&self.pool)
        .await?;

        Ok(task)
    }

    /// Atomically claim the oldest pending task for this worker process.
    ///
    /// `SELECT ... FOR UPDATE SKIP LOCKED` lets two concurrent callers
    /// race on the same row set without blocking each other: the loser
    /// simply skips the locked row and sees the next one, or finds none.
    pub async fn claim_one(&self) -> Result<Option<Task>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, status, request, progress,
                   error_message, result, created_at, started_at, completed_at
            FROM tasks
            WHERE status = 'pending'
            ORDER BY created_at ASC
            FOR UPDATE SKIP LOCKED
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some(task) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let claimed = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET status = 'running', started_at = now(), progress = 0
            WHERE id = $1
            RETURNING id, task_type, status, request, progress,
                      error_message, result, created_at, started_at, completed_at
            "#,
        )
        .bind(task.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(claimed))
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, status, request, progress,
                   error_message, result, created_at, started_at, completed_at
            FROM tasks WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    pub async fn list(
        &self,
        status: Option<TaskStatus>,
        page: i64,
        page_size: i64,
    ) -> Result<(Vec<Task>, i64)> {
        let page = page.max(1);
        let page_size = page_size.clamp(1, 100);
        let offset = (page - 1) * page_size;

        let total: i64 = if let Some(status) = status {
            sqlx::query_scalar("SELECT count(*) FROM tasks WHERE status = $1")
                .bind(status)
                .fetch_one(&self.pool)
                .await?
        } else {
            sqlx::query_scalar("SELECT count(*) FROM tasks")
                .fetch_one(&self.pool)
                .await?
        };

        let tasks = if let Some(status) = status {
            sqlx::query_as::<_, Task>(
                r#"
                SELECT id, task_type, status, request, progress,
                       error_message, result, created_at, started_at, completed_at
                FROM tasks
                WHERE status = $1
                ORDER BY created_at DESC
                OFFSET $2 LIMIT $3
                "#,
            )
            .bind(status)
            .bind(offset)
            .bind(page_size)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, Task>(
                r#"
                SELECT id, task_type, status, request, progress,
                       error_message, result, created_at, started_at, completed_at
                FROM tasks
                ORDER BY created_at DESC
                OFFSET $1 LIMIT $2
                "#,
            )
            .bind(offset)
            .bind(page_size)
            .fetch_all(&self.pool)
            .await?
        };

        Ok((tasks, total))
    }

    /// Terminal tasks completed/failed within the last `within_secs` seconds,
    /// used by the SSE poller to build its dedup seed set.
    pub async fn recent_terminal(&self, limit: i64) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, task_type, status, request, progress,
                   error_message, result, created_at, started_at, completed_at
            FROM tasks
            WHERE status IN ('completed', 'failed')
            ORDER BY completed_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(tasks)
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Reports progress monotonically; `result` is an optional status
    /// snippet (free text), not the final answer payload.
    pub async fn update_progress(
        &self,
        id: Uuid,
        progress: i32,
        result_snippet: Option<&str>,
    ) -> Result<()> {
        if let Some(snippet) = result_snippet {
            sqlx::query("UPDATE tasks SET progress = $1, result = $2 WHERE id = $3")
                .bind(progress)
                .bind(snippet)
                .bind(id)
                .execute(&self.pool)
                .await?;
        } else {
            sqlx::query("UPDATE tasks SET progress = $1 WHERE id = $2")
                .bind(progress)
                .bind(id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    pub async fn complete(&self, id: Uuid, result: Option<&str>, error_message: Option<&str>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'completed', progress = 100, result = coalesce($1, result),
                error_message = $2, completed_at = now()
            WHERE id = $3
            "#,
        )
        .bind(result)
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fail(&self, id: Uuid, error_message: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'failed', error_message = $1, completed_at = now()
            WHERE id = $2
            "#,
        )
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Current status/result — polled by the RAG orchestrator while
    /// waiting on a worker-computed question embedding.
    pub async fn peek_status_result(&self, id: Uuid) -> Result<Option<(TaskStatus, Option<String>)>> {
        let row: Option<(TaskStatus, Option<String>)> =
            sqlx::query_as("SELECT status, result FROM tasks WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row)
    }

    /// Run on worker boot: any row stuck in `running` from a crashed
    /// process is transitioned to `failed`. Returns the number reset.
    pub async fn reset_stuck(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'failed', error_message = 'worker restarted', completed_at = now()
            WHERE status = 'running'
            "#,
        )
        .execute(&self.pool)
        .await?;
        let n = result.rows_affected();
        if n > 0 {
            tracing::warn!(count = n, "reset stuck running tasks to failed on boot");
        }
        Ok(n)
    }

    /// Returns `true` if an externally observed write flipped the row to
    /// `failed` while a worker is mid-run (external cancellation).
    pub async fn is_cancelled(&self, id: Uuid) -> Result<bool> {
        let status: Option<TaskStatus> = sqlx::query_scalar("SELECT status FROM tasks WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(matches!(status, Some(TaskStatus::Failed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_question_request_reports_its_task_type() {
        let req = TaskRequest::EmbedQuestion(ytrag_core::types::EmbedQuestionRequest {
            question_to_embed: "what is this about?".into(),
        });
        assert!(matches!(req.task_type(), TaskType::EmbedQuestion));
    }

    // `enqueue`'s public-flag rejection needs a live pool for the query
    // builder, so it's exercised against a real database in
    // ytrag-db/tests/tasks.rs rather than here.
}
