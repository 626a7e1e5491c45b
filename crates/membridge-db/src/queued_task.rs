//! Postgres implementation of [`QueuedTaskStore`].

use crate::map_sqlx_err;
use async_trait::async_trait;
use membridge_core::{QueuedTask, QueuedTaskStore, StoreError, TaskType};
use sqlx::{FromRow, PgPool};
use tracing::warn;

#[derive(Debug, Clone, FromRow)]
struct QueuedTaskRow {
    id: i64,
    task_type: String,
    parameter: String,
}

/// FIFO task queue backed by the `queued_tasks` table.
#[derive(Debug, Clone)]
pub struct PgQueuedTaskStore {
    pool: PgPool,
}

impl PgQueuedTaskStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueuedTaskStore for PgQueuedTaskStore {
    async fn enqueue(&self, task_type: TaskType, parameter: &str) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO queued_tasks (task_type, parameter)
            VALUES ($1, $2)
            ",
        )
        .bind(task_type.as_str())
        .bind(parameter)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(map_sqlx_err)
    }

    async fn list_all(&self) -> Result<Vec<QueuedTask>, StoreError> {
        let rows = sqlx::query_as::<_, QueuedTaskRow>(
            r"
            SELECT id, task_type, parameter
            FROM queued_tasks
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match TaskType::parse(&row.task_type) {
                Some(task_type) => Some(QueuedTask {
                    id: row.id,
                    task_type,
                    parameter: row.parameter,
                }),
                None => {
                    // Rows written by an unknown (newer?) build; the runner
                    // cannot process them, but they must not wedge the queue.
                    warn!(id = row.id, task_type = row.task_type, "unknown queued task type");
                    None
                }
            })
            .collect())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r"
            DELETE FROM queued_tasks
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(map_sqlx_err)
    }
}
