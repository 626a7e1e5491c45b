//! Persistence traits for locally owned bridge state.
//!
//! The reconciliation engine is the only writer of both stores.

use crate::error::StoreError;
use crate::model::{GroupShareMapping, QueuedTask, TaskType};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage for [`GroupShareMapping`] rows.
///
/// Implementations must enforce the uniqueness invariants (one active
/// mapping per gid, one mapping per folder) and surface violations as
/// [`StoreError::Conflict`] so a racing writer can re-read and continue.
#[async_trait]
pub trait GroupShareStore: Send + Sync {
    async fn find_by_gid(&self, gid: &str) -> Result<Option<GroupShareMapping>, StoreError>;

    async fn find_by_folder(
        &self,
        folder_id: i64,
    ) -> Result<Option<GroupShareMapping>, StoreError>;

    async fn list_all(&self) -> Result<Vec<GroupShareMapping>, StoreError>;

    /// Mappings soft-deleted strictly before the cutoff.
    async fn list_deleted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<GroupShareMapping>, StoreError>;

    /// Insert a new active mapping.
    async fn insert(&self, gid: &str, folder_id: i64) -> Result<GroupShareMapping, StoreError>;

    /// Point an existing mapping at a different folder.
    async fn set_folder(&self, id: i64, folder_id: i64) -> Result<(), StoreError>;

    /// Soft-delete: record the deletion timestamp, keep the row.
    async fn mark_deleted(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Clear the deletion timestamp, restoring the mapping to active.
    async fn restore(&self, id: i64) -> Result<(), StoreError>;

    /// Hard-delete the row.
    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}

/// FIFO queue of deferred per-login/per-logout work.
#[async_trait]
pub trait QueuedTaskStore: Send + Sync {
    async fn enqueue(&self, task_type: TaskType, parameter: &str) -> Result<(), StoreError>;

    /// All queued tasks in insertion order.
    async fn list_all(&self) -> Result<Vec<QueuedTask>, StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;
}
