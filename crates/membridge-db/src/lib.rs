//! Postgres-backed persistence for bridge-owned state.
//!
//! Implements the `membridge-core` store traits on top of sqlx. The unique
//! constraints on `group_share_mappings` are what make the engine's
//! at-most-one-folder-per-group guarantee hold under concurrent syncs:
//! a losing writer sees a conflict and re-reads.

pub mod group_share;
pub mod queued_task;
pub mod schema;

pub use group_share::PgGroupShareStore;
pub use queued_task::PgQueuedTaskStore;

use membridge_core::StoreError;

/// Translate a sqlx error into the store error taxonomy.
pub(crate) fn map_sqlx_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict {
            message: db.message().to_string(),
        },
        sqlx::Error::RowNotFound => StoreError::NotFound { id: -1 },
        _ => StoreError::backend(err.to_string()),
    }
}
