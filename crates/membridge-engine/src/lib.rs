//! Reconciliation engine for the membership bridge.
//!
//! Converges local accounts, group memberships, admin rights, and shared
//! group folders with the authoritative state served by the remote
//! membership API.

pub mod error;
pub mod locks;
pub mod sync;
pub mod tasks;

pub use error::{SyncError, SyncResult};
pub use locks::KeyedLocks;
pub use sync::{ApiSync, ShareSyncStats, UserSyncStats};
pub use tasks::TaskRunner;
