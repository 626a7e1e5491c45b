//! Entry points for the external scheduler.
//!
//! The host's job scheduler invokes these on a timer; the login/logout flow
//! enqueues deferred work through them. The queue is drained with
//! at-most-once semantics: a failed task is logged and removed, and the
//! next periodic full sync re-converges whatever it left behind.

use crate::sync::ApiSync;
use membridge_core::{QueuedTaskStore, StoreError, TaskType};
use std::sync::Arc;
use tracing::{error, info};

/// Scheduler-facing entry points over the reconciliation engine.
pub struct TaskRunner {
    sync: Arc<ApiSync>,
    queue: Arc<dyn QueuedTaskStore>,
}

impl TaskRunner {
    #[must_use]
    pub fn new(sync: Arc<ApiSync>, queue: Arc<dyn QueuedTaskStore>) -> Self {
        Self { sync, queue }
    }

    /// Periodic full sync (shares, then admin users). Each step's failure is
    /// logged; both steps are always attempted.
    pub async fn run_periodic(&self) {
        if let Err(e) = self.sync.sync_shares().await {
            error!(error = %e, "scheduled share sync failed");
        }
        if let Err(e) = self.sync.sync_admin_users().await {
            error!(error = %e, "scheduled admin sync failed");
        }
    }

    /// Drain the task queue in FIFO order.
    ///
    /// Every task is deleted whether it succeeded or not; side effects are
    /// re-triggerable from scratch by the periodic sync.
    pub async fn run_queued(&self) {
        let tasks = match self.queue.list_all().await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(error = %e, "could not read task queue");
                return;
            }
        };

        for task in tasks {
            let result = match task.task_type {
                TaskType::SyncUser => self.sync.sync_user_by_id(&task.parameter).await,
                TaskType::ClearSession => self.sync.clear_api_session(&task.parameter).await,
            };

            if let Err(e) = result {
                error!(
                    task = task.task_type.as_str(),
                    parameter = task.parameter,
                    error = %e,
                    "queued task failed"
                );
            }

            if let Err(e) = self.queue.delete(task.id).await {
                error!(id = task.id, error = %e, "could not delete queued task");
            }
        }
    }

    /// Daily retention cleanup.
    pub async fn run_cleanup(&self) {
        match self.sync.cleanup_shares().await {
            Ok(()) => info!("share retention cleanup complete"),
            Err(e) => error!(error = %e, "share retention cleanup failed"),
        }
    }

    /// Defer a per-login user sync off the request path.
    pub async fn enqueue_user_sync(&self, uid: &str) -> Result<(), StoreError> {
        self.queue.enqueue(TaskType::SyncUser, uid).await
    }

    /// Defer a per-logout session clear off the request path.
    pub async fn enqueue_session_clear(&self, token: &str) -> Result<(), StoreError> {
        self.queue.enqueue(TaskType::ClearSession, token).await
    }
}
