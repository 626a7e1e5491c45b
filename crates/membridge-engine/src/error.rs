//! Reconciliation error type.

use membridge_api::ApiError;
use membridge_core::{IdentityError, StoreError};
use thiserror::Error;

/// Error raised by a reconciliation step.
///
/// Write-path failures propagate to the caller (the login flow or the task
/// runner), which decides whether to fail open or closed.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The user id has no counterpart on the remote API.
    #[error("remote user not found: {uid}")]
    UserNotFound { uid: String },
}

/// Result alias for reconciliation operations.
pub type SyncResult<T> = Result<T, SyncError>;
