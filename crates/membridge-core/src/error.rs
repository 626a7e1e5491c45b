//! Error types for the identity and persistence seams.

use thiserror::Error;

/// Error raised by the host platform's identity/storage subsystem.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// A referenced user, group, folder, or share does not exist.
    #[error("{resource} not found: {id}")]
    NotFound { resource: &'static str, id: String },

    /// The entity to create already exists.
    #[error("{resource} already exists: {id}")]
    AlreadyExists { resource: &'static str, id: String },

    /// Any other host-side failure.
    #[error("identity store error: {message}")]
    Backend { message: String },
}

impl IdentityError {
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        IdentityError::Backend {
            message: message.into(),
        }
    }
}

/// Error raised by the locally persisted state stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint was violated (e.g. concurrent insert of the
    /// same gid). Callers re-read and continue.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// The referenced row does not exist.
    #[error("row not found: {id}")]
    NotFound { id: i64 },

    /// Any other storage failure.
    #[error("store error: {message}")]
    Backend { message: String },
}

impl StoreError {
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            message: message.into(),
        }
    }

    /// Whether this error is a uniqueness conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let err = IdentityError::NotFound {
            resource: "folder",
            id: "42".to_string(),
        };
        assert_eq!(err.to_string(), "folder not found: 42");

        let err = StoreError::Conflict {
            message: "gid already mapped".to_string(),
        };
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "conflict: gid already mapped");
    }
}
