//! API client error types.
//!
//! "Not found" is a distinct, expected outcome for lookups; decode failures
//! are a distinct kind so schema drift never masquerades as a network
//! problem.

use thiserror::Error;

/// Error raised by [`crate::ApiClient`] operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection-level failure (DNS, TCP, TLS).
    #[error("network error: {message}")]
    Network { message: String },

    /// The request exceeded the configured deadline.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// Remote returned 404 for the addressed resource.
    #[error("resource not found: {path}")]
    NotFound { path: String },

    /// Remote rejected the supplied credentials (401/403).
    #[error("unauthorized ({status}): {detail}")]
    Unauthorized { status: u16, detail: String },

    /// Any other non-2xx response, with the parsed error payload when the
    /// remote sent one.
    #[error("API returned {status}: {detail}")]
    Status { status: u16, detail: String },

    /// The response body did not match the expected schema.
    #[error("failed to decode response: {message}")]
    Decode { message: String },

    /// The client could not be constructed or the URL is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl ApiError {
    /// Whether this error is the expected 404 outcome.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound { .. } => Some(404),
            ApiError::Unauthorized { status, .. } | ApiError::Status { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout {
                message: err.to_string(),
            }
        } else if err.is_decode() {
            ApiError::Decode {
                message: err.to_string(),
            }
        } else {
            ApiError::Network {
                message: err.to_string(),
            }
        }
    }
}

/// Result alias for API client operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_distinct() {
        let err = ApiError::NotFound {
            path: "users/abc".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));

        let err = ApiError::Status {
            status: 500,
            detail: "boom".to_string(),
        };
        assert!(!err.is_not_found());
        assert_eq!(err.status(), Some(500));
    }
}
