//! Backend error types.

use thiserror::Error;

/// Errors raised by directory graph backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Request timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    #[error("Authentication failed: {message}")]
    Auth { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Malformed backend reply: {message}")]
    Decode { message: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Maps a transport failure, distinguishing deadline expiry from
    /// other connection problems. `timeout_secs` is the client deadline
    /// the request was issued under.
    pub fn transport(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            StoreError::Timeout {
                duration_ms: timeout_secs * 1000,
            }
        } else {
            StoreError::Connection {
                message: err.to_string(),
            }
        }
    }
}

impl From<StoreError> for adhound_domain::DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout { duration_ms } => {
                adhound_domain::DomainError::Timeout { duration_ms }
            }
            other => adhound_domain::DomainError::Backend {
                message: other.to_string(),
            },
        }
    }
}
