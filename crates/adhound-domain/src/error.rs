//! Domain error types for ACE resolution.
//!
//! An empty result set is never an error: every engine operation returns
//! `Ok(vec![])` for "nothing matched", and errors are reserved for backend
//! failures. Malformed entities are tolerated inline (empty display name)
//! and never surface here.

use thiserror::Error;

/// Domain-specific errors for ACE resolution operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The backing graph store failed or was unreachable.
    /// The engine issues no retries; retry policy belongs to the adapter.
    #[error("backend error: {message}")]
    Backend { message: String },

    /// The backing graph store did not answer within its deadline.
    #[error("backend timeout after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// The caller supplied an unusable scope (e.g. an empty principal name).
    #[error("invalid scope: {message}")]
    InvalidScope { message: String },
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
