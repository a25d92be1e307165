//! Error types for Quarry operations.
//!
//! This module provides the common `Error` type and `Result<T>` alias used
//! across all Quarry crates. Uses `thiserror` for derive macros.
//!
//! The retrieval-specific variants split along retryability lines:
//! `IndexUnavailable` and `IndexMigrating` are transient and may be retried
//! (the latter with backoff); `DimensionMismatch`, `NotReadOnly`, and
//! `MutationRejected` are caller errors and must never be retried or
//! silently downgraded to empty results.

use thiserror::Error;

/// Errors that can occur in Quarry operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A query or chunk embedding does not match the index dimension.
    /// Caller bug; rejected before any index access.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The underlying index or storage is not ready. Retryable.
    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    /// A dimension migration is in progress; all reads and writes are
    /// rejected until it completes. Retryable with backoff.
    #[error("index migration in progress")]
    IndexMigrating,

    /// A gateway statement is not a single read-only SELECT.
    #[error("statement is not a read-only SELECT")]
    NotReadOnly,

    /// A gateway statement contains a mutation keyword.
    #[error("statement rejected: contains mutation keyword {0}")]
    MutationRejected(String),

    /// The underlying SQL engine rejected an otherwise validated statement.
    #[error("SQL error: {0}")]
    Sql(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid data or malformed request.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an index unavailable error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::IndexUnavailable(msg.into())
    }

    /// Create a not found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an invalid data error.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create a SQL execution error.
    pub fn sql(msg: impl Into<String>) -> Self {
        Self::Sql(msg.into())
    }

    /// Whether the operation may be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::IndexUnavailable(_) | Self::IndexMigrating)
    }
}

/// Result type alias using Quarry's Error type.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_display() {
        let err = Error::DimensionMismatch {
            expected: 384,
            actual: 383,
        };
        let msg = err.to_string();
        assert!(msg.contains("384"));
        assert!(msg.contains("383"));
    }

    #[test]
    fn test_mutation_rejected_names_keyword() {
        let err = Error::MutationRejected("DROP".to_string());
        assert!(err.to_string().contains("DROP"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::unavailable("warming up").is_retryable());
        assert!(Error::IndexMigrating.is_retryable());
        assert!(!Error::NotReadOnly.is_retryable());
        assert!(!Error::MutationRejected("DELETE".into()).is_retryable());
        assert!(
            !Error::DimensionMismatch {
                expected: 8,
                actual: 4
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_helper_constructors() {
        assert!(matches!(Error::not_found("x"), Error::NotFound(_)));
        assert!(matches!(Error::invalid_data("x"), Error::InvalidData(_)));
        assert!(matches!(Error::sql("x"), Error::Sql(_)));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
