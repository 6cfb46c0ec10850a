//! Error types for store operations.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A transient condition; the enclosing transaction may be retried.
    #[error("transient store failure: {message}")]
    Transient {
        /// Description of the condition.
        message: String,
    },

    /// The operation was cancelled by the enclosing session.
    #[error("operation cancelled")]
    Cancelled,

    /// The stored data is corrupted.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// The store is closed.
    #[error("store is closed")]
    Closed,
}

impl StorageError {
    /// Creates a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
        }
    }

    /// Returns true if the failure is marked as retryable by the store.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(StorageError::transient("conflict").is_retryable());
        assert!(!StorageError::Cancelled.is_retryable());
        assert!(!StorageError::Closed.is_retryable());
        assert!(!StorageError::Corrupted("bad page".into()).is_retryable());
    }

    #[test]
    fn display_includes_message() {
        let err = StorageError::transient("too old");
        assert_eq!(err.to_string(), "transient store failure: too old");
    }
}
