//! Error types for ArborDB core.

use crate::cursor::CursorState;
use crate::types::SessionId;
use arbordb_codec::CodecError;
use arbordb_storage::StorageError;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in ArborDB core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A cursor operation was called in a state that does not permit it.
    #[error("cursor lifecycle violation: {operation} called while cursor is {state}")]
    CursorLifecycle {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the cursor was in.
        state: CursorState,
    },

    /// The underlying store failed.
    ///
    /// Carries the session and the adapter operation that was running.
    #[error("store access failed in session {session} during {context}: {source}")]
    StoreAccess {
        /// Session that issued the request.
        session: SessionId,
        /// What the adapter was doing.
        context: String,
        /// The store's own error, with its retryable marking intact.
        #[source]
        source: StorageError,
    },

    /// Values of incompatible declared types met in a sort or comparison.
    #[error("encoding mismatch: {message}")]
    EncodingMismatch {
        /// Description of the mismatch.
        message: String,
    },

    /// The operation is not supported by this cursor or index.
    #[error("unsupported operation: {message}")]
    UnsupportedOperation {
        /// Description of the unsupported request.
        message: String,
    },

    /// An argument was rejected at construction or call time.
    #[error("illegal argument: {message}")]
    IllegalArgument {
        /// Description of the problem.
        message: String,
    },

    /// Codec error other than a type mismatch.
    #[error("codec error: {0}")]
    Codec(CodecError),
}

impl CoreError {
    /// Creates a cursor lifecycle error.
    pub const fn lifecycle(operation: &'static str, state: CursorState) -> Self {
        Self::CursorLifecycle { operation, state }
    }

    /// Creates an encoding mismatch error.
    pub fn encoding_mismatch(message: impl Into<String>) -> Self {
        Self::EncodingMismatch {
            message: message.into(),
        }
    }

    /// Creates an unsupported operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            message: message.into(),
        }
    }

    /// Creates an illegal argument error.
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        Self::IllegalArgument {
            message: message.into(),
        }
    }

    /// Creates an error for stored bytes that do not decode.
    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Codec(CodecError::decoding_failed(message))
    }

    /// Returns true if the store marked the failure as transient.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::StoreAccess { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

impl From<CodecError> for CoreError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::TypeMismatch { .. } => Self::EncodingMismatch {
                message: err.to_string(),
            },
            other => Self::Codec(other),
        }
    }
}
