//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding, decoding or comparison.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// Two operands, or a value and its declared type, are incompatible.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The declared or left-hand type.
        expected: String,
        /// The value or right-hand type actually supplied.
        found: String,
    },

    /// The type has no total order and cannot appear in a sort key.
    #[error("type {type_name} is not orderable")]
    Unorderable {
        /// Name of the type.
        type_name: String,
    },

    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// Invalid UTF-8 string.
    #[error("invalid UTF-8 string")]
    InvalidUtf8,

    /// The encoding is lossy for this type and cannot be decoded.
    #[error("collating encoding of {type_name} cannot be decoded")]
    UnsupportedDecode {
        /// Name of the type.
        type_name: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create a type mismatch error.
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    /// Create an unorderable type error.
    pub fn unorderable(type_name: impl Into<String>) -> Self {
        Self::Unorderable {
            type_name: type_name.into(),
        }
    }

    /// Create an unsupported decode error.
    pub fn unsupported_decode(type_name: impl Into<String>) -> Self {
        Self::UnsupportedDecode {
            type_name: type_name.into(),
        }
    }
}
