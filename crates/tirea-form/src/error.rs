//! Error types for tirea-form operations.
//!
//! Validation issues are plain data and never appear here. Errors are reserved
//! for validator failures and for structural operations aimed at a value that
//! cannot be treated as an array.

use crate::Path;
use thiserror::Error;

/// Result type alias for tirea-form operations.
pub type FormResult<T> = Result<T, FormError>;

/// Errors that can occur during form operations.
#[derive(Debug, Error)]
pub enum FormError {
    /// A validator threw or its future resolved to an error.
    #[error("validator failed: {0}")]
    Validator(#[from] ValidatorError),

    /// Type mismatch when operating on a value.
    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        /// The path where the mismatch occurred.
        path: Path,
        /// The expected type.
        expected: &'static str,
        /// The actual type found.
        found: &'static str,
    },

    /// A write addressed an array slot too far past its end.
    #[error("index {index} at `{path}` is out of range for an array of length {len}")]
    IndexOutOfRange {
        /// The path of the offending slot.
        path: Path,
        /// The requested index.
        index: usize,
        /// The array length at the time of the write.
        len: usize,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FormError {
    /// Create a type mismatch error.
    #[inline]
    pub fn type_mismatch(path: Path, expected: &'static str, found: &'static str) -> Self {
        FormError::TypeMismatch {
            path,
            expected,
            found,
        }
    }
}

/// Failure reported by a [`Validator`](crate::Validator) implementation.
///
/// The engine passes these through untouched.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ValidatorError {
    /// Create a validator error from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        ValidatorError::Message(message.into())
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
