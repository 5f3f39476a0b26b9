//! # Error Types
//!
//! Errors raised while turning a value into its serialized form. All errors
//! use `thiserror` for derive-based `Display` and `Error` implementations.

use thiserror::Error;

/// A value could not be converted into the target representation.
///
/// Carries the Rust type name when the failure is tied to a specific type
/// (an opaque object with no encoder, a `Serialize` impl that failed).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SerializationError {
    /// Type that could not be serialized, if known.
    pub type_name: Option<String>,
    /// Human-readable reason.
    pub message: String,
}

impl SerializationError {
    /// Error with a free-form message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            type_name: None,
            message: message.into(),
        }
    }

    /// The object of the given type has no encoding for the target format.
    pub fn unsupported_type(type_name: &str, format: &str) -> Self {
        Self {
            type_name: Some(type_name.to_string()),
            message: format!("Object of type {type_name} is not {format} serializable"),
        }
    }
}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("JSON serialization failed: {err}"))
    }
}
