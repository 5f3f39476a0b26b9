//! # Render Errors

use ramlson_core::SerializationError;
use ramlson_schema::{SchemaError, SchemaKind};
use thiserror::Error;

/// Error raised by a serializer or render function.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The data (JSON) or the serialized document (XML) failed validation.
    #[error("schema validation failed: {0}")]
    SchemaValidation(#[from] SchemaError),

    /// The render input carried a schema of the wrong kind.
    #[error("{expected} renderer was given a {found}")]
    SchemaMismatch {
        /// Kind the renderer validates with.
        expected: SchemaKind,
        /// Kind that was supplied.
        found: SchemaKind,
    },

    /// The data could not be serialized.
    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// No renderer is registered for the media type.
    #[error("no renderer registered for '{0}'")]
    NoRenderer(String),
}

impl RenderError {
    /// Whether this is a validation failure, as opposed to a programming or
    /// configuration error.
    pub fn is_validation(&self) -> bool {
        matches!(self, RenderError::SchemaValidation(SchemaError::Invalid { .. }))
    }
}
