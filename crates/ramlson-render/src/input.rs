//! # Render Input
//!
//! What a render function is asked to render. A handler either returns bare
//! data, rendered as-is, or data paired with the schema it must conform to.
//! [`RendererState`] is the record form used by code that decides on
//! validation at runtime; it collapses into a [`RenderInput`].

use ramlson_core::Payload;
use ramlson_schema::Schema;
use serde_json::Value;

/// The value handed to a render function.
#[derive(Debug)]
pub enum RenderInput {
    /// Validate `data` against `schema` while rendering.
    WithValidation {
        /// Data to render.
        data: Payload,
        /// Schema the data (JSON) or serialized document (XML) must satisfy.
        schema: Schema,
    },
    /// Render `data` without validation.
    Plain {
        /// Data to render.
        data: Payload,
    },
}

impl RenderInput {
    pub fn plain(data: impl Into<Payload>) -> Self {
        RenderInput::Plain { data: data.into() }
    }

    pub fn validated(data: impl Into<Payload>, schema: Schema) -> Self {
        RenderInput::WithValidation {
            data: data.into(),
            schema,
        }
    }

    /// The data to render.
    pub fn data(&self) -> &Payload {
        match self {
            RenderInput::WithValidation { data, .. } | RenderInput::Plain { data } => data,
        }
    }

    /// The schema to validate against, if any.
    pub fn schema(&self) -> Option<&Schema> {
        match self {
            RenderInput::WithValidation { schema, .. } => Some(schema),
            RenderInput::Plain { .. } => None,
        }
    }

    /// Split into data and optional schema.
    pub fn into_parts(self) -> (Payload, Option<Schema>) {
        match self {
            RenderInput::WithValidation { data, schema } => (data, Some(schema)),
            RenderInput::Plain { data } => (data, None),
        }
    }
}

impl From<Payload> for RenderInput {
    fn from(data: Payload) -> Self {
        RenderInput::Plain { data }
    }
}

impl From<Value> for RenderInput {
    fn from(data: Value) -> Self {
        RenderInput::Plain {
            data: Payload::Value(data),
        }
    }
}

/// Data, an optional schema, and whether to validate.
///
/// Validation happens only when `validate` is set and a schema is present;
/// either alone renders plainly.
#[derive(Debug)]
pub struct RendererState {
    pub schema: Option<Schema>,
    pub data: Payload,
    pub validate: bool,
}

impl From<RendererState> for RenderInput {
    fn from(state: RendererState) -> Self {
        match (state.validate, state.schema) {
            (true, Some(schema)) => RenderInput::WithValidation {
                data: state.data,
                schema,
            },
            _ => RenderInput::Plain { data: state.data },
        }
    }
}
