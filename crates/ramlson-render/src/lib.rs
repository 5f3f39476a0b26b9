//! # ramlson-render: Validating Renderers
//!
//! JSON and XML renderers that can check their output against a schema
//! before it leaves the server.
//!
//! ## Pipeline
//!
//! 1. A handler produces a [`RenderInput`]: bare data, or data paired with
//!    the [`Schema`](ramlson_schema::Schema) it must satisfy.
//! 2. The host negotiates a media type and asks the [`RendererRegistry`] for
//!    the matching [`RendererFactory`], which creates a [`RenderFn`].
//! 3. The render function fills in the response content type if the handler
//!    left it at the default, then serializes:
//!    - **JSON** ([`validating_json_serializer`]): opaque objects are resolved
//!      through the per-request [`DefaultEncoder`], the data is validated
//!      against the JSON Schema, then written with [`JsonOptions`].
//!    - **XML** ([`validating_xml_serializer`]): the data is converted with the
//!      dict-to-XML mapping, and the produced document is parsed back and
//!      validated against the XML Schema.
//!
//! ## Crate Policy
//!
//! - A validation failure is an error; nothing invalid is returned.
//! - Serializers are plain functions and can be swapped per renderer.

pub mod adapters;
pub mod error;
pub mod input;
pub mod json;
pub mod renderer;
pub mod xml;

pub use adapters::{DefaultEncoder, JsonAdapters};
pub use error::RenderError;
pub use input::{RenderInput, RendererState};
pub use json::{to_json_string, validating_json_serializer, JsonOptions};
pub use renderer::{
    JsonSerializer, RenderFn, RendererFactory, RendererInfo, RendererRegistry,
    ValidatingJsonRenderer, ValidatingXmlRenderer, XmlSerializer,
};
pub use xml::{default_item_name, dict_to_xml, validating_xml_serializer, ItemNameFn, XmlOptions};
