//! # ramlson-schema: Schema Validation
//!
//! Schema objects the renderers validate against, and the registry that
//! loads them from disk.
//!
//! ## JSON (`json`)
//!
//! [`JsonSchema`] compiles a document with draft-04 semantics and format
//! checking enabled. Validation collects every violation rather than
//! stopping at the first.
//!
//! ## XML (`xml`, `xsd`)
//!
//! Serialized XML is parsed into an [`XmlElement`] tree and handed to an
//! [`XmlSchema`]. [`XsdSchema`] implements the trait for a practical subset
//! of XSD 1.0; applications may plug in their own implementation.
//!
//! ## Registry (`registry`)
//!
//! [`SchemaRegistry::load`] reads every `*.json` and `*.xsd` file in a
//! directory, keyed by file stem. [`Schema`] is the handle a renderer
//! receives: one of the two kinds, shared behind an `Arc`.
//!
//! ## Crate Policy
//!
//! - Depends only on `ramlson-core` internally.
//! - Schema references never go to the network.
//! - Validation failures carry structured violations with instance paths.

pub mod error;
pub mod json;
pub mod registry;
pub mod xml;
pub mod xsd;

pub use error::{SchemaError, Violation, Violations};
pub use json::JsonSchema;
pub use registry::{Schema, SchemaKind, SchemaRegistry};
pub use xml::XmlElement;
pub use xsd::{XmlSchema, XsdSchema, XSD_NAMESPACE};
