//! # ramlson-cli: Offline Rendering and Validation
//!
//! The `ramlson` binary runs the same serializers and validators the API
//! server uses, without a server.
//!
//! ## Subcommands
//!
//! - `render`: render a JSON document as JSON or XML, optionally
//!   validating it against a schema
//! - `validate`: check a JSON document against a JSON Schema or an XML
//!   document against an XSD
//!
//! ## Crate Policy
//!
//! - Argument parsing lives with each subcommand; `main` only dispatches.
//! - Handlers return [`CliError`]; `anyhow` is confined to `main`.

pub mod error;
pub mod input;
pub mod render;
pub mod validate;

pub use error::CliError;
