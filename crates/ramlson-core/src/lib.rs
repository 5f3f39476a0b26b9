//! # ramlson-core: Foundational Types for ramlson
//!
//! The leaf of the ramlson dependency DAG. Defines the framework-neutral
//! vocabulary shared by the schema, render and API crates.
//!
//! ## Key Types
//!
//! 1. **`Payload`**: the value handed to a renderer, either a structured
//!    `serde_json::Value` or an opaque typed object that only a per-request
//!    default encoder can turn into JSON.
//!
//! 2. **`RequestContext` / `ResponseHead` / `System`**: the per-request
//!    context a render function receives. The response head carries the
//!    mutable content type and the protocol-level default it is compared to.
//!
//! 3. **Media types**: `APPLICATION_JSON`, `APPLICATION_XML`, and
//!    [`negotiate`] for picking a representation from an `Accept` header.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `ramlson-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod context;
pub mod error;
pub mod media;
pub mod payload;

pub use context::{RequestContext, ResponseHead, System};
pub use error::SerializationError;
pub use media::{negotiate, MediaRange, APPLICATION_JSON, APPLICATION_XML, TEXT_HTML};
pub use payload::{OpaqueObject, Payload};
