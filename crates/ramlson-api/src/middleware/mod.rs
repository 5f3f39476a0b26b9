//! # Middleware
//!
//! Tower layers applied around the dispatched routes.

pub mod tracing_layer;
