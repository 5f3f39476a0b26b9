//! # ramlson-api: Axum Integration for ramlson
//!
//! Serves resources declared as route tables. Every route goes through one
//! dispatcher that parses and validates the request body, calls the
//! handler, negotiates JSON or XML from `Accept`, and renders the result
//! through a validating renderer bound to the response's schema.
//!
//! ## API Surface
//!
//! | Path                        | Module                    |
//! |-----------------------------|---------------------------|
//! | `/books`, `/books/{bookId}` | [`resources::books`]      |
//! | `/books/some/other/things`  | [`resources::books`]      |
//! | `/foo`, `/foo/{one}/{two}`  | [`resources::errors`]     |
//! | `/health/*`                 | this module               |
//!
//! ## Middleware Stack
//!
//! ```text
//! TraceLayer → Dispatcher → Handler → Renderer
//! ```
//!
//! ## Crate Policy
//!
//! - Handlers are synchronous and never hold a lock across an `.await`.
//! - Internal error details never reach a response body.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod middleware;
pub mod registry;
pub mod resources;
pub mod state;

use axum::Router;

use crate::registry::{RegistryError, RouteTable};
use crate::state::AppState;

/// Assemble the application router with the built-in resources.
///
/// # Errors
///
/// `RegistryError` if the built-in route table is inconsistent.
pub fn app(state: AppState) -> Result<Router, RegistryError> {
    app_with_routes(state, resources::route_table()?)
}

/// Assemble the application router for an arbitrary route table.
///
/// Health probes (`/health/*`) are mounted outside the dispatcher.
pub fn app_with_routes(state: AppState, table: RouteTable) -> Result<Router, RegistryError> {
    let api = table
        .into_router()?
        .layer(middleware::tracing_layer::layer())
        .with_state(state);

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Ok(Router::new().merge(health).merge(api))
}

/// Liveness probe: 200 while the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the router is built.
async fn readiness() -> &'static str {
    "ready"
}
