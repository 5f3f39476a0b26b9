//! # Failure Probes
//!
//! `/foo` always fails so the internal error path can be exercised;
//! `/foo/{one}/{two}` echoes its path parameters.

use axum::http::Method;
use ramlson_core::Payload;
use serde_json::json;

use crate::dispatch::ApiCall;
use crate::error::AppError;
use crate::registry::{api_method, api_service, ApiService};
use crate::state::AppState;

fn fail(_: &AppState, _: &mut ApiCall) -> Result<Payload, AppError> {
    Err(AppError::Internal("deliberate failure".to_string()))
}

fn echo(_: &AppState, call: &mut ApiCall) -> Result<Payload, AppError> {
    Ok(json!({"one": call.param("one")?, "two": call.param("two")?}).into())
}

pub fn services() -> Vec<ApiService> {
    vec![api_service("/foo")
        .method(api_method(Method::GET).handler(fail))
        .method(api_method(Method::GET).subpath("/{one}/{two}").handler(echo))]
}
