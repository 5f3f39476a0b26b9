//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps schema, render and resource errors to HTTP status codes and returns
//! JSON error bodies with an error code, a message and optional details.
//! Internal error details are never exposed in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ramlson_render::RenderError;
use ramlson_schema::{SchemaError, Violations};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "SCHEMA_VIOLATION").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors that carry them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Request could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Request body did not match its schema (400).
    #[error("request body does not match schema '{schema}'")]
    SchemaViolation {
        schema: String,
        violations: Violations,
    },

    /// Request was well-formed but semantically invalid (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// No representation acceptable to the client (406).
    #[error("not acceptable: {0}")]
    NotAcceptable(String),

    /// Authorization failure (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::SchemaViolation { .. } => (StatusCode::BAD_REQUEST, "SCHEMA_VIOLATION"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::NotAcceptable(_) => (StatusCode::NOT_ACCEPTABLE, "NOT_ACCEPTABLE"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::SchemaViolation { violations, .. } => Some(
                violations
                    .violations()
                    .iter()
                    .map(|v| {
                        serde_json::json!({
                            "path": v.instance_path,
                            "schema_path": v.schema_path,
                            "message": v.message,
                        })
                    })
                    .collect(),
            ),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: self.details(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Schema errors seen while handling a request: an invalid instance is the
/// client's fault, a broken schema is ours.
impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Invalid { schema, violations } => {
                Self::SchemaViolation { schema, violations }
            }
            SchemaError::Malformed(reason) => Self::BadRequest(reason),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// A response that cannot be rendered is always a server fault, including
/// one that fails its own schema.
impl From<RenderError> for AppError {
    fn from(err: RenderError) -> Self {
        if err.is_validation() {
            tracing::warn!(error = %err, "response failed schema validation");
        }
        Self::Internal(err.to_string())
    }
}
