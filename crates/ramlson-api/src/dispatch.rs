//! # Dispatcher
//!
//! Every route built by [`RouteTable::into_router`](crate::registry::RouteTable::into_router)
//! ends here. For one request and its [`RouteRecord`] the dispatcher:
//!
//! 1. parses a non-empty body as JSON (malformed → 400)
//! 2. validates it against the record's request schema, if any and enabled
//!    (violations → 400 with details)
//! 3. negotiates a renderer from `Accept` (nothing acceptable → 406, and the
//!    handler never runs)
//! 4. calls the handler with an [`ApiCall`] holding a fresh [`RequestContext`]
//! 5. picks the status: the one the handler set on the response head, else
//!    the record's `returns`, else 200; a 204 is sent without a body
//! 6. pairs the data with the record's response schema for the negotiated
//!    media type, if any and enabled
//! 7. renders through the factory's render function with the request bound
//! 8. responds with the status, the content type the renderer left on the
//!    response head, and the rendered bytes
//!
//! Render failures, including a response that fails its own schema, are
//! internal errors.

use std::collections::HashMap;

use axum::body::{Body, Bytes};
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query};
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use ramlson_core::{RequestContext, System};
use ramlson_render::{RenderInput, RendererInfo};
use serde_json::Value;

use crate::error::AppError;
use crate::registry::RouteRecord;
use crate::state::AppState;

/// What a handler receives.
#[derive(Debug)]
pub struct ApiCall {
    /// Path parameters by name.
    pub params: HashMap<String, String>,
    /// Query parameters by name.
    pub query: HashMap<String, String>,
    /// Parsed JSON body, if one was sent.
    pub body: Option<Value>,
    /// The request being served; handlers may set the response status or
    /// content type on `context.response`.
    pub context: RequestContext,
}

impl ApiCall {
    /// A path parameter.
    ///
    /// # Errors
    ///
    /// `AppError::Internal` if the route does not define it.
    pub fn param(&self, name: &str) -> Result<&str, AppError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| AppError::Internal(format!("route has no path parameter '{name}'")))
    }

    /// A query parameter, if present.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// The request body.
    ///
    /// # Errors
    ///
    /// `AppError::BadRequest` if the request had no body.
    pub fn body(&self) -> Result<&Value, AppError> {
        self.body
            .as_ref()
            .ok_or_else(|| AppError::BadRequest("request body is required".to_string()))
    }
}

/// The parts of a request the dispatcher works from.
#[derive(Debug)]
pub struct Incoming {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: Bytes,
}

impl Incoming {
    /// Collect extractor results, mapping rejections to 400.
    pub fn extract(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        params: Result<Path<HashMap<String, String>>, PathRejection>,
        query: Result<Query<HashMap<String, String>>, QueryRejection>,
        body: Bytes,
    ) -> Result<Self, AppError> {
        let params = match params {
            Ok(Path(params)) => params,
            Err(PathRejection::MissingPathParams(_)) => HashMap::new(),
            Err(err) => return Err(AppError::BadRequest(err.body_text())),
        };
        let Query(query) = query.map_err(|err| AppError::BadRequest(err.body_text()))?;
        Ok(Self {
            method,
            uri,
            headers,
            params,
            query,
            body,
        })
    }
}

/// Serve one request for `record`.
pub fn dispatch(
    state: &AppState,
    record: &RouteRecord,
    incoming: Incoming,
) -> Result<Response, AppError> {
    let body = parse_body(&incoming.body)?;

    if let (Some(name), Some(body)) = (&record.request_schema, &body) {
        if state.config.validate_requests {
            match state.schemas.json(name) {
                Some(schema) => schema.validate(body)?,
                None => tracing::warn!(schema = %name, "request schema not registered"),
            }
        }
    }

    let accept = incoming
        .headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let factory = state.renderers.negotiate(accept.as_deref()).ok_or_else(|| {
        AppError::NotAcceptable(format!(
            "none of {} satisfies Accept: {}",
            state.renderers.offered().join(", "),
            accept.as_deref().unwrap_or("")
        ))
    })?;
    let media_type = factory.media_type();

    let context = RequestContext {
        method: incoming.method.as_str().to_string(),
        path: incoming.uri.path().to_string(),
        query: incoming.uri.query().map(str::to_string),
        accept,
        ..RequestContext::default()
    };
    let mut call = ApiCall {
        params: incoming.params,
        query: incoming.query,
        body,
        context,
    };

    let data = (record.handler)(state, &mut call)?;

    let status = call
        .context
        .response
        .status
        .and_then(|code| StatusCode::from_u16(code).ok())
        .or(record.returns)
        .unwrap_or(StatusCode::OK);
    if status == StatusCode::NO_CONTENT {
        return Ok(status.into_response());
    }

    let schema = record
        .response_schema
        .as_deref()
        .filter(|_| state.config.validate_responses)
        .and_then(|name| {
            let schema = state.schemas.schema_for(name, media_type);
            if schema.is_none() {
                tracing::warn!(schema = name, media_type, "response schema not registered");
            }
            schema
        });
    let input = match schema {
        Some(schema) => RenderInput::validated(data, schema),
        None => RenderInput::plain(data),
    };

    let info = RendererInfo::new(record.path.clone(), media_type);
    let rendered = {
        let mut system = System::with_request(&mut call.context);
        factory.renderer(&info)(input, &mut system)?
    };

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, call.context.response.content_type.as_str())
        .body(Body::from(rendered))
        .map_err(|e| AppError::Internal(format!("cannot build response: {e}")))
}

fn parse_body(bytes: &Bytes) -> Result<Option<Value>, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("malformed JSON body: {e}")))
}
