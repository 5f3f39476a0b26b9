//! # Route Registration
//!
//! Resources are declared as explicit tables instead of being discovered:
//! an [`ApiService`] names a base path and carries one [`ApiMethod`] per
//! verb, each with its handler and metadata (permission, default status,
//! request and response schema names). A [`RouteTable`] flattens services
//! into ordered [`RouteRecord`]s and turns them into an axum router whose
//! every route goes through the dispatcher.
//!
//! ```ignore
//! let table = RouteTable::new().service(
//!     api_service("/books/{bookId}")
//!         .method(api_method(Method::GET).permission("view").handler(get_one))
//!         .method(api_method(Method::DELETE).returns(StatusCode::NO_CONTENT).handler(delete)),
//! )?;
//! ```
//!
//! Permissions are recorded, not enforced.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::routing::{on, MethodFilter, MethodRouter};
use axum::Router;
use thiserror::Error;

use crate::dispatch::{dispatch, ApiCall, Incoming};
use crate::error::AppError;
use crate::state::AppState;

/// A resource handler. Returns the data to render; the status comes from
/// the record or from the response head the handler may set.
pub type Handler = fn(&AppState, &mut ApiCall) -> Result<ramlson_core::Payload, AppError>;

/// Route table construction errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{verb} {path} is already registered")]
    Duplicate { verb: Method, path: String },
    #[error("{verb} {path} has no handler")]
    MissingHandler { verb: Method, path: String },
    #[error("method {0} cannot be routed")]
    UnsupportedMethod(Method),
}

/// A base path and the methods served under it.
#[derive(Debug, Clone)]
pub struct ApiService {
    path: String,
    methods: Vec<ApiMethod>,
}

/// Declare a service rooted at `path`.
pub fn api_service(path: impl Into<String>) -> ApiService {
    ApiService {
        path: path.into(),
        methods: Vec::new(),
    }
}

impl ApiService {
    pub fn method(mut self, method: ApiMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// One verb of a service.
#[derive(Debug, Clone)]
pub struct ApiMethod {
    verb: Method,
    subpath: String,
    permission: Option<String>,
    returns: Option<StatusCode>,
    response_schema: Option<String>,
    request_schema: Option<String>,
    handler: Option<Handler>,
}

/// Declare a method for `verb`.
pub fn api_method(verb: Method) -> ApiMethod {
    ApiMethod {
        verb,
        subpath: String::new(),
        permission: None,
        returns: None,
        response_schema: None,
        request_schema: None,
        handler: None,
    }
}

impl ApiMethod {
    /// Path appended to the service path, e.g. `/{one}/{two}`.
    pub fn subpath(mut self, subpath: impl Into<String>) -> Self {
        self.subpath = subpath.into();
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    /// Status used when the handler does not set one.
    pub fn returns(mut self, status: StatusCode) -> Self {
        self.returns = Some(status);
        self
    }

    /// Schema the rendered response must satisfy.
    pub fn response_schema(mut self, name: impl Into<String>) -> Self {
        self.response_schema = Some(name.into());
        self
    }

    /// JSON Schema the request body must satisfy.
    pub fn request_schema(mut self, name: impl Into<String>) -> Self {
        self.request_schema = Some(name.into());
        self
    }

    pub fn handler(mut self, handler: Handler) -> Self {
        self.handler = Some(handler);
        self
    }
}

/// A flattened route: one verb on one full path.
#[derive(Debug, Clone)]
pub struct RouteRecord {
    pub path: String,
    pub verb: Method,
    pub permission: Option<String>,
    pub returns: Option<StatusCode>,
    pub response_schema: Option<String>,
    pub request_schema: Option<String>,
    pub handler: Handler,
}

/// Ordered route records.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    records: Vec<RouteRecord>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every method of `service`.
    ///
    /// # Errors
    ///
    /// `RegistryError::Duplicate` if a verb and path are already taken,
    /// `RegistryError::MissingHandler` if a method has no handler.
    pub fn service(mut self, service: ApiService) -> Result<Self, RegistryError> {
        for method in service.methods {
            let path = format!("{}{}", service.path, method.subpath);
            if self.find(&method.verb, &path).is_some() {
                return Err(RegistryError::Duplicate {
                    verb: method.verb,
                    path,
                });
            }
            let handler = method.handler.ok_or_else(|| RegistryError::MissingHandler {
                verb: method.verb.clone(),
                path: path.clone(),
            })?;
            tracing::debug!(verb = %method.verb, path, "registered route");
            self.records.push(RouteRecord {
                path,
                verb: method.verb,
                permission: method.permission,
                returns: method.returns,
                response_schema: method.response_schema,
                request_schema: method.request_schema,
                handler,
            });
        }
        Ok(self)
    }

    pub fn records(&self) -> &[RouteRecord] {
        &self.records
    }

    /// The record registered for `verb` on exactly `path`.
    pub fn find(&self, verb: &Method, path: &str) -> Option<&RouteRecord> {
        self.records
            .iter()
            .find(|r| r.verb == *verb && r.path == path)
    }

    /// Build a router with one dispatching route per record. Verbs on the
    /// same path share a method router.
    ///
    /// # Errors
    ///
    /// `RegistryError::UnsupportedMethod` for verbs axum cannot route.
    pub fn into_router(self) -> Result<Router<AppState>, RegistryError> {
        let mut paths: Vec<(String, MethodRouter<AppState>)> = Vec::new();
        for record in self.records {
            let filter = MethodFilter::try_from(record.verb.clone())
                .map_err(|_| RegistryError::UnsupportedMethod(record.verb.clone()))?;
            let path = record.path.clone();
            let record = Arc::new(record);
            let handler = move |State(state): State<AppState>,
                                method: Method,
                                uri: Uri,
                                headers: HeaderMap,
                                params: Result<Path<HashMap<String, String>>, PathRejection>,
                                query: Result<Query<HashMap<String, String>>, QueryRejection>,
                                body: Bytes| {
                let record = Arc::clone(&record);
                async move {
                    Incoming::extract(method, uri, headers, params, query, body)
                        .and_then(|incoming| dispatch(&state, &record, incoming))
                }
            };
            match paths.iter().position(|(p, _)| *p == path) {
                Some(at) => {
                    let (path, methods) = paths.remove(at);
                    paths.insert(at, (path, methods.on(filter, handler)));
                }
                None => paths.push((path, on(filter, handler))),
            }
        }
        Ok(paths
            .into_iter()
            .fold(Router::new(), |router, (path, methods)| router.route(&path, methods)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramlson_core::Payload;

    fn ok(_: &AppState, _: &mut ApiCall) -> Result<Payload, AppError> {
        Ok(Payload::default())
    }

    #[test]
    fn paths_join_service_and_subpath() {
        let table = RouteTable::new()
            .service(
                api_service("/foo")
                    .method(api_method(Method::GET).handler(ok))
                    .method(api_method(Method::GET).subpath("/{one}/{two}").handler(ok)),
            )
            .unwrap();
        let paths: Vec<_> = table.records().iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["/foo", "/foo/{one}/{two}"]);
    }

    #[test]
    fn metadata_is_recorded() {
        let table = RouteTable::new()
            .service(
                api_service("/books").method(
                    api_method(Method::POST)
                        .permission("create")
                        .returns(StatusCode::CREATED)
                        .request_schema("book")
                        .response_schema("book")
                        .handler(ok),
                ),
            )
            .unwrap();
        let record = table.find(&Method::POST, "/books").unwrap();
        assert_eq!(record.permission.as_deref(), Some("create"));
        assert_eq!(record.returns, Some(StatusCode::CREATED));
        assert_eq!(record.request_schema.as_deref(), Some("book"));
        assert_eq!(record.response_schema.as_deref(), Some("book"));
        assert!(table.find(&Method::GET, "/books").is_none());
    }

    #[test]
    fn duplicate_verb_and_path_is_rejected() {
        let err = RouteTable::new()
            .service(api_service("/books").method(api_method(Method::GET).handler(ok)))
            .unwrap()
            .service(api_service("/books").method(api_method(Method::GET).handler(ok)))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::Duplicate {
                verb: Method::GET,
                path: "/books".into()
            }
        );
    }

    #[test]
    fn same_path_different_verbs_is_fine() {
        let table = RouteTable::new()
            .service(
                api_service("/books")
                    .method(api_method(Method::GET).handler(ok))
                    .method(api_method(Method::POST).handler(ok)),
            )
            .unwrap();
        assert_eq!(table.records().len(), 2);
        assert!(table.into_router().is_ok());
    }

    #[test]
    fn method_without_handler_is_rejected() {
        let err = RouteTable::new()
            .service(api_service("/books").method(api_method(Method::PUT)))
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingHandler { .. }));
    }

    #[test]
    fn extension_methods_cannot_be_routed() {
        let verb = Method::from_bytes(b"PURGE").unwrap();
        let err = RouteTable::new()
            .service(api_service("/cache").method(api_method(verb.clone()).handler(ok)))
            .unwrap()
            .into_router()
            .unwrap_err();
        assert_eq!(err, RegistryError::UnsupportedMethod(verb));
    }
}
