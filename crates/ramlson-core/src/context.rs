//! # Request and Response Context
//!
//! The per-request state a render function sees. The host framework builds a
//! [`RequestContext`] for every request; handlers may set the outgoing
//! content type or status on its [`ResponseHead`], and renderers only fill in
//! a content type when nobody else did.
//!
//! "Nobody else did" is decided by comparing the current content type with
//! the protocol-level default, exactly as the response object contract
//! requires: the default is a constant, and a response whose content type
//! still equals it is considered unset.

use crate::media::TEXT_HTML;

/// Mutable head of the outgoing response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    /// Current content type.
    pub content_type: String,
    /// Protocol-level default the content type starts out as.
    pub default_content_type: &'static str,
    /// Status explicitly chosen by the handler, if any.
    pub status: Option<u16>,
}

impl ResponseHead {
    /// A fresh head whose content type is the given default.
    pub fn with_default(default_content_type: &'static str) -> Self {
        Self {
            content_type: default_content_type.to_string(),
            default_content_type,
            status: None,
        }
    }

    /// Whether the content type has not been changed from the default.
    pub fn is_default_content_type(&self) -> bool {
        self.content_type == self.default_content_type
    }

    /// Explicitly set the content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }
}

impl Default for ResponseHead {
    fn default() -> Self {
        Self::with_default(TEXT_HTML)
    }
}

/// The request currently being served.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// HTTP method, upper case.
    pub method: String,
    /// Request path without the query string.
    pub path: String,
    /// Raw query string, if present.
    pub query: Option<String>,
    /// Raw `Accept` header, if present.
    pub accept: Option<String>,
    /// Head of the response being built for this request.
    pub response: ResponseHead,
}

impl RequestContext {
    /// Context for `method path` with a default response head.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    /// Set the `Accept` header.
    pub fn with_accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }
}

/// System values passed to a render function alongside the value.
///
/// The request is optional: renderers invoked outside a request (tests,
/// offline tools) skip the content type step entirely.
#[derive(Debug, Default)]
pub struct System<'a> {
    /// The current request, if rendering happens inside one.
    pub request: Option<&'a mut RequestContext>,
}

impl<'a> System<'a> {
    /// System values bound to a request.
    pub fn with_request(request: &'a mut RequestContext) -> Self {
        Self {
            request: Some(request),
        }
    }

    /// System values with no request.
    pub fn detached() -> Self {
        Self { request: None }
    }

    /// Borrow the request immutably.
    pub fn request(&self) -> Option<&RequestContext> {
        self.request.as_deref()
    }
}
