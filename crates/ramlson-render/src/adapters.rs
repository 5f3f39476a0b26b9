//! # Default Encoder and Type Adapters
//!
//! JSON cannot represent an arbitrary Rust object, so a payload may carry an
//! [`OpaqueObject`](ramlson_core::OpaqueObject) instead of structured data.
//! The JSON renderer resolves such objects with a [`DefaultEncoder`] built
//! for each request from the renderer's registered [`JsonAdapters`].
//!
//! An adapter is keyed by the exact type it handles and receives the current
//! request, so the same object may encode differently per request (e.g.
//! absolute URLs built from the request path).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use ramlson_core::{OpaqueObject, Payload, RequestContext, SerializationError};
use serde_json::Value;

type AdapterFn = Arc<dyn Fn(&dyn Any, Option<&RequestContext>) -> Option<Value> + Send + Sync>;

/// Type adapters that turn opaque objects into JSON values.
#[derive(Clone, Default)]
pub struct JsonAdapters {
    adapters: HashMap<TypeId, AdapterFn>,
}

impl JsonAdapters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the adapter for `T`, replacing any earlier one.
    pub fn add<T, F>(&mut self, adapter: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T, Option<&RequestContext>) -> Value + Send + Sync + 'static,
    {
        let erased: AdapterFn = Arc::new(move |obj: &dyn Any, request: Option<&RequestContext>| {
            obj.downcast_ref::<T>().map(|value| adapter(value, request))
        });
        self.adapters.insert(TypeId::of::<T>(), erased);
        self
    }

    /// Builder form of [`add`](Self::add).
    pub fn with<T, F>(mut self, adapter: F) -> Self
    where
        T: Any,
        F: Fn(&T, Option<&RequestContext>) -> Value + Send + Sync + 'static,
    {
        self.add::<T, F>(adapter);
        self
    }

    /// Whether an adapter for `T` is registered.
    pub fn contains<T: Any>(&self) -> bool {
        self.adapters.contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for JsonAdapters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonAdapters")
            .field("len", &self.adapters.len())
            .finish()
    }
}

/// Fallback encoder for one request.
#[derive(Debug, Clone, Copy)]
pub struct DefaultEncoder<'a> {
    adapters: &'a JsonAdapters,
    request: Option<&'a RequestContext>,
}

impl<'a> DefaultEncoder<'a> {
    pub fn new(adapters: &'a JsonAdapters, request: Option<&'a RequestContext>) -> Self {
        Self { adapters, request }
    }

    /// The request this encoder was built for.
    pub fn request(&self) -> Option<&'a RequestContext> {
        self.request
    }

    /// Encode an opaque object with its registered adapter.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` ("Object of type X is not JSON
    /// serializable") if no adapter handles the object's type.
    pub fn encode(&self, obj: &OpaqueObject) -> Result<Value, SerializationError> {
        let any = obj.as_any();
        self.adapters
            .adapters
            .get(&any.type_id())
            .and_then(|adapter| adapter(any, self.request))
            .ok_or_else(|| SerializationError::unsupported_type(obj.type_name(), "JSON"))
    }

    /// Structured data for `payload`, encoding it if it is an opaque object.
    pub fn resolve(&self, payload: Payload) -> Result<Value, SerializationError> {
        match payload {
            Payload::Value(value) => Ok(value),
            Payload::Object(obj) => self.encode(&obj),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Money {
        cents: i64,
    }

    struct Link {
        target: String,
    }

    fn adapters() -> JsonAdapters {
        JsonAdapters::new()
            .with(|m: &Money, _| json!(format!("{}.{:02}", m.cents / 100, m.cents % 100)))
            .with(|l: &Link, request: Option<&RequestContext>| {
                let base = request.map(|r| r.path.as_str()).unwrap_or("");
                json!(format!("{base}/{}", l.target))
            })
    }

    #[test]
    fn encodes_registered_type() {
        let adapters = adapters();
        let encoder = DefaultEncoder::new(&adapters, None);
        let value = encoder.encode(&OpaqueObject::new(Money { cents: 1250 })).unwrap();
        assert_eq!(value, json!("12.50"));
    }

    #[test]
    fn adapter_sees_request() {
        let adapters = adapters();
        let request = RequestContext::new("GET", "/books");
        let encoder = DefaultEncoder::new(&adapters, Some(&request));
        let value = encoder
            .resolve(Payload::object(Link {
                target: "123".to_string(),
            }))
            .unwrap();
        assert_eq!(value, json!("/books/123"));
    }

    #[test]
    fn unregistered_type_is_not_serializable() {
        struct Unknown;
        let adapters = adapters();
        let err = DefaultEncoder::new(&adapters, None)
            .encode(&OpaqueObject::new(Unknown))
            .unwrap_err();
        assert!(err.message.starts_with("Object of type "), "{err}");
        assert!(err.message.ends_with("Unknown is not JSON serializable"), "{err}");
    }

    #[test]
    fn values_pass_through() {
        let adapters = JsonAdapters::new();
        let encoder = DefaultEncoder::new(&adapters, None);
        assert_eq!(encoder.resolve(json!([1]).into()).unwrap(), json!([1]));
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let mut adapters = adapters();
        adapters.add(|_: &Money, _| json!(0));
        assert_eq!(adapters.len(), 2);
        assert!(adapters.contains::<Money>());
        assert!(!adapters.contains::<String>());
        let value = DefaultEncoder::new(&adapters, None)
            .encode(&OpaqueObject::new(Money { cents: 5 }))
            .unwrap();
        assert_eq!(value, json!(0));
    }
}
