//! # Render Payloads
//!
//! A [`Payload`] is the response value a handler produces and a renderer
//! consumes. Most payloads are structured data (mappings, sequences and
//! scalars) held as a `serde_json::Value`, whose object key order is the
//! insertion order.
//!
//! Some values have no structural representation of their own: a domain
//! object that does not implement `Serialize`, or one whose JSON form depends
//! on the request. Those travel as an [`OpaqueObject`] and are resolved by the
//! JSON renderer's per-request default encoder. The XML path has no such hook
//! and rejects them.

use std::any::{type_name, Any};
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::error::SerializationError;

/// A typed value without a structural representation.
pub struct OpaqueObject {
    type_name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl OpaqueObject {
    /// Wrap a value, remembering its type name for error messages.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: type_name::<T>(),
            value: Box::new(value),
        }
    }

    /// Fully qualified name of the wrapped type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the wrapped value as `dyn Any`.
    pub fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }

    /// Borrow the wrapped value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for OpaqueObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpaqueObject")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Data handed to a renderer.
#[derive(Debug)]
pub enum Payload {
    /// Structured data.
    Value(Value),
    /// An object only a default encoder can represent.
    Object(OpaqueObject),
}

impl Payload {
    /// Convert any `Serialize` value into structured data.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the value's `Serialize` impl fails or
    /// produces something JSON cannot hold (e.g. a map with non-string keys).
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, SerializationError> {
        serde_json::to_value(value)
            .map(Payload::Value)
            .map_err(|e| SerializationError {
                type_name: Some(type_name::<T>().to_string()),
                message: format!("cannot convert {} to structured data: {e}", type_name::<T>()),
            })
    }

    /// Wrap an opaque object.
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Payload::Object(OpaqueObject::new(value))
    }

    /// The structured data, if this is not an opaque object.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Payload::Value(v) => Some(v),
            Payload::Object(_) => None,
        }
    }

    /// Name of the payload's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Payload::Value(_) => "serde_json::Value",
            Payload::Object(obj) => obj.type_name(),
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Value(value)
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Value(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct Book {
        id: u32,
        title: String,
    }

    struct Unserializable {
        inner: u8,
    }

    #[test]
    fn from_serialize_struct() {
        let book = Book {
            id: 123,
            title: "Dune".to_string(),
        };
        let payload = Payload::from_serialize(&book).unwrap();
        assert_eq!(payload.as_value(), Some(&json!({"id": 123, "title": "Dune"})));
    }

    #[test]
    fn from_serialize_keeps_field_order() {
        let book = Book {
            id: 1,
            title: "x".to_string(),
        };
        let payload = Payload::from_serialize(&book).unwrap();
        let keys: Vec<&String> = payload
            .as_value()
            .and_then(Value::as_object)
            .unwrap()
            .keys()
            .collect();
        assert_eq!(keys, ["id", "title"]);
    }

    #[test]
    fn from_serialize_rejects_non_string_keys() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], "a");
        let err = Payload::from_serialize(&map).unwrap_err();
        assert!(err.type_name.unwrap().contains("BTreeMap"));
    }

    #[test]
    fn opaque_object_downcasts() {
        let payload = Payload::object(Unserializable { inner: 7 });
        assert!(payload.as_value().is_none());
        assert!(payload.type_name().ends_with("Unserializable"));
        match payload {
            Payload::Object(obj) => {
                assert_eq!(obj.downcast_ref::<Unserializable>().unwrap().inner, 7);
                assert!(obj.downcast_ref::<String>().is_none());
            }
            Payload::Value(_) => panic!("expected opaque object"),
        }
    }

    #[test]
    fn default_is_null() {
        assert_eq!(Payload::default().as_value(), Some(&Value::Null));
    }
}
