//! # JSON Serialization
//!
//! Validates data against a JSON Schema and writes it with configurable
//! separators, indentation and key ordering.
//!
//! ## Output Layout
//!
//! [`JsonOptions::default`] follows Python's `json.dumps` defaults: `", "`
//! and `": "` separators, insertion order, and ASCII-only output with
//! `\uXXXX` escapes. With an indent, each member goes on its own line and the
//! default item separator becomes `","`. Separators given explicitly are
//! written as given. [`JsonOptions::compact`] writes `,` and `:` with raw
//! UTF-8.
//!
//! ## Validation Order
//!
//! Opaque objects are resolved through the default encoder first, so the
//! schema always sees the JSON the client will receive.

use std::io;

use ramlson_core::SerializationError;
use ramlson_schema::{Schema, SchemaKind};
use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};

use crate::adapters::DefaultEncoder;
use crate::error::RenderError;
use crate::input::RenderInput;

/// Layout options for JSON output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonOptions {
    /// Spaces per nesting level; `None` writes everything on one line.
    pub indent: Option<usize>,
    /// Item separator and key separator; `None` uses the defaults for the
    /// indent mode.
    pub separators: Option<(String, String)>,
    /// Sort object keys instead of keeping insertion order.
    pub sort_keys: bool,
    /// Escape every non-ASCII character as `\uXXXX`.
    pub ensure_ascii: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            indent: None,
            separators: None,
            sort_keys: false,
            ensure_ascii: true,
        }
    }
}

impl JsonOptions {
    /// `,` and `:` with no whitespace, non-ASCII written as UTF-8.
    pub fn compact() -> Self {
        Self {
            separators: Some((",".to_string(), ":".to_string())),
            ensure_ascii: false,
            ..Self::default()
        }
    }

    /// Default layout with `indent` spaces per level.
    pub fn pretty(indent: usize) -> Self {
        Self {
            indent: Some(indent),
            ..Self::default()
        }
    }

    /// The separators that will be written.
    pub fn effective_separators(&self) -> (&str, &str) {
        match (&self.separators, self.indent) {
            (Some((item, key)), _) => (item.as_str(), key.as_str()),
            (None, Some(_)) => (",", ": "),
            (None, None) => (", ", ": "),
        }
    }
}

/// Validate (when the input carries a JSON Schema) and serialize.
///
/// # Errors
///
/// - `RenderError::Serialization` if an opaque object has no adapter.
/// - `RenderError::SchemaMismatch` if the input carries an XML Schema.
/// - `RenderError::SchemaValidation` if the data fails validation.
pub fn validating_json_serializer(
    input: RenderInput,
    default: &DefaultEncoder<'_>,
    options: &JsonOptions,
) -> Result<String, RenderError> {
    let (data, schema) = input.into_parts();
    let value = default.resolve(data)?;

    match schema {
        None => {}
        Some(Schema::Json(schema)) => {
            if let Err(err) = schema.validate(&value) {
                tracing::warn!(schema = schema.name(), error = %err, "JSON output failed validation");
                return Err(err.into());
            }
        }
        Some(Schema::Xml(_)) => {
            return Err(RenderError::SchemaMismatch {
                expected: SchemaKind::Json,
                found: SchemaKind::Xml,
            })
        }
    }

    Ok(to_json_string(&value, options)?)
}

/// Write `value` with the given layout.
///
/// # Errors
///
/// Returns `SerializationError` if writing fails.
pub fn to_json_string(value: &Value, options: &JsonOptions) -> Result<String, SerializationError> {
    let sorted;
    let value = if options.sort_keys {
        sorted = sort_keys(value);
        &sorted
    } else {
        value
    };

    let mut out = Vec::with_capacity(128);
    let mut ser = serde_json::Serializer::with_formatter(&mut out, LayoutFormatter::new(options));
    value.serialize(&mut ser)?;
    String::from_utf8(out).map_err(|e| SerializationError::new(format!("output is not UTF-8: {e}")))
}

fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), sort_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// A `serde_json` formatter with configurable separators and indentation.
struct LayoutFormatter {
    item_separator: Vec<u8>,
    key_separator: Vec<u8>,
    indent: Option<Vec<u8>>,
    ensure_ascii: bool,
    depth: usize,
    has_value: bool,
}

impl LayoutFormatter {
    fn new(options: &JsonOptions) -> Self {
        let (item, key) = options.effective_separators();
        Self {
            item_separator: item.as_bytes().to_vec(),
            key_separator: key.as_bytes().to_vec(),
            indent: options.indent.map(|n| vec![b' '; n]),
            ensure_ascii: options.ensure_ascii,
            depth: 0,
            has_value: false,
        }
    }

    fn newline<W: ?Sized + io::Write>(&self, writer: &mut W) -> io::Result<()> {
        if let Some(indent) = &self.indent {
            writer.write_all(b"\n")?;
            for _ in 0..self.depth {
                writer.write_all(indent)?;
            }
        }
        Ok(())
    }

    fn open<W: ?Sized + io::Write>(&mut self, writer: &mut W, bracket: &[u8]) -> io::Result<()> {
        self.depth += 1;
        self.has_value = false;
        writer.write_all(bracket)
    }

    fn close<W: ?Sized + io::Write>(&mut self, writer: &mut W, bracket: &[u8]) -> io::Result<()> {
        self.depth -= 1;
        if self.has_value {
            self.newline(writer)?;
        }
        writer.write_all(bracket)
    }

    fn member<W: ?Sized + io::Write>(&self, writer: &mut W, first: bool) -> io::Result<()> {
        if !first {
            writer.write_all(&self.item_separator)?;
        }
        self.newline(writer)
    }
}

impl Formatter for LayoutFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"[")
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"]")
    }

    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.member(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.open(writer, b"{")
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.close(writer, b"}")
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        self.member(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.key_separator)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        if !self.ensure_ascii || fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for c in fragment.chars() {
            if c.is_ascii() {
                writer.write_all(&[c as u8])?;
            } else {
                for unit in c.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}
