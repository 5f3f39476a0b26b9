//! # Schema Registry
//!
//! Holds the compiled schemas an application renders against, keyed by
//! file stem. A JSON Schema and an XSD may share a stem (`book.json`,
//! `book.xsd`); [`SchemaRegistry::schema_for`] picks the one matching the
//! negotiated media type.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use ramlson_core::{APPLICATION_JSON, APPLICATION_XML};
use serde_json::Value;

use crate::error::SchemaError;
use crate::json::JsonSchema;
use crate::xsd::{XmlSchema, XsdSchema};

/// Which kind of document a schema checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    /// JSON Schema.
    Json,
    /// XML Schema.
    Xml,
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Json => f.write_str("JSON Schema"),
            SchemaKind::Xml => f.write_str("XML Schema"),
        }
    }
}

/// A schema object a renderer can validate against.
#[derive(Debug, Clone)]
pub enum Schema {
    /// Checks JSON data before serialization.
    Json(Arc<JsonSchema>),
    /// Checks the parsed tree of serialized XML.
    Xml(Arc<dyn XmlSchema>),
}

impl Schema {
    /// The schema's kind.
    pub fn kind(&self) -> SchemaKind {
        match self {
            Schema::Json(_) => SchemaKind::Json,
            Schema::Xml(_) => SchemaKind::Xml,
        }
    }

    /// The schema's name.
    pub fn name(&self) -> &str {
        match self {
            Schema::Json(schema) => schema.name(),
            Schema::Xml(schema) => schema.name(),
        }
    }
}

impl From<JsonSchema> for Schema {
    fn from(schema: JsonSchema) -> Self {
        Schema::Json(Arc::new(schema))
    }
}

impl From<XsdSchema> for Schema {
    fn from(schema: XsdSchema) -> Self {
        Schema::Xml(Arc::new(schema))
    }
}

/// Compiled schemas keyed by name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    json: HashMap<String, Arc<JsonSchema>>,
    xml: HashMap<String, Arc<dyn XmlSchema>>,
}

impl SchemaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.json` and `*.xsd` file in `dir`.
    ///
    /// JSON Schemas in the directory may `$ref` each other by file name.
    /// Other files are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Load` if the directory or a file cannot be read
    /// or a JSON file does not parse, and `SchemaError::Compile` if a
    /// schema is not usable.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| SchemaError::Load {
            name: dir.display().to_string(),
            reason: format!("cannot read schema directory: {e}"),
        })?;

        let mut json_docs: Vec<(String, Value)> = Vec::new();
        let mut resources: HashMap<String, Value> = HashMap::new();
        let mut registry = Self::new();

        for entry in entries {
            let path = entry?.path();
            let (Some(file_name), Some(stem), Some(ext)) = (
                path.file_name().and_then(|n| n.to_str()),
                path.file_stem().and_then(|n| n.to_str()),
                path.extension().and_then(|n| n.to_str()),
            ) else {
                continue;
            };

            match ext {
                "json" => {
                    let content = std::fs::read_to_string(&path)?;
                    let value: Value =
                        serde_json::from_str(&content).map_err(|e| SchemaError::Load {
                            name: file_name.to_string(),
                            reason: format!("invalid JSON: {e}"),
                        })?;
                    resources.insert(file_name.to_string(), value.clone());
                    resources.insert(stem.to_string(), value.clone());
                    json_docs.push((stem.to_string(), value));
                }
                "xsd" => {
                    let content = std::fs::read_to_string(&path)?;
                    registry.insert_xml(stem, XsdSchema::parse_named(stem, &content)?);
                }
                _ => {}
            }
        }

        for (name, document) in json_docs {
            let schema = JsonSchema::compile_with_resources(name.clone(), document, &resources)?;
            registry.json.insert(name, Arc::new(schema));
        }

        tracing::info!(
            dir = %dir.display(),
            json = registry.json.len(),
            xml = registry.xml.len(),
            "loaded schemas"
        );
        Ok(registry)
    }

    /// Register a compiled JSON Schema.
    pub fn insert_json(&mut self, name: impl Into<String>, schema: JsonSchema) {
        self.json.insert(name.into(), Arc::new(schema));
    }

    /// Register an XML Schema.
    pub fn insert_xml(&mut self, name: impl Into<String>, schema: impl XmlSchema + 'static) {
        self.xml.insert(name.into(), Arc::new(schema));
    }

    pub fn json(&self, name: &str) -> Option<Arc<JsonSchema>> {
        self.json.get(name).cloned()
    }

    pub fn xml(&self, name: &str) -> Option<Arc<dyn XmlSchema>> {
        self.xml.get(name).cloned()
    }

    /// The schema called `name` that checks documents of `media_type`.
    pub fn schema_for(&self, name: &str, media_type: &str) -> Option<Schema> {
        let essence = media_type.split(';').next().unwrap_or(media_type).trim();
        if essence.eq_ignore_ascii_case(APPLICATION_JSON) {
            self.json(name).map(Schema::Json)
        } else if essence.eq_ignore_ascii_case(APPLICATION_XML) {
            self.xml(name).map(Schema::Xml)
        } else {
            None
        }
    }

    /// Every registered name, sorted and deduplicated.
    pub fn names(&self) -> Vec<&str> {
        let names: BTreeSet<&str> = self
            .json
            .keys()
            .chain(self.xml.keys())
            .map(String::as_str)
            .collect();
        names.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.json.len() + self.xml.len()
    }

    pub fn is_empty(&self) -> bool {
        self.json.is_empty() && self.xml.is_empty()
    }
}
