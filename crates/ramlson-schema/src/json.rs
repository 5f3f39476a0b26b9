//! # JSON Schema Validation
//!
//! Compiles JSON Schema documents with **draft-04** semantics and format
//! checking enabled, and validates response data against them.
//!
//! ## Reference Resolution
//!
//! Schemas loaded together (see [`SchemaRegistry`](crate::SchemaRegistry))
//! may refer to each other by file name, e.g. `{"$ref": "author.json"}`.
//! References are resolved locally from the documents supplied at compile
//! time; the validator never goes to the network. A reference that names no
//! known document fails compilation.

use std::collections::HashMap;
use std::fmt;

use jsonschema::{Draft, Retrieve, Uri, Validator};
use serde_json::Value;

use crate::error::{SchemaError, Violation, Violations};

/// Resolves `$ref` URIs against documents held in memory.
struct LocalRetriever {
    /// Map from file name or stem to schema document.
    documents: HashMap<String, Value>,
}

impl Retrieve for LocalRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();

        if let Some(value) = self.documents.get(uri_str) {
            return Ok(value.clone());
        }

        let filename = uri_str.rsplit('/').next().unwrap_or(uri_str);
        let stem = filename.strip_suffix(".json").unwrap_or(filename);
        match self
            .documents
            .get(filename)
            .or_else(|| self.documents.get(stem))
        {
            Some(value) => Ok(value.clone()),
            None => Err(format!("unresolved schema reference '{uri_str}'").into()),
        }
    }
}

/// A compiled JSON Schema.
pub struct JsonSchema {
    name: String,
    document: Value,
    validator: Validator,
}

impl JsonSchema {
    /// Compile an anonymous schema document.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Compile` if the document is not a valid draft-04 schema.
    pub fn compile(document: Value) -> Result<Self, SchemaError> {
        Self::compile_with_resources("<inline>", document, &HashMap::new())
    }

    /// Compile a named schema document.
    pub fn compile_named(name: impl Into<String>, document: Value) -> Result<Self, SchemaError> {
        Self::compile_with_resources(name, document, &HashMap::new())
    }

    /// Compile a named schema whose `$ref`s may point at `resources`,
    /// keyed by file name (`author.json`) or stem (`author`).
    pub fn compile_with_resources(
        name: impl Into<String>,
        document: Value,
        resources: &HashMap<String, Value>,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let retriever = LocalRetriever {
            documents: resources.clone(),
        };
        let validator = jsonschema::options()
            .with_draft(Draft::Draft4)
            .should_validate_formats(true)
            .with_retriever(retriever)
            .build(&document)
            .map_err(|e| SchemaError::Compile {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name,
            document,
            validator,
        })
    }

    /// Name the schema was compiled under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The source document.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Whether `instance` conforms.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Validate `instance`, collecting every violation.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Invalid` with structured violation details if
    /// the instance does not conform.
    pub fn validate(&self, instance: &Value) -> Result<(), SchemaError> {
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid {
                schema: self.name.clone(),
                violations: Violations::new(violations),
            })
        }
    }
}

impl fmt::Debug for JsonSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
