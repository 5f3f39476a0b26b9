//! # Input Files
//!
//! Reading documents (`-` means stdin) and schema files. A schema's type is
//! decided by its extension: `.json` is a JSON Schema, `.xsd` an XML Schema.
//! A JSON Schema may `$ref` the other `.json` files next to it.

use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use ramlson_schema::{JsonSchema, Schema, XsdSchema};
use serde_json::Value;

use crate::error::CliError;

/// Read a whole file, or stdin for `-`.
pub fn read_text(path: &Path) -> Result<String, CliError> {
    let read_err = |source| CliError::Read {
        path: path.to_path_buf(),
        source,
    };
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text).map_err(read_err)?;
        Ok(text)
    } else {
        std::fs::read_to_string(path).map_err(read_err)
    }
}

/// Read and parse a JSON document.
pub fn read_json(path: &Path) -> Result<Value, CliError> {
    let text = read_text(path)?;
    serde_json::from_str(&text).map_err(|e| CliError::Json {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load a schema file, named after its file stem.
pub fn load_schema(path: &Path) -> Result<Schema, CliError> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("schema")
        .to_string();
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let document = read_json(path)?;
            let resources = sibling_documents(path);
            Ok(JsonSchema::compile_with_resources(name, document, &resources)?.into())
        }
        Some("xsd") => Ok(XsdSchema::parse_named(name, &read_text(path)?)?.into()),
        _ => Err(CliError::UnknownSchemaType(path.to_path_buf())),
    }
}

/// The `.json` files beside `path`, keyed by file name and stem. Files that
/// cannot be read or parsed are skipped.
fn sibling_documents(path: &Path) -> HashMap<String, Value> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let mut resources = HashMap::new();
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return resources;
    };
    for sibling in entries.flatten().map(|e| e.path()) {
        if sibling.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let parsed = std::fs::read_to_string(&sibling)
            .ok()
            .and_then(|text| serde_json::from_str::<Value>(&text).ok());
        let Some(document) = parsed else {
            tracing::debug!(path = %sibling.display(), "skipping unreadable sibling schema");
            continue;
        };
        if let Some(stem) = sibling.file_stem().and_then(|s| s.to_str()) {
            resources.insert(stem.to_string(), document.clone());
        }
        if let Some(file_name) = sibling.file_name().and_then(|s| s.to_str()) {
            resources.insert(file_name.to_string(), document);
        }
    }
    resources
}
