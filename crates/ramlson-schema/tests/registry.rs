//! Integration test: load schema directories from disk, including the
//! schemas shipped with the API server.

use std::path::{Path, PathBuf};

use ramlson_schema::{SchemaError, SchemaKind, SchemaRegistry, XmlElement};
use serde_json::json;

/// Find the repository root.
fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

const AUTHOR_JSON: &str = r#"{
  "type": "object",
  "properties": {"name": {"type": "string"}},
  "required": ["name"]
}"#;

const BOOK_JSON: &str = r#"{
  "$schema": "http://json-schema.org/draft-04/schema#",
  "type": "object",
  "properties": {
    "id": {"type": "integer"},
    "author": {"$ref": "author.json"}
  },
  "required": ["id", "author"]
}"#;

const BOOK_XSD: &str = r#"<?xml version="1.0"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="root">
    <xs:complexType>
      <xs:sequence><xs:element name="id" type="xs:int"/></xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

// ── Loading ─────────────────────────────────────────────────────────

#[test]
fn loads_json_and_xsd_by_stem() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "author.json", AUTHOR_JSON);
    write(dir.path(), "book.json", BOOK_JSON);
    write(dir.path(), "book.xsd", BOOK_XSD);
    write(dir.path(), "README.md", "not a schema");

    let registry = SchemaRegistry::load(dir.path()).unwrap();
    assert_eq!(registry.names(), vec!["author", "book"]);
    assert_eq!(registry.len(), 3);

    let json = registry.schema_for("book", "application/json").unwrap();
    assert_eq!(json.kind(), SchemaKind::Json);
    let xml = registry.schema_for("book", "application/xml").unwrap();
    assert_eq!(xml.kind(), SchemaKind::Xml);
    assert!(registry.schema_for("author", "application/xml").is_none());
}

#[test]
fn cross_file_references_resolve() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "author.json", AUTHOR_JSON);
    write(dir.path(), "book.json", BOOK_JSON);

    let registry = SchemaRegistry::load(dir.path()).unwrap();
    let book = registry.json("book").unwrap();
    book.validate(&json!({"id": 1, "author": {"name": "Dan Simmons"}}))
        .unwrap();

    let err = book.validate(&json!({"id": 1, "author": {}})).unwrap_err();
    let violations = err.violations().unwrap();
    assert_eq!(violations.violations()[0].instance_path, "/author");
}

#[test]
fn xsd_from_directory_validates_trees() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "book.xsd", BOOK_XSD);

    let registry = SchemaRegistry::load(dir.path()).unwrap();
    let schema = registry.xml("book").unwrap();
    schema
        .assert_valid(&XmlElement::parse_str("<root><id>7</id></root>").unwrap())
        .unwrap();
    assert!(schema
        .assert_valid(&XmlElement::parse_str("<root><id>x</id></root>").unwrap())
        .is_err());
}

// ── Failures ────────────────────────────────────────────────────────

#[test]
fn missing_directory_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SchemaRegistry::load(dir.path().join("absent")).unwrap_err();
    assert!(matches!(err, SchemaError::Load { .. }), "got: {err}");
}

#[test]
fn invalid_json_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "broken.json", "{ not json");
    let err = SchemaRegistry::load(dir.path()).unwrap_err();
    assert!(
        matches!(err, SchemaError::Load { ref name, .. } if name == "broken.json"),
        "got: {err}"
    );
}

#[test]
fn dangling_reference_is_a_compile_error() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "book.json", BOOK_JSON);
    let err = SchemaRegistry::load(dir.path()).unwrap_err();
    assert!(matches!(err, SchemaError::Compile { .. }), "got: {err}");
}

#[test]
fn malformed_xsd_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "book.xsd", "<xs:schema");
    assert!(SchemaRegistry::load(dir.path()).is_err());
}

// ── Shipped schemas ─────────────────────────────────────────────────

#[test]
fn api_server_schemas_load() {
    let registry = SchemaRegistry::load(repo_root().join("crates/ramlson-api/schemas")).unwrap();
    assert!(registry.json("book").is_some());
    assert!(registry.xml("book").is_some());
}
