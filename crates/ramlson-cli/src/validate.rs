//! # Validate Subcommand
//!
//! `ramlson validate --schema FILE INPUT` checks a JSON document against a
//! JSON Schema, or an XML document against an XSD, and reports every
//! violation.

use std::path::PathBuf;

use clap::Args;
use ramlson_schema::{Schema, SchemaError, Violations, XmlElement};

use crate::error::CliError;
use crate::input::{load_schema, read_json, read_text};

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema to validate against (.json or .xsd).
    #[arg(long)]
    pub schema: PathBuf,

    /// Document to validate; `-` reads stdin.
    pub input: PathBuf,
}

/// Outcome of a validation run.
#[derive(Debug)]
pub struct Report {
    /// Name of the schema used.
    pub schema: String,
    /// Violations found; empty when the document is valid.
    pub violations: Violations,
}

impl Report {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Validate the input document.
///
/// A non-conforming document is a successful run with violations in the
/// report.
///
/// # Errors
///
/// `CliError` if the schema or document cannot be loaded or parsed.
pub fn run(args: &ValidateArgs) -> Result<Report, CliError> {
    let schema = load_schema(&args.schema)?;
    let result = match &schema {
        Schema::Json(json) => json.validate(&read_json(&args.input)?),
        Schema::Xml(xml) => xml.assert_valid(&XmlElement::parse_str(&read_text(&args.input)?)?),
    };
    let violations = match result {
        Ok(()) => Violations::default(),
        Err(SchemaError::Invalid { violations, .. }) => violations,
        Err(other) => return Err(other.into()),
    };
    Ok(Report {
        schema: schema.name().to_string(),
        violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const BOOK_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="book">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="title" type="xs:string"/>
        <xs:element name="year" type="xs:int"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn json_document_against_json_schema() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(
            dir.path(),
            "book.json",
            r#"{"type": "object", "required": ["title"]}"#,
        );
        let good = write(dir.path(), "good.json", r#"{"title": "Dune"}"#);
        let bad = write(dir.path(), "bad.json", r#"{}"#);

        let report = run(&ValidateArgs {
            schema: schema.clone(),
            input: good,
        })
        .unwrap();
        assert!(report.is_valid());
        assert_eq!(report.schema, "book");

        let report = run(&ValidateArgs { schema, input: bad }).unwrap();
        assert!(!report.is_valid());
        assert_eq!(report.violations.len(), 1);
    }

    #[test]
    fn xml_document_against_xsd() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "book.xsd", BOOK_XSD);
        let good = write(
            dir.path(),
            "good.xml",
            "<book><title>Dune</title><year>1965</year></book>",
        );
        let bad = write(
            dir.path(),
            "bad.xml",
            "<book><title>Dune</title><year>soon</year></book>",
        );

        assert!(run(&ValidateArgs {
            schema: schema.clone(),
            input: good,
        })
        .unwrap()
        .is_valid());
        let report = run(&ValidateArgs { schema, input: bad }).unwrap();
        assert_eq!(report.violations.violations()[0].instance_path, "/book/year");
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let schema = write(dir.path(), "book.xsd", BOOK_XSD);
        let input = write(dir.path(), "broken.xml", "<book><title>");
        let err = run(&ValidateArgs { schema, input }).unwrap_err();
        assert!(matches!(err, CliError::Schema(SchemaError::Malformed(_))));
    }
}
