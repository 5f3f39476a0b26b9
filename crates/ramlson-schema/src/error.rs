//! # Schema Errors
//!
//! A failed validation carries every violation found, each with the path of
//! the offending value in the instance, the path of the rule in the schema,
//! and a message. Load and compile failures name the schema involved.

use std::fmt;

use thiserror::Error;

/// Error during schema loading, compilation, or validation.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The instance did not conform to the schema.
    #[error("validation failed against schema '{schema}':\n{violations}")]
    Invalid {
        /// Name of the schema that was validated against.
        schema: String,
        /// Structured list of individual violations.
        violations: Violations,
    },

    /// The schema source could not be read or parsed.
    #[error("schema load error for '{name}': {reason}")]
    Load {
        /// Schema filename or identifier.
        name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// The schema was readable but is not a usable schema.
    #[error("schema compile error for '{name}': {reason}")]
    Compile {
        /// Schema filename or identifier.
        name: String,
        /// Reason the schema could not be compiled.
        reason: String,
    },

    /// An XML instance could not be parsed into a tree.
    #[error("malformed XML: {0}")]
    Malformed(String),

    /// IO error reading a schema file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SchemaError {
    /// The violations, if this is a validation failure.
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            SchemaError::Invalid { violations, .. } => Some(violations),
            _ => None,
        }
    }
}

/// A single validation violation with structured context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Path to the violating value in the instance (JSON Pointer or element path).
    pub instance_path: String,
    /// Path within the schema of the rule that failed.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations {
    violations: Vec<Violation>,
}

impl Violations {
    /// Wrap a list of violations.
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_display_format() {
        let v = Violation {
            instance_path: "/title".to_string(),
            schema_path: "/properties/title/type".to_string(),
            message: r#"42 is not of type "string""#.to_string(),
        };
        let display = v.to_string();
        assert!(display.contains("/title"));
        assert!(display.contains("is not of type"));
    }

    #[test]
    fn violation_display_root() {
        let v = Violation {
            instance_path: String::new(),
            schema_path: "/required".to_string(),
            message: r#""author" is a required property"#.to_string(),
        };
        assert!(v.to_string().contains("(root)"));
    }

    #[test]
    fn invalid_error_lists_every_violation() {
        let err = SchemaError::Invalid {
            schema: "book".to_string(),
            violations: Violations::new(vec![
                Violation {
                    instance_path: "/id".to_string(),
                    schema_path: "/properties/id/type".to_string(),
                    message: "first".to_string(),
                },
                Violation {
                    instance_path: "/title".to_string(),
                    schema_path: "/properties/title/type".to_string(),
                    message: "second".to_string(),
                },
            ]),
        };
        let text = err.to_string();
        assert!(text.starts_with("validation failed against schema 'book'"));
        assert!(text.contains("first"));
        assert!(text.contains("second"));
        assert_eq!(err.violations().unwrap().len(), 2);
    }

    #[test]
    fn non_validation_errors_have_no_violations() {
        let err = SchemaError::Malformed("unexpected end".to_string());
        assert!(err.violations().is_none());
    }
}
