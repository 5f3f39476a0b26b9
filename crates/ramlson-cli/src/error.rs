//! # CLI Errors

use std::path::PathBuf;

use ramlson_render::RenderError;
use ramlson_schema::SchemaError;
use thiserror::Error;

/// Failure of a CLI command.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{path} is not valid JSON: {reason}")]
    Json { path: PathBuf, reason: String },

    #[error("cannot tell the schema type of {0}; expected a .json or .xsd file")]
    UnknownSchemaType(PathBuf),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Render(#[from] RenderError),
}
