//! # Render Subcommand
//!
//! `ramlson render [--format json|xml] [--schema FILE] INPUT` renders a JSON
//! document through the same validating serializers the API server uses.
//! With `--schema`, the output is only produced if it validates.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use ramlson_core::{System, APPLICATION_JSON, APPLICATION_XML};
use ramlson_render::{
    JsonAdapters, JsonOptions, RendererInfo, RendererRegistry, RendererState,
    ValidatingJsonRenderer, ValidatingXmlRenderer, XmlOptions,
};

use crate::error::CliError;
use crate::input::{load_schema, read_json};

/// Output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Json,
    Xml,
}

impl Format {
    fn media_type(self) -> &'static str {
        match self {
            Format::Json => APPLICATION_JSON,
            Format::Xml => APPLICATION_XML,
        }
    }
}

/// Arguments for the render subcommand.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// JSON document to render; `-` reads stdin.
    pub input: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = Format::Json)]
    pub format: Format,

    /// Schema (.json or .xsd) the output must satisfy.
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Indent JSON output by two spaces.
    #[arg(long, conflicts_with = "compact")]
    pub pretty: bool,

    /// Write JSON without whitespace and with raw UTF-8.
    #[arg(long)]
    pub compact: bool,

    /// Sort JSON object keys.
    #[arg(long)]
    pub sort_keys: bool,

    /// Omit the XML declaration and root element.
    #[arg(long)]
    pub no_root: bool,

    /// Name of the XML root element.
    #[arg(long, default_value = "root")]
    pub root: String,

    /// Omit XML `type` attributes.
    #[arg(long)]
    pub no_attr_type: bool,

    /// Wrap XML string values in CDATA sections.
    #[arg(long)]
    pub cdata: bool,
}

impl RenderArgs {
    fn json_options(&self) -> JsonOptions {
        let mut options = if self.pretty {
            JsonOptions::pretty(2)
        } else if self.compact {
            JsonOptions::compact()
        } else {
            JsonOptions::default()
        };
        options.sort_keys = self.sort_keys;
        options
    }

    fn xml_options(&self) -> XmlOptions {
        XmlOptions {
            root: !self.no_root,
            custom_root: self.root.clone(),
            attr_type: !self.no_attr_type,
            cdata: self.cdata,
            ..XmlOptions::default()
        }
    }

    fn renderers(&self) -> RendererRegistry {
        RendererRegistry::new()
            .with(ValidatingJsonRenderer::new(JsonAdapters::new(), self.json_options()))
            .with(ValidatingXmlRenderer::with_options(self.xml_options()))
    }
}

/// Render the input document.
///
/// # Errors
///
/// `CliError` if the input or schema cannot be loaded, or rendering fails,
/// including when the output does not satisfy the schema.
pub fn run(args: &RenderArgs) -> Result<Vec<u8>, CliError> {
    let data = read_json(&args.input)?;
    let schema = args.schema.as_deref().map(load_schema).transpose()?;
    let input = RendererState {
        schema,
        data: data.into(),
        validate: true,
    };
    let info = RendererInfo::new(args.input.display().to_string(), args.format.media_type());
    tracing::debug!(input = %args.input.display(), media_type = info.media_type, "rendering");
    Ok(args
        .renderers()
        .render(&info, input.into(), &mut System::detached())?)
}
