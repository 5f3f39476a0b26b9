//! # Server Configuration
//!
//! [`AppConfig`] is read from an optional YAML file and then overlaid with
//! environment variables:
//!
//! | Variable             | Field                | Default  |
//! |----------------------|----------------------|----------|
//! | `CONFIG_PATH`        | YAML file to start from | none  |
//! | `PORT`               | `port`               | `8080`   |
//! | `SCHEMA_DIR`         | `schema_dir`         | none     |
//! | `VALIDATE_RESPONSES` | `validate_responses` | `true`   |
//! | `VALIDATE_REQUESTS`  | `validate_requests`  | `true`   |
//!
//! Every YAML key is optional; missing keys take their default.

use std::path::{Path, PathBuf};

use ramlson_render::{default_item_name, JsonOptions, XmlOptions};
use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory of `*.json` and `*.xsd` schemas. `None` serves without schemas.
    pub schema_dir: Option<PathBuf>,
    /// Validate rendered responses against their declared schema.
    pub validate_responses: bool,
    /// Validate JSON request bodies against their declared schema.
    pub validate_requests: bool,
    /// Layout of JSON responses.
    pub json: JsonSettings,
    /// Shape of XML responses.
    pub xml: XmlSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            schema_dir: None,
            validate_responses: true,
            validate_requests: true,
            json: JsonSettings::default(),
            xml: XmlSettings::default(),
        }
    }
}

/// JSON layout settings. The defaults give `{"id": 123, "title": "Dune"}`
/// with non-ASCII escaped; unset separators follow the indent mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsonSettings {
    pub indent: Option<usize>,
    pub item_separator: Option<String>,
    pub key_separator: Option<String>,
    pub sort_keys: bool,
    pub ensure_ascii: bool,
}

impl Default for JsonSettings {
    fn default() -> Self {
        Self {
            indent: None,
            item_separator: None,
            key_separator: None,
            sort_keys: false,
            ensure_ascii: true,
        }
    }
}

impl JsonSettings {
    /// Renderer options for these settings.
    pub fn options(&self) -> JsonOptions {
        let mut options = JsonOptions {
            indent: self.indent,
            sort_keys: self.sort_keys,
            ensure_ascii: self.ensure_ascii,
            ..JsonOptions::default()
        };
        if self.item_separator.is_some() || self.key_separator.is_some() {
            let (item, key) = options.effective_separators();
            let separators = (
                self.item_separator.clone().unwrap_or_else(|| item.to_string()),
                self.key_separator.clone().unwrap_or_else(|| key.to_string()),
            );
            options.separators = Some(separators);
        }
        options
    }
}

/// XML conversion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XmlSettings {
    pub root: bool,
    pub custom_root: String,
    pub attr_type: bool,
    pub cdata: bool,
}

impl Default for XmlSettings {
    fn default() -> Self {
        let defaults = XmlOptions::default();
        Self {
            root: defaults.root,
            custom_root: defaults.custom_root,
            attr_type: defaults.attr_type,
            cdata: defaults.cdata,
        }
    }
}

impl XmlSettings {
    /// Renderer options for these settings.
    pub fn options(&self) -> XmlOptions {
        XmlOptions {
            root: self.root,
            custom_root: self.custom_root.clone(),
            attr_type: self.attr_type,
            cdata: self.cdata,
            item_name: default_item_name,
        }
    }
}

impl AppConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(source: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(source).map_err(|e| ConfigError::Yaml {
            path: None,
            reason: e.to_string(),
        })
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_yaml::from_str(&source).map_err(|e| ConfigError::Yaml {
            path: Some(path.to_path_buf()),
            reason: e.to_string(),
        })
    }

    /// Load configuration from the process environment.
    ///
    /// Starts from the file named by `CONFIG_PATH` (or the defaults) and
    /// applies the variable overrides listed in the module docs.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |name: &str| std::env::var(name).ok();
        let base = match lookup("CONFIG_PATH") {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        base.with_overrides(lookup)
    }

    /// Apply environment-style overrides read through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup("PORT") {
            self.port = raw.trim().parse().map_err(|_| invalid("PORT", &raw))?;
        }
        if let Some(raw) = lookup("SCHEMA_DIR") {
            self.schema_dir = (!raw.trim().is_empty()).then(|| PathBuf::from(raw.trim()));
        }
        if let Some(raw) = lookup("VALIDATE_RESPONSES") {
            self.validate_responses =
                parse_flag(&raw).ok_or_else(|| invalid("VALIDATE_RESPONSES", &raw))?;
        }
        if let Some(raw) = lookup("VALIDATE_REQUESTS") {
            self.validate_requests =
                parse_flag(&raw).ok_or_else(|| invalid("VALIDATE_REQUESTS", &raw))?;
        }
        Ok(self)
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}

fn invalid(var: &str, value: &str) -> ConfigError {
    ConfigError::InvalidVar(var.to_string(), value.to_string())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {reason}")]
    Io { path: PathBuf, reason: String },
    #[error("invalid YAML config{}: {reason}", display_path(.path))]
    Yaml {
        path: Option<PathBuf>,
        reason: String,
    },
    #[error("invalid value for {0}: {1:?}")]
    InvalidVar(String, String),
    #[error(transparent)]
    Schema(#[from] ramlson_schema::SchemaError),
}
