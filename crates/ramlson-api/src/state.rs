//! # Application State
//!
//! Shared state for the Axum application, handed to every dispatched
//! request. Cloning is cheap: the schema and renderer registries are
//! read-only after startup and shared behind `Arc`, and the book repository
//! is itself a shared handle.

use std::sync::Arc;

use ramlson_render::{JsonAdapters, RendererRegistry, ValidatingJsonRenderer, ValidatingXmlRenderer};
use ramlson_schema::SchemaRegistry;

use crate::config::{AppConfig, ConfigError};
use crate::resources::books::BookRepository;

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub schemas: Arc<SchemaRegistry>,
    pub renderers: Arc<RendererRegistry>,
    pub books: BookRepository,
}

impl AppState {
    /// Default configuration, no schemas, and the stock books.
    pub fn new() -> Self {
        let config = AppConfig::default();
        Self {
            renderers: Arc::new(renderers_for(&config)),
            schemas: Arc::new(SchemaRegistry::new()),
            books: BookRepository::seeded(),
            config,
        }
    }

    /// State for `config`, loading schemas from `config.schema_dir`.
    ///
    /// # Errors
    ///
    /// `ConfigError::Schema` if the schema directory cannot be loaded.
    pub fn with_config(config: AppConfig) -> Result<Self, ConfigError> {
        let schemas = match &config.schema_dir {
            Some(dir) => SchemaRegistry::load(dir)?,
            None => {
                tracing::warn!("no schema directory configured; responses are not validated");
                SchemaRegistry::new()
            }
        };
        Ok(Self {
            renderers: Arc::new(renderers_for(&config)),
            schemas: Arc::new(schemas),
            books: BookRepository::seeded(),
            config,
        })
    }

    /// Replace the schema registry.
    pub fn with_schemas(mut self, schemas: SchemaRegistry) -> Self {
        self.schemas = Arc::new(schemas);
        self
    }

    /// Replace the renderer registry.
    pub fn with_renderers(mut self, renderers: RendererRegistry) -> Self {
        self.renderers = Arc::new(renderers);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON then XML, shaped by the configured settings.
fn renderers_for(config: &AppConfig) -> RendererRegistry {
    RendererRegistry::new()
        .with(ValidatingJsonRenderer::new(JsonAdapters::new(), config.json.options()))
        .with(ValidatingXmlRenderer::with_options(config.xml.options()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramlson_core::{APPLICATION_JSON, APPLICATION_XML};

    #[test]
    fn new_state_offers_json_then_xml() {
        let state = AppState::new();
        assert_eq!(state.renderers.offered(), [APPLICATION_JSON, APPLICATION_XML]);
        assert!(state.schemas.is_empty());
        assert_eq!(state.books.len(), 2);
    }

    #[test]
    fn config_shapes_renderers() {
        let mut config = AppConfig::default();
        config.json.indent = Some(4);
        let state = AppState::with_config(config).unwrap();
        assert_eq!(state.config.json.indent, Some(4));
        assert_eq!(state.renderers.len(), 2);
    }

    #[test]
    fn missing_schema_dir_fails() {
        let config = AppConfig {
            schema_dir: Some("/nonexistent/ramlson/schemas".into()),
            ..AppConfig::default()
        };
        assert!(matches!(
            AppState::with_config(config),
            Err(ConfigError::Schema(_))
        ));
    }

    #[test]
    fn clones_share_books() {
        let state = AppState::new();
        let other = state.clone();
        other.books.remove(123);
        assert!(state.books.get(123).is_none());
    }
}
