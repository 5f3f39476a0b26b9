//! # Renderer Factories
//!
//! A [`RendererFactory`] is configured once and produces a [`RenderFn`] for
//! each view that renders through it. A render function receives the
//! [`RenderInput`] and the [`System`] values of the current call, fills in
//! the response content type when the handler left it at the default, and
//! delegates to its serializer.
//!
//! [`RendererRegistry`] maps media types to factories in registration order,
//! which is also the order of preference when the client accepts several.

use std::fmt;
use std::sync::Arc;

use ramlson_core::{negotiate, ResponseHead, System, APPLICATION_JSON, APPLICATION_XML};
use serde_json::Value;

use crate::adapters::{DefaultEncoder, JsonAdapters};
use crate::error::RenderError;
use crate::input::RenderInput;
use crate::json::{validating_json_serializer, JsonOptions};
use crate::xml::{validating_xml_serializer, XmlOptions};

/// Describes the view a render function is created for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererInfo {
    /// View or route name, for diagnostics.
    pub name: String,
    /// Media type the renderer was selected for.
    pub media_type: &'static str,
}

impl RendererInfo {
    pub fn new(name: impl Into<String>, media_type: &'static str) -> Self {
        Self {
            name: name.into(),
            media_type,
        }
    }
}

/// Renders one value for one call.
pub type RenderFn =
    Box<dyn Fn(RenderInput, &mut System<'_>) -> Result<Vec<u8>, RenderError> + Send + Sync>;

/// Produces render functions for a media type.
pub trait RendererFactory: Send + Sync + fmt::Debug {
    /// Media type this factory renders, and assigns to unset responses.
    fn media_type(&self) -> &'static str;

    /// A render function for the described view.
    fn renderer(&self, info: &RendererInfo) -> RenderFn;
}

/// Set `media_type` on a response whose content type is still the default.
fn claim_content_type(head: &mut ResponseHead, media_type: &str, view: &str) {
    if head.is_default_content_type() {
        tracing::debug!(view, content_type = media_type, "assigning response content type");
        head.set_content_type(media_type);
    }
}

// ── XML ─────────────────────────────────────────────────────────────

/// Serializer used by [`ValidatingXmlRenderer`].
pub type XmlSerializer = fn(RenderInput, &XmlOptions) -> Result<Vec<u8>, RenderError>;

/// Renders `application/xml`, validating against XML Schemas.
#[derive(Clone)]
pub struct ValidatingXmlRenderer {
    serializer: XmlSerializer,
    options: XmlOptions,
}

impl ValidatingXmlRenderer {
    /// Renderer with a custom serializer; `options` are passed to every call.
    pub fn new(serializer: XmlSerializer, options: XmlOptions) -> Self {
        Self {
            serializer,
            options,
        }
    }

    /// Renderer using [`validating_xml_serializer`] with `options`.
    pub fn with_options(options: XmlOptions) -> Self {
        Self::new(validating_xml_serializer, options)
    }

    pub fn options(&self) -> &XmlOptions {
        &self.options
    }
}

impl Default for ValidatingXmlRenderer {
    fn default() -> Self {
        Self::with_options(XmlOptions::default())
    }
}

impl fmt::Debug for ValidatingXmlRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatingXmlRenderer")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RendererFactory for ValidatingXmlRenderer {
    fn media_type(&self) -> &'static str {
        APPLICATION_XML
    }

    fn renderer(&self, info: &RendererInfo) -> RenderFn {
        let serializer = self.serializer;
        let options = self.options.clone();
        let view = info.name.clone();
        Box::new(move |input: RenderInput, system: &mut System<'_>| {
            if let Some(request) = system.request.as_deref_mut() {
                claim_content_type(&mut request.response, APPLICATION_XML, &view);
            }
            serializer(input, &options)
        })
    }
}

// ── JSON ────────────────────────────────────────────────────────────

/// Serializer used by [`ValidatingJsonRenderer`].
pub type JsonSerializer =
    fn(RenderInput, &DefaultEncoder<'_>, &JsonOptions) -> Result<String, RenderError>;

/// Renders `application/json`, validating against JSON Schemas.
#[derive(Clone)]
pub struct ValidatingJsonRenderer {
    serializer: JsonSerializer,
    adapters: JsonAdapters,
    options: JsonOptions,
}

impl ValidatingJsonRenderer {
    /// Renderer resolving opaque objects with `adapters`.
    pub fn new(adapters: JsonAdapters, options: JsonOptions) -> Self {
        Self {
            serializer: validating_json_serializer,
            adapters,
            options,
        }
    }

    /// Replace the serializer.
    pub fn with_serializer(mut self, serializer: JsonSerializer) -> Self {
        self.serializer = serializer;
        self
    }

    /// Register a type adapter. Affects render functions created afterwards.
    pub fn add_adapter<T, F>(&mut self, adapter: F) -> &mut Self
    where
        T: std::any::Any,
        F: Fn(&T, Option<&ramlson_core::RequestContext>) -> Value + Send + Sync + 'static,
    {
        self.adapters.add::<T, F>(adapter);
        self
    }

    pub fn options(&self) -> &JsonOptions {
        &self.options
    }
}

impl Default for ValidatingJsonRenderer {
    fn default() -> Self {
        Self::new(JsonAdapters::new(), JsonOptions::default())
    }
}

impl fmt::Debug for ValidatingJsonRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatingJsonRenderer")
            .field("adapters", &self.adapters)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl RendererFactory for ValidatingJsonRenderer {
    fn media_type(&self) -> &'static str {
        APPLICATION_JSON
    }

    fn renderer(&self, info: &RendererInfo) -> RenderFn {
        let serializer = self.serializer;
        let adapters = self.adapters.clone();
        let options = self.options.clone();
        let view = info.name.clone();
        Box::new(move |input: RenderInput, system: &mut System<'_>| {
            if let Some(request) = system.request.as_deref_mut() {
                claim_content_type(&mut request.response, APPLICATION_JSON, &view);
            }
            let default = DefaultEncoder::new(&adapters, system.request());
            serializer(input, &default, &options).map(String::into_bytes)
        })
    }
}

// ── Registry ────────────────────────────────────────────────────────

/// Renderer factories keyed by media type, in order of preference.
#[derive(Debug, Clone, Default)]
pub struct RendererRegistry {
    factories: Vec<Arc<dyn RendererFactory>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// JSON then XML, both with default options.
    pub fn standard() -> Self {
        Self::new()
            .with(ValidatingJsonRenderer::default())
            .with(ValidatingXmlRenderer::default())
    }

    /// Register a factory. A factory for the same media type is replaced in
    /// place, keeping its position.
    pub fn register(&mut self, factory: impl RendererFactory + 'static) -> &mut Self {
        let factory: Arc<dyn RendererFactory> = Arc::new(factory);
        match self
            .factories
            .iter_mut()
            .find(|f| f.media_type() == factory.media_type())
        {
            Some(slot) => *slot = factory,
            None => self.factories.push(factory),
        }
        self
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, factory: impl RendererFactory + 'static) -> Self {
        self.register(factory);
        self
    }

    /// The factory for `media_type`, ignoring parameters and case.
    pub fn get(&self, media_type: &str) -> Option<Arc<dyn RendererFactory>> {
        let essence = media_type.split(';').next().unwrap_or(media_type).trim();
        self.factories
            .iter()
            .find(|f| f.media_type().eq_ignore_ascii_case(essence))
            .cloned()
    }

    /// Registered media types in order of preference.
    pub fn offered(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.media_type()).collect()
    }

    /// The factory best matching an `Accept` header.
    pub fn negotiate(&self, accept: Option<&str>) -> Option<Arc<dyn RendererFactory>> {
        let chosen = negotiate(accept, &self.offered())?;
        tracing::debug!(accept, chosen, "negotiated renderer");
        self.get(chosen)
    }

    /// Create a render function for `info.media_type` and call it once.
    ///
    /// # Errors
    ///
    /// `RenderError::NoRenderer` if nothing is registered for the media
    /// type, otherwise whatever the render function returns.
    pub fn render(
        &self,
        info: &RendererInfo,
        input: RenderInput,
        system: &mut System<'_>,
    ) -> Result<Vec<u8>, RenderError> {
        let factory = self
            .get(info.media_type)
            .ok_or_else(|| RenderError::NoRenderer(info.media_type.to_string()))?;
        factory.renderer(info)(input, system)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramlson_core::{Payload, RequestContext, TEXT_HTML};
    use ramlson_schema::{JsonSchema, Schema};
    use serde_json::json;

    fn info(media_type: &'static str) -> RendererInfo {
        RendererInfo::new("test_view", media_type)
    }

    // ── Content type ────────────────────────────────────────────────

    #[test]
    fn xml_renderer_sets_default_content_type() {
        let render = ValidatingXmlRenderer::default().renderer(&info(APPLICATION_XML));
        let mut request = RequestContext::new("GET", "/books/123");
        let body = render(json!({"id": 123}).into(), &mut System::with_request(&mut request)).unwrap();
        assert_eq!(request.response.content_type, APPLICATION_XML);
        assert!(String::from_utf8(body).unwrap().contains("<id type=\"int\">123</id>"));
    }

    #[test]
    fn json_renderer_sets_default_content_type() {
        let render = ValidatingJsonRenderer::default().renderer(&info(APPLICATION_JSON));
        let mut request = RequestContext::new("GET", "/books");
        let body = render(json!([1]).into(), &mut System::with_request(&mut request)).unwrap();
        assert_eq!(request.response.content_type, APPLICATION_JSON);
        assert_eq!(body, b"[1]");
    }

    #[test]
    fn explicit_content_type_is_kept() {
        let render = ValidatingJsonRenderer::default().renderer(&info(APPLICATION_JSON));
        let mut request = RequestContext::new("GET", "/books");
        request.response.set_content_type("application/hal+json");
        render(json!({}).into(), &mut System::with_request(&mut request)).unwrap();
        assert_eq!(request.response.content_type, "application/hal+json");
    }

    #[test]
    fn no_request_means_no_content_type_step() {
        let render = ValidatingXmlRenderer::default().renderer(&info(APPLICATION_XML));
        render(json!({}).into(), &mut System::detached()).unwrap();
    }

    #[test]
    fn content_type_is_set_even_when_validation_fails() {
        let schema: Schema = JsonSchema::compile(json!({"type": "string"})).unwrap().into();
        let render = ValidatingJsonRenderer::default().renderer(&info(APPLICATION_JSON));
        let mut request = RequestContext::new("GET", "/");
        let err = render(
            RenderInput::validated(json!(1), schema),
            &mut System::with_request(&mut request),
        )
        .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(request.response.content_type, APPLICATION_JSON);
        assert_ne!(request.response.content_type, TEXT_HTML);
    }

    // ── Configuration ───────────────────────────────────────────────

    #[test]
    fn json_adapters_use_the_current_request() {
        struct Here;
        let mut renderer = ValidatingJsonRenderer::new(JsonAdapters::new(), JsonOptions::default());
        renderer.add_adapter(|_: &Here, request| json!({"path": request.map(|r| r.path.clone())}));
        let render = renderer.renderer(&info(APPLICATION_JSON));

        let mut request = RequestContext::new("GET", "/here");
        let body = render(
            Payload::object(Here).into(),
            &mut System::with_request(&mut request),
        )
        .unwrap();
        assert_eq!(body, br#"{"path": "/here"}"#);

        let body = render(Payload::object(Here).into(), &mut System::detached()).unwrap();
        assert_eq!(body, br#"{"path": null}"#);
    }

    #[test]
    fn custom_serializers() {
        fn shout(_: RenderInput, _: &XmlOptions) -> Result<Vec<u8>, RenderError> {
            Ok(b"<LOUD/>".to_vec())
        }
        fn fixed(_: RenderInput, _: &DefaultEncoder<'_>, _: &JsonOptions) -> Result<String, RenderError> {
            Ok("fixed".to_string())
        }
        let xml = ValidatingXmlRenderer::new(shout, XmlOptions::default()).renderer(&info(APPLICATION_XML));
        assert_eq!(xml(json!(1).into(), &mut System::detached()).unwrap(), b"<LOUD/>");
        let json = ValidatingJsonRenderer::default()
            .with_serializer(fixed)
            .renderer(&info(APPLICATION_JSON));
        assert_eq!(json(json!(1).into(), &mut System::detached()).unwrap(), b"fixed");
    }

    // ── Registry ────────────────────────────────────────────────────

    #[test]
    fn standard_registry_prefers_json() {
        let registry = RendererRegistry::standard();
        assert_eq!(registry.offered(), vec![APPLICATION_JSON, APPLICATION_XML]);
        assert_eq!(registry.negotiate(None).unwrap().media_type(), APPLICATION_JSON);
        assert_eq!(
            registry.negotiate(Some("application/xml")).unwrap().media_type(),
            APPLICATION_XML
        );
        assert!(registry.negotiate(Some("text/csv")).is_none());
    }

    #[test]
    fn register_replaces_in_place() {
        let mut registry = RendererRegistry::standard();
        registry.register(ValidatingJsonRenderer::new(JsonAdapters::new(), JsonOptions::compact()));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.offered()[0], APPLICATION_JSON);
        let body = registry
            .render(&info(APPLICATION_JSON), json!({"a": 1}).into(), &mut System::detached())
            .unwrap();
        assert_eq!(body, br#"{"a":1}"#);
    }

    #[test]
    fn lookup_ignores_parameters() {
        let registry = RendererRegistry::standard();
        assert!(registry.get("Application/JSON; charset=utf-8").is_some());
        assert!(registry.get("text/plain").is_none());
    }

    #[test]
    fn missing_renderer() {
        let registry = RendererRegistry::new();
        assert!(registry.is_empty());
        let err = registry
            .render(&info(APPLICATION_XML), json!(1).into(), &mut System::detached())
            .unwrap_err();
        assert!(matches!(err, RenderError::NoRenderer(ref m) if m == APPLICATION_XML));
    }
}
