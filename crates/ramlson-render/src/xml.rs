//! # XML Serialization
//!
//! Converts structured data into XML with the generic dict-to-XML mapping,
//! then optionally validates the produced document against an XML Schema.
//!
//! ## Mapping
//!
//! | Data        | XML                                                        |
//! |-------------|------------------------------------------------------------|
//! | mapping     | one child element per key, in key order, `type="dict"`     |
//! | sequence    | `type="list"`, one child per item named by `item_name`     |
//! | string      | escaped text (or CDATA), `type="str"`                      |
//! | integer     | `type="int"`                                               |
//! | float       | `type="float"`                                             |
//! | boolean     | `true` / `false`, `type="bool"`                            |
//! | null        | empty element, `type="null"`                               |
//!
//! A top-level mapping becomes the children of the root element; any other
//! top-level value is wrapped in an element named `item_name("root")`.
//!
//! Keys that are not XML names are repaired: an all-digit key gets an `n`
//! prefix, spaces become underscores, and anything still invalid is written
//! as `<key name="original">`.
//!
//! Empty elements are always written as a start/end pair. Characters XML 1.0
//! cannot carry (most C0 controls, U+FFFE, U+FFFF) are a serialization
//! error.

use std::fmt;

use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use ramlson_core::{Payload, SerializationError};
use ramlson_schema::xml::is_xml_char;
use ramlson_schema::{Schema, SchemaKind, XmlElement};
use serde_json::{Map, Value};

use crate::error::RenderError;
use crate::input::RenderInput;

/// Names the elements of a sequence from the name of their parent.
pub type ItemNameFn = fn(&str) -> String;

/// Default sequence item name: `item`.
pub fn default_item_name(_parent: &str) -> String {
    "item".to_string()
}

/// Options for the dict-to-XML conversion.
#[derive(Clone)]
pub struct XmlOptions {
    /// Emit the XML declaration and wrap the output in a root element.
    pub root: bool,
    /// Name of the root element.
    pub custom_root: String,
    /// Emit `type` attributes.
    pub attr_type: bool,
    /// Wrap string values in CDATA sections instead of escaping them.
    pub cdata: bool,
    /// Names sequence items.
    pub item_name: ItemNameFn,
}

impl fmt::Debug for XmlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlOptions")
            .field("root", &self.root)
            .field("custom_root", &self.custom_root)
            .field("attr_type", &self.attr_type)
            .field("cdata", &self.cdata)
            .finish_non_exhaustive()
    }
}

impl Default for XmlOptions {
    fn default() -> Self {
        Self {
            root: true,
            custom_root: "root".to_string(),
            attr_type: true,
            cdata: false,
            item_name: default_item_name,
        }
    }
}

/// Serialize the input to XML and validate the result when the input
/// carries an XML Schema.
///
/// # Errors
///
/// - `RenderError::Serialization` for opaque objects, which XML cannot represent.
/// - `RenderError::SchemaMismatch` if the input carries a JSON Schema.
/// - `RenderError::SchemaValidation` if the document fails validation.
pub fn validating_xml_serializer(
    input: RenderInput,
    options: &XmlOptions,
) -> Result<Vec<u8>, RenderError> {
    let (data, schema) = input.into_parts();
    let value = match data {
        Payload::Value(value) => value,
        Payload::Object(obj) => {
            return Err(SerializationError::unsupported_type(obj.type_name(), "XML").into())
        }
    };

    let serialized = dict_to_xml(&value, options)?;

    match schema {
        None => {}
        Some(Schema::Xml(schema)) => {
            let tree = XmlElement::parse(&serialized)?;
            if let Err(err) = schema.assert_valid(&tree) {
                tracing::warn!(schema = schema.name(), error = %err, "XML output failed validation");
                return Err(err.into());
            }
        }
        Some(Schema::Json(_)) => {
            return Err(RenderError::SchemaMismatch {
                expected: SchemaKind::Xml,
                found: SchemaKind::Json,
            })
        }
    }
    Ok(serialized)
}

/// The declaration written ahead of the root element.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" ?>"#;

/// Convert a value to XML bytes without validation.
///
/// # Errors
///
/// Returns `SerializationError` if writing fails or a string holds a
/// character XML cannot represent.
pub fn dict_to_xml(value: &Value, options: &XmlOptions) -> Result<Vec<u8>, SerializationError> {
    let mut out = XmlOut {
        writer: Writer::new(Vec::new()),
        options,
    };

    if options.root {
        out.writer.get_mut().extend_from_slice(XML_DECLARATION.as_bytes());
        out.start(&options.custom_root, None, None)?;
        out.content(value, &options.custom_root)?;
        out.end(&options.custom_root)?;
    } else {
        out.content(value, "root")?;
    }
    Ok(out.writer.into_inner())
}

struct XmlOut<'o> {
    writer: Writer<Vec<u8>>,
    options: &'o XmlOptions,
}

impl XmlOut<'_> {
    fn event(&mut self, event: Event<'_>) -> Result<(), SerializationError> {
        self.writer
            .write_event(event)
            .map_err(|e| SerializationError::new(format!("XML write failed: {e}")))
    }

    fn start(
        &mut self,
        name: &str,
        type_attr: Option<&str>,
        name_attr: Option<&str>,
    ) -> Result<(), SerializationError> {
        let mut start = BytesStart::new(name);
        if let Some(original) = name_attr {
            check_chars(original)?;
            start.push_attribute(("name", original));
        }
        if let Some(ty) = type_attr.filter(|_| self.options.attr_type) {
            start.push_attribute(("type", ty));
        }
        self.event(Event::Start(start))
    }

    fn end(&mut self, name: &str) -> Result<(), SerializationError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text(&mut self, text: &str, is_string: bool) -> Result<(), SerializationError> {
        if text.is_empty() {
            return Ok(());
        }
        check_chars(text)?;
        if is_string && self.options.cdata {
            // `]]>` cannot appear inside a section; split it across two.
            let mut rest = text;
            while let Some(at) = rest.find("]]>") {
                self.event(Event::CData(BytesCData::new(&rest[..at + 2])))?;
                rest = &rest[at + 2..];
            }
            self.event(Event::CData(BytesCData::new(rest)))
        } else {
            self.event(Event::Text(BytesText::new(text)))
        }
    }

    /// Children of an element holding `value`.
    fn content(&mut self, value: &Value, parent: &str) -> Result<(), SerializationError> {
        match value {
            Value::Object(map) => self.mapping(map),
            Value::Array(items) => self.sequence(items, parent),
            scalar => {
                let name = (self.options.item_name)(parent);
                self.element(&name, None, scalar, parent)
            }
        }
    }

    fn mapping(&mut self, map: &Map<String, Value>) -> Result<(), SerializationError> {
        for (key, value) in map {
            let (name, original) = repair_key(key);
            self.element(&name, original.as_deref(), value, &name)?;
        }
        Ok(())
    }

    fn sequence(&mut self, items: &[Value], parent: &str) -> Result<(), SerializationError> {
        let name = (self.options.item_name)(parent);
        for item in items {
            self.element(&name, None, item, &name)?;
        }
        Ok(())
    }

    /// One element named `name` holding `value`. `parent` names the element
    /// for nested sequence items.
    fn element(
        &mut self,
        name: &str,
        original: Option<&str>,
        value: &Value,
        parent: &str,
    ) -> Result<(), SerializationError> {
        self.start(name, Some(type_name(value)), original)?;
        match value {
            Value::Object(map) => self.mapping(map)?,
            Value::Array(items) => self.sequence(items, parent)?,
            Value::String(s) => self.text(s, true)?,
            Value::Number(n) => self.text(&n.to_string(), false)?,
            Value::Bool(b) => self.text(if *b { "true" } else { "false" }, false)?,
            Value::Null => {}
        }
        self.end(name)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Object(_) => "dict",
        Value::Array(_) => "list",
        Value::String(_) => "str",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::Bool(_) => "bool",
        Value::Null => "null",
    }
}

/// An element name for `key`, plus the original key when it had to be
/// replaced by the generic `key` element.
fn repair_key(key: &str) -> (String, Option<String>) {
    if is_xml_name(key) {
        return (key.to_string(), None);
    }
    if !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()) {
        return (format!("n{key}"), None);
    }
    let underscored = key.replace(' ', "_");
    if is_xml_name(&underscored) {
        return (underscored, None);
    }
    ("key".to_string(), Some(key.to_string()))
}

/// Rejects text outside the XML 1.0 `Char` production.
fn check_chars(text: &str) -> Result<(), SerializationError> {
    match text.chars().find(|&c| !is_xml_char(c)) {
        None => Ok(()),
        Some(c) => Err(SerializationError::new(format!(
            "character U+{:04X} is not allowed in XML",
            u32::from(c)
        ))),
    }
}

/// Whether `name` is usable as an unprefixed element name.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramlson_schema::{JsonSchema, XsdSchema};
    use serde_json::json;

    const DECL: &str = XML_DECLARATION;

    fn render(value: Value) -> String {
        render_with(value, &XmlOptions::default())
    }

    fn render_with(value: Value, options: &XmlOptions) -> String {
        let bytes = validating_xml_serializer(RenderInput::plain(value), options).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    // ── Mapping rules ───────────────────────────────────────────────

    #[test]
    fn book_mapping() {
        let xml = render(json!({"id": 123, "title": "Dune", "author": "Frank Herbert"}));
        assert_eq!(
            xml,
            format!(
                "{DECL}<root><id type=\"int\">123</id><title type=\"str\">Dune</title>\
                 <author type=\"str\">Frank Herbert</author></root>"
            )
        );
    }

    #[test]
    fn nested_mapping_and_sequence() {
        let xml = render(json!({"book": {"tags": ["a", 1]}}));
        assert_eq!(
            xml,
            format!(
                "{DECL}<root><book type=\"dict\"><tags type=\"list\">\
                 <item type=\"str\">a</item><item type=\"int\">1</item>\
                 </tags></book></root>"
            )
        );
    }

    #[test]
    fn scalar_types() {
        let xml = render(json!({"f": 1.5, "t": true, "n": null}));
        assert!(xml.contains(r#"<f type="float">1.5</f>"#), "{xml}");
        assert!(xml.contains(r#"<t type="bool">true</t>"#), "{xml}");
        assert!(xml.contains(r#"<n type="null"></n>"#), "{xml}");
    }

    #[test]
    fn top_level_sequence_and_scalar() {
        let xml = render(json!([{"id": 1}, [2]]));
        assert_eq!(
            xml,
            format!(
                "{DECL}<root><item type=\"dict\"><id type=\"int\">1</id></item>\
                 <item type=\"list\"><item type=\"int\">2</item></item></root>"
            )
        );
        let xml = render(json!("solo"));
        assert_eq!(xml, format!("{DECL}<root><item type=\"str\">solo</item></root>"));
    }

    #[test]
    fn empty_containers_are_not_self_closed() {
        let xml = render(json!({"a": {}, "b": [], "c": ""}));
        assert!(xml.contains(r#"<a type="dict"></a>"#), "{xml}");
        assert!(xml.contains(r#"<b type="list"></b>"#), "{xml}");
        assert!(xml.contains(r#"<c type="str"></c>"#), "{xml}");
        assert!(!xml.contains("/>"), "{xml}");
    }

    #[test]
    fn key_order_is_insertion_order() {
        let xml = render(json!({"zeta": 1, "alpha": 2}));
        assert!(xml.find("<zeta").unwrap() < xml.find("<alpha").unwrap());
    }

    #[test]
    fn declaration_spelling() {
        let xml = render(json!({}));
        assert_eq!(xml, r#"<?xml version="1.0" encoding="UTF-8" ?><root></root>"#);
    }

    #[test]
    fn forbidden_characters_fail() {
        for value in [json!({"t": "a\u{1}b"}), json!({"t": "\u{FFFF}"}), json!({"a\u{1}b": 1})] {
            let err = validating_xml_serializer(RenderInput::plain(value.clone()), &XmlOptions::default())
                .unwrap_err();
            assert!(matches!(err, RenderError::Serialization(_)), "{value}: {err}");
        }
        let cdata = XmlOptions {
            cdata: true,
            ..XmlOptions::default()
        };
        assert!(validating_xml_serializer(RenderInput::plain(json!({"t": "\u{8}"})), &cdata).is_err());
        let xml = render(json!({"t": "tab\there\nline"}));
        assert!(xml.contains("tab\there\nline"), "{xml}");
    }

    #[test]
    fn text_is_escaped() {
        let xml = render(json!({"t": "a < b & \"c\""}));
        assert!(xml.contains("a &lt; b &amp;"), "{xml}");
        let tree = XmlElement::parse(xml.as_bytes()).unwrap();
        assert_eq!(tree.children[0].text, "a < b & \"c\"");
    }

    // ── Key repair ──────────────────────────────────────────────────

    #[test]
    fn invalid_keys_are_repaired() {
        let xml = render(json!({"123": 1, "first name": "x", "a/b": 2}));
        assert!(xml.contains(r#"<n123 type="int">1</n123>"#), "{xml}");
        assert!(xml.contains(r#"<first_name type="str">x</first_name>"#), "{xml}");
        assert!(xml.contains(r#"<key name="a/b" type="int">2</key>"#), "{xml}");
    }

    #[test]
    fn item_names_see_repaired_keys() {
        fn suffixed(parent: &str) -> String {
            format!("{parent}_item")
        }
        let options = XmlOptions {
            attr_type: false,
            item_name: suffixed,
            ..XmlOptions::default()
        };
        let xml = render_with(json!({"first name": [1], "a/b": [2]}), &options);
        assert!(
            xml.contains("<first_name><first_name_item>1</first_name_item></first_name>"),
            "{xml}"
        );
        assert!(xml.contains(r#"<key name="a/b"><key_item>2</key_item></key>"#), "{xml}");
    }

    #[test]
    fn xml_names() {
        assert!(is_xml_name("title"));
        assert!(is_xml_name("_x-1.2"));
        assert!(!is_xml_name("1a"));
        assert!(!is_xml_name(""));
        assert!(!is_xml_name("a b"));
        assert!(!is_xml_name("ns:a"));
    }

    // ── Options ─────────────────────────────────────────────────────

    #[test]
    fn custom_root_and_no_types() {
        let options = XmlOptions {
            custom_root: "book".to_string(),
            attr_type: false,
            ..XmlOptions::default()
        };
        let xml = render_with(json!({"id": 1, "tags": ["x"]}), &options);
        assert_eq!(
            xml,
            format!("{DECL}<book><id>1</id><tags><item>x</item></tags></book>")
        );
    }

    #[test]
    fn fragment_without_root() {
        let options = XmlOptions {
            root: false,
            ..XmlOptions::default()
        };
        let xml = render_with(json!({"a": 1, "b": 2}), &options);
        assert_eq!(xml, r#"<a type="int">1</a><b type="int">2</b>"#);
    }

    #[test]
    fn cdata_wraps_strings_only() {
        let options = XmlOptions {
            cdata: true,
            ..XmlOptions::default()
        };
        let xml = render_with(json!({"s": "<b>", "n": 5, "e": "x]]>y"}), &options);
        assert!(xml.contains("<s type=\"str\"><![CDATA[<b>]]></s>"), "{xml}");
        assert!(xml.contains("<n type=\"int\">5</n>"), "{xml}");
        let tree = XmlElement::parse(xml.as_bytes()).unwrap();
        assert_eq!(tree.children[2].text, "x]]>y");
    }

    #[test]
    fn custom_item_names() {
        fn singular(parent: &str) -> String {
            parent.strip_suffix('s').unwrap_or("item").to_string()
        }
        let options = XmlOptions {
            attr_type: false,
            item_name: singular,
            ..XmlOptions::default()
        };
        let xml = render_with(json!({"books": [1, 2]}), &options);
        assert!(xml.contains("<books><book>1</book><book>2</book></books>"), "{xml}");
    }

    // ── Validation ──────────────────────────────────────────────────

    const ID_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:complexType name="typedInt">
    <xs:simpleContent>
      <xs:extension base="xs:int"><xs:attribute name="type" type="xs:string"/></xs:extension>
    </xs:simpleContent>
  </xs:complexType>
  <xs:element name="root">
    <xs:complexType>
      <xs:sequence><xs:element name="id" type="typedInt"/></xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

    fn xsd() -> Schema {
        XsdSchema::parse_named("id", ID_XSD).unwrap().into()
    }

    #[test]
    fn valid_document_passes() {
        let input = RenderInput::validated(json!({"id": 7}), xsd());
        let bytes = validating_xml_serializer(input, &XmlOptions::default()).unwrap();
        assert!(String::from_utf8(bytes).unwrap().contains("<id type=\"int\">7</id>"));
    }

    #[test]
    fn validated_output_matches_plain_output() {
        let data = json!({"id": 7});
        for options in [
            XmlOptions::default(),
            XmlOptions {
                cdata: true,
                ..XmlOptions::default()
            },
        ] {
            let plain = validating_xml_serializer(RenderInput::plain(data.clone()), &options).unwrap();
            let validated = validating_xml_serializer(RenderInput::validated(data.clone(), xsd()), &options).unwrap();
            assert_eq!(validated, plain);
        }
    }

    #[test]
    fn forbidden_characters_fail_validated_render() {
        let book = XsdSchema::parse_named(
            "book",
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="root">
    <xs:complexType>
      <xs:sequence><xs:element name="title" type="xs:string"/></xs:sequence>
    </xs:complexType>
  </xs:element>
</xs:schema>"#,
        )
        .unwrap();
        let options = XmlOptions {
            attr_type: false,
            ..XmlOptions::default()
        };
        let input = RenderInput::validated(json!({"title": "a\u{1}b"}), book.into());
        let err = validating_xml_serializer(input, &options).unwrap_err();
        assert!(matches!(err, RenderError::Serialization(_)), "got: {err}");
    }

    #[test]
    fn invalid_document_fails() {
        let input = RenderInput::validated(json!({"id": "seven"}), xsd());
        let err = validating_xml_serializer(input, &XmlOptions::default()).unwrap_err();
        assert!(err.is_validation(), "got: {err}");
    }

    #[test]
    fn validation_is_skipped_for_plain_input() {
        validating_xml_serializer(RenderInput::plain(json!({"id": "seven"})), &XmlOptions::default())
            .unwrap();
    }

    #[test]
    fn json_schema_is_a_mismatch() {
        let schema: Schema = JsonSchema::compile(json!({})).unwrap().into();
        let err = validating_xml_serializer(
            RenderInput::validated(json!({}), schema),
            &XmlOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RenderError::SchemaMismatch {
                expected: SchemaKind::Xml,
                found: SchemaKind::Json
            }
        ));
    }

    #[test]
    fn opaque_objects_are_rejected() {
        struct Widget;
        let err = validating_xml_serializer(
            RenderInput::plain(Payload::object(Widget)),
            &XmlOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("is not XML serializable"), "{err}");
    }
}
