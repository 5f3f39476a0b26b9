//! # XML Trees
//!
//! A minimal element tree built with quick-xml. Serialized XML is parsed back
//! into an [`XmlElement`] before it is checked against an XML Schema; the
//! XSD subset validator also reads schema documents through it.
//!
//! Text and CDATA directly inside an element are concatenated into
//! [`XmlElement::text`]. Comments, processing instructions, the XML
//! declaration and doctype are skipped.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::SchemaError;

/// An element with its attributes, child elements and text content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written (`xs:element`, `title`).
    pub name: String,
    /// Attributes in document order, values unescaped.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
    /// Concatenated character data.
    pub text: String,
}

impl XmlElement {
    /// An empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Namespace prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Value of the attribute with exactly this name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements with the given local name.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.local_name() == local)
    }

    /// Parse a UTF-8 document.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Malformed` if the bytes are not UTF-8, not
    /// well-formed XML, hold characters XML 1.0 forbids, or do not contain
    /// exactly one root element.
    pub fn parse(bytes: &[u8]) -> Result<Self, SchemaError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| SchemaError::Malformed(format!("document is not UTF-8: {e}")))?;
        Self::parse_str(text)
    }

    /// Parse a document from a string.
    pub fn parse_str(input: &str) -> Result<Self, SchemaError> {
        check_chars(input)?;
        let mut reader = Reader::from_str(input);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            let event = reader.read_event().map_err(|e| {
                SchemaError::Malformed(format!("at byte {}: {e}", reader.buffer_position()))
            })?;
            match event {
                Event::Start(start) => stack.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| SchemaError::Malformed("unbalanced end tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape()
                        .map_err(|e| SchemaError::Malformed(e.to_string()))?;
                    push_text(&mut stack, &text)?;
                }
                Event::CData(cdata) => {
                    let bytes = cdata.into_inner();
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| SchemaError::Malformed(format!("CDATA is not UTF-8: {e}")))?;
                    push_text(&mut stack, text)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(SchemaError::Malformed(format!(
                "element '{}' is not closed",
                open.name
            )));
        }
        root.ok_or_else(|| SchemaError::Malformed("document has no root element".to_string()))
    }
}

/// Whether `c` matches the XML 1.0 `Char` production.
pub fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\u{9}' | '\u{A}' | '\u{D}' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Character references such as `&#1;` unescape to forbidden characters too,
/// so decoded text is checked as well as the raw input.
fn check_chars(text: &str) -> Result<(), SchemaError> {
    match text.chars().find(|&c| !is_xml_char(c)) {
        None => Ok(()),
        Some(c) => Err(SchemaError::Malformed(format!(
            "character U+{:04X} is not allowed in XML",
            u32::from(c)
        ))),
    }
}

/// Strip a namespace prefix from a qualified name.
pub(crate) fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, SchemaError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| SchemaError::Malformed(format!("element name is not UTF-8: {e}")))?
        .to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| SchemaError::Malformed(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| SchemaError::Malformed(format!("attribute name is not UTF-8: {e}")))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| SchemaError::Malformed(e.to_string()))?
            .into_owned();
        check_chars(&value)?;
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        ..XmlElement::default()
    })
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), SchemaError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(SchemaError::Malformed(format!(
            "second root element '{}'",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: &str) -> Result<(), SchemaError> {
    check_chars(text)?;
    match stack.last_mut() {
        Some(element) => {
            element.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(SchemaError::Malformed(
            "character data outside the root element".to_string(),
        )),
    }
}
