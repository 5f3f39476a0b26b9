//! # XML Schema Validation
//!
//! [`XmlSchema`] is the seam between the XML renderer and whatever checks a
//! serialized document: implementors take a parsed [`XmlElement`] tree and
//! fail on non-conformance. [`XsdSchema`] is the built-in implementation for
//! a practical subset of XSD 1.0:
//!
//! - global `element`s, named `complexType`s and `simpleType`s, element `ref`s
//! - `sequence`, `choice` (nestable) and `all` content models with
//!   `minOccurs` / `maxOccurs` (including `unbounded`)
//! - `attribute` (with `use="required"`), `anyAttribute`, `mixed` content
//! - `simpleContent` / `extension`, for text elements that carry attributes
//! - `simpleType` / `restriction` with the `enumeration`, `pattern`,
//!   `length`, `minLength`, `maxLength`, `minInclusive`, `maxInclusive`,
//!   `minExclusive` and `maxExclusive` facets
//! - the common built-in datatypes (strings, the integer family, `decimal`,
//!   `float`, `double`, `boolean`, `date`, `dateTime`, `anyType`)
//!
//! Instance elements are matched by local name; namespaces are not checked.
//! Content models are matched greedily without backtracking.

use std::collections::HashMap;
use std::fmt;

use regex::Regex;

use crate::error::{SchemaError, Violation, Violations};
use crate::xml::{local_part, XmlElement};

/// Namespace of XML Schema built-in types.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Upper bound on nested named-type resolution.
const MAX_TYPE_DEPTH: usize = 32;

/// Something that can assert an XML tree conforms to a schema.
pub trait XmlSchema: Send + Sync + fmt::Debug {
    /// Name used in error messages.
    fn name(&self) -> &str;

    /// Fail with `SchemaError::Invalid` if `tree` does not conform.
    fn assert_valid(&self, tree: &XmlElement) -> Result<(), SchemaError>;
}

// ── Built-in datatypes ──────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    String,
    NormalizedString,
    Token,
    AnyUri,
    Integer,
    Int,
    Long,
    Short,
    Byte,
    NonNegativeInteger,
    PositiveInteger,
    NegativeInteger,
    NonPositiveInteger,
    UnsignedLong,
    UnsignedInt,
    UnsignedShort,
    UnsignedByte,
    Decimal,
    Float,
    Double,
    Boolean,
    Date,
    DateTime,
    AnySimpleType,
}

impl Builtin {
    fn from_local_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => Self::String,
            "normalizedString" => Self::NormalizedString,
            "token" => Self::Token,
            "anyURI" => Self::AnyUri,
            "integer" => Self::Integer,
            "int" => Self::Int,
            "long" => Self::Long,
            "short" => Self::Short,
            "byte" => Self::Byte,
            "nonNegativeInteger" => Self::NonNegativeInteger,
            "positiveInteger" => Self::PositiveInteger,
            "negativeInteger" => Self::NegativeInteger,
            "nonPositiveInteger" => Self::NonPositiveInteger,
            "unsignedLong" => Self::UnsignedLong,
            "unsignedInt" => Self::UnsignedInt,
            "unsignedShort" => Self::UnsignedShort,
            "unsignedByte" => Self::UnsignedByte,
            "decimal" => Self::Decimal,
            "float" => Self::Float,
            "double" => Self::Double,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "dateTime" => Self::DateTime,
            "anySimpleType" => Self::AnySimpleType,
            _ => return None,
        })
    }

    /// `string` keeps whitespace; every other type collapses it.
    fn preserves_whitespace(self) -> bool {
        matches!(self, Self::String | Self::AnySimpleType)
    }

    fn integer_bounds(self) -> Option<(i128, i128)> {
        Some(match self {
            Self::Integer => (i128::MIN, i128::MAX),
            Self::Int => (i32::MIN.into(), i32::MAX.into()),
            Self::Long => (i64::MIN.into(), i64::MAX.into()),
            Self::Short => (i16::MIN.into(), i16::MAX.into()),
            Self::Byte => (i8::MIN.into(), i8::MAX.into()),
            Self::NonNegativeInteger => (0, i128::MAX),
            Self::PositiveInteger => (1, i128::MAX),
            Self::NegativeInteger => (i128::MIN, -1),
            Self::NonPositiveInteger => (i128::MIN, 0),
            Self::UnsignedLong => (0, u64::MAX.into()),
            Self::UnsignedInt => (0, u32::MAX.into()),
            Self::UnsignedShort => (0, u16::MAX.into()),
            Self::UnsignedByte => (0, u8::MAX.into()),
            _ => return None,
        })
    }

    fn check(self, value: &str) -> Result<(), String> {
        if let Some((min, max)) = self.integer_bounds() {
            let n: i128 = value
                .parse()
                .map_err(|_| format!("'{value}' is not a valid {self}"))?;
            if n < min || n > max {
                return Err(format!("'{value}' is out of range for {self}"));
            }
            return Ok(());
        }

        let ok = match self {
            Self::Decimal => is_decimal(value),
            Self::Float | Self::Double => {
                matches!(value, "INF" | "+INF" | "-INF" | "NaN")
                    || (!value.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E')
                        && value.parse::<f64>().is_ok())
            }
            Self::Boolean => matches!(value, "true" | "false" | "1" | "0"),
            Self::Date => is_date(value),
            Self::DateTime => is_date_time(value),
            _ => true,
        };
        if ok {
            Ok(())
        } else {
            Err(format!("'{value}' is not a valid {self}"))
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::String => "string",
            Self::NormalizedString => "normalizedString",
            Self::Token => "token",
            Self::AnyUri => "anyURI",
            Self::Integer => "integer",
            Self::Int => "int",
            Self::Long => "long",
            Self::Short => "short",
            Self::Byte => "byte",
            Self::NonNegativeInteger => "nonNegativeInteger",
            Self::PositiveInteger => "positiveInteger",
            Self::NegativeInteger => "negativeInteger",
            Self::NonPositiveInteger => "nonPositiveInteger",
            Self::UnsignedLong => "unsignedLong",
            Self::UnsignedInt => "unsignedInt",
            Self::UnsignedShort => "unsignedShort",
            Self::UnsignedByte => "unsignedByte",
            Self::Decimal => "decimal",
            Self::Float => "float",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::DateTime => "dateTime",
            Self::AnySimpleType => "anySimpleType",
        };
        write!(f, "xs:{name}")
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal(value: &str) -> bool {
    let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value);
    match unsigned.split_once('.') {
        Some((int, frac)) => {
            (int.is_empty() || is_digits(int))
                && (frac.is_empty() || is_digits(frac))
                && !(int.is_empty() && frac.is_empty())
        }
        None => is_digits(unsigned),
    }
}

/// Two digits in `min..=max`.
fn two_digits_in(s: &str, min: u8, max: u8) -> bool {
    s.len() == 2 && is_digits(s) && s.parse::<u8>().is_ok_and(|n| (min..=max).contains(&n))
}

/// `Z`, `+hh:mm`, `-hh:mm`, or nothing.
fn is_timezone(tz: &str) -> bool {
    if tz.is_empty() || tz == "Z" {
        return true;
    }
    match tz.strip_prefix(['+', '-']).and_then(|rest| rest.split_once(':')) {
        Some((h, m)) => two_digits_in(h, 0, 14) && two_digits_in(m, 0, 59),
        None => false,
    }
}

/// Split a trailing timezone designator off a date or time.
fn split_timezone(value: &str) -> (&str, &str) {
    if let Some(stripped) = value.strip_suffix('Z') {
        return (stripped, "Z");
    }
    if value.len() > 6 {
        let at = value.len() - 6;
        if value.is_char_boundary(at) && value[at..].starts_with(['+', '-']) && value[at..].contains(':') {
            return value.split_at(at);
        }
    }
    (value, "")
}

fn is_date_part(value: &str) -> bool {
    let unsigned = value.strip_prefix('-').unwrap_or(value);
    let mut parts = unsigned.splitn(3, '-');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(year), Some(month), Some(day)) => {
            year.len() >= 4 && is_digits(year) && two_digits_in(month, 1, 12) && two_digits_in(day, 1, 31)
        }
        _ => false,
    }
}

fn is_time_part(value: &str) -> bool {
    let (hms, fraction) = match value.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (value, None),
    };
    let mut parts = hms.splitn(3, ':');
    let clock = match (parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(m), Some(s)) => {
            two_digits_in(h, 0, 24) && two_digits_in(m, 0, 59) && two_digits_in(s, 0, 59)
        }
        _ => false,
    };
    clock && fraction.map_or(true, is_digits)
}

fn is_date(value: &str) -> bool {
    let (date, tz) = split_timezone(value);
    is_date_part(date) && is_timezone(tz)
}

fn is_date_time(value: &str) -> bool {
    let (stamp, tz) = split_timezone(value);
    match stamp.split_once('T') {
        Some((date, time)) => is_date_part(date) && is_time_part(time) && is_timezone(tz),
        None => false,
    }
}

// ── Schema components ───────────────────────────────────────────────

#[derive(Debug, Clone)]
enum TypeRef {
    Builtin(Builtin),
    Named(String),
    Inline(Box<TypeDef>),
    Any,
}

#[derive(Debug, Clone)]
enum TypeDef {
    Simple(SimpleType),
    Complex(ComplexType),
}

#[derive(Debug, Clone)]
enum SimpleBase {
    Builtin(Builtin),
    Named(String),
}

#[derive(Debug, Clone, Default)]
struct Facets {
    enumeration: Vec<String>,
    patterns: Vec<Regex>,
    length: Option<usize>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    min_inclusive: Option<f64>,
    max_inclusive: Option<f64>,
    min_exclusive: Option<f64>,
    max_exclusive: Option<f64>,
}

impl Facets {
    fn has_numeric_bounds(&self) -> bool {
        self.min_inclusive.is_some()
            || self.max_inclusive.is_some()
            || self.min_exclusive.is_some()
            || self.max_exclusive.is_some()
    }

    fn check(&self, value: &str) -> Result<(), String> {
        if !self.enumeration.is_empty() && !self.enumeration.iter().any(|e| e == value) {
            return Err(format!(
                "'{value}' is not one of [{}]",
                self.enumeration.join(", ")
            ));
        }
        for pattern in &self.patterns {
            if !pattern.is_match(value) {
                return Err(format!("'{value}' does not match pattern {}", pattern.as_str()));
            }
        }

        let len = value.chars().count();
        if let Some(n) = self.length {
            if len != n {
                return Err(format!("'{value}' must be exactly {n} characters"));
            }
        }
        if let Some(n) = self.min_length {
            if len < n {
                return Err(format!("'{value}' is shorter than {n} characters"));
            }
        }
        if let Some(n) = self.max_length {
            if len > n {
                return Err(format!("'{value}' is longer than {n} characters"));
            }
        }

        if self.has_numeric_bounds() {
            let n: f64 = value
                .parse()
                .map_err(|_| format!("'{value}' is not numeric"))?;
            if self.min_inclusive.is_some_and(|min| n < min)
                || self.max_inclusive.is_some_and(|max| n > max)
                || self.min_exclusive.is_some_and(|min| n <= min)
                || self.max_exclusive.is_some_and(|max| n >= max)
            {
                return Err(format!("'{value}' is out of the allowed range"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct SimpleType {
    base: SimpleBase,
    facets: Facets,
}

#[derive(Debug, Clone)]
struct AttributeDecl {
    name: String,
    ty: TypeRef,
    required: bool,
}

#[derive(Debug, Clone)]
struct ElementDecl {
    name: String,
    ty: TypeRef,
}

#[derive(Debug, Clone, Copy)]
struct Occurs {
    min: u32,
    /// `None` is `unbounded`.
    max: Option<u32>,
}

impl Occurs {
    fn allows_more(self, count: u32) -> bool {
        self.max.map_or(true, |max| count < max)
    }
}

#[derive(Debug, Clone)]
enum Particle {
    Element(ElementDecl, Occurs),
    /// Reference to a global element.
    Ref(String, Occurs),
    Sequence(Vec<Particle>, Occurs),
    Choice(Vec<Particle>, Occurs),
}

#[derive(Debug, Clone)]
enum Content {
    Empty,
    Particle(Particle),
    All(Vec<(ElementDecl, Occurs)>),
    Simple(TypeRef),
}

#[derive(Debug, Clone)]
struct ComplexType {
    content: Content,
    attributes: Vec<AttributeDecl>,
    any_attribute: bool,
    mixed: bool,
}

// ── Schema parsing ──────────────────────────────────────────────────

/// A compiled XSD subset schema.
pub struct XsdSchema {
    name: String,
    elements: HashMap<String, ElementDecl>,
    types: HashMap<String, TypeDef>,
}

impl XsdSchema {
    /// Parse an anonymous schema document.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError::Malformed` if the document is not XML and
    /// `SchemaError::Compile` if it uses constructs outside the supported
    /// subset or refers to undefined types or elements.
    pub fn parse(source: &str) -> Result<Self, SchemaError> {
        Self::parse_named("<inline>", source)
    }

    /// Parse a named schema document.
    pub fn parse_named(name: impl Into<String>, source: &str) -> Result<Self, SchemaError> {
        let name = name.into();
        let tree = XmlElement::parse_str(source)?;
        let compiler = Compiler::new(&name, &tree)?;
        let mut schema = Self {
            name: name.clone(),
            elements: HashMap::new(),
            types: HashMap::new(),
        };

        for child in &tree.children {
            match child.local_name() {
                "element" => {
                    let decl = compiler.element_decl(child)?;
                    schema.elements.insert(decl.name.clone(), decl);
                }
                "complexType" => {
                    let type_name = compiler.required_attr(child, "name")?;
                    let ct = compiler.complex_type(child)?;
                    schema.types.insert(type_name.to_string(), TypeDef::Complex(ct));
                }
                "simpleType" => {
                    let type_name = compiler.required_attr(child, "name")?;
                    let st = compiler.simple_type(child)?;
                    schema.types.insert(type_name.to_string(), TypeDef::Simple(st));
                }
                "annotation" | "import" | "include" => {}
                other => return Err(compiler.unsupported(other)),
            }
        }

        schema.check_references()?;
        tracing::debug!(
            schema = %schema.name,
            elements = schema.elements.len(),
            types = schema.types.len(),
            "compiled XML schema"
        );
        Ok(schema)
    }

    /// Names of the global elements, sorted.
    pub fn element_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.elements.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn compile_error(&self, reason: String) -> SchemaError {
        SchemaError::Compile {
            name: self.name.clone(),
            reason,
        }
    }

    fn check_references(&self) -> Result<(), SchemaError> {
        for decl in self.elements.values() {
            self.check_type_ref(&decl.ty)?;
        }
        for def in self.types.values() {
            self.check_type_def(def)?;
        }
        Ok(())
    }

    fn check_type_ref(&self, ty: &TypeRef) -> Result<(), SchemaError> {
        match ty {
            TypeRef::Named(name) if !self.types.contains_key(name) => {
                Err(self.compile_error(format!("undefined type '{name}'")))
            }
            TypeRef::Inline(def) => self.check_type_def(def),
            _ => Ok(()),
        }
    }

    fn check_type_def(&self, def: &TypeDef) -> Result<(), SchemaError> {
        match def {
            TypeDef::Simple(st) => match &st.base {
                SimpleBase::Named(name) => match self.types.get(name) {
                    Some(TypeDef::Simple(_)) => Ok(()),
                    Some(TypeDef::Complex(_)) => Err(self.compile_error(format!(
                        "simple type restricts complex type '{name}'"
                    ))),
                    None => Err(self.compile_error(format!("undefined type '{name}'"))),
                },
                SimpleBase::Builtin(_) => Ok(()),
            },
            TypeDef::Complex(ct) => {
                for attr in &ct.attributes {
                    self.check_type_ref(&attr.ty)?;
                }
                match &ct.content {
                    Content::Empty => Ok(()),
                    Content::Simple(ty) => self.check_type_ref(ty),
                    Content::All(decls) => {
                        decls.iter().try_for_each(|(d, _)| self.check_type_ref(&d.ty))
                    }
                    Content::Particle(p) => self.check_particle(p),
                }
            }
        }
    }

    fn check_particle(&self, particle: &Particle) -> Result<(), SchemaError> {
        match particle {
            Particle::Element(decl, _) => self.check_type_ref(&decl.ty),
            Particle::Ref(name, _) if !self.elements.contains_key(name) => {
                Err(self.compile_error(format!("undefined element '{name}'")))
            }
            Particle::Ref(..) => Ok(()),
            Particle::Sequence(items, _) | Particle::Choice(items, _) => {
                items.iter().try_for_each(|p| self.check_particle(p))
            }
        }
    }
}

impl fmt::Debug for XsdSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XsdSchema")
            .field("name", &self.name)
            .field("elements", &self.element_names())
            .finish_non_exhaustive()
    }
}

/// Turns schema document elements into schema components.
struct Compiler<'a> {
    name: &'a str,
    /// Prefixes bound to the XSD namespace; `""` for the default namespace.
    xsd_prefixes: Vec<String>,
}

impl<'a> Compiler<'a> {
    fn new(name: &'a str, root: &XmlElement) -> Result<Self, SchemaError> {
        if root.local_name() != "schema" {
            return Err(SchemaError::Compile {
                name: name.to_string(),
                reason: format!("root element is '{}', expected 'schema'", root.name),
            });
        }
        let xsd_prefixes = root
            .attributes
            .iter()
            .filter(|(_, v)| v == XSD_NAMESPACE)
            .filter_map(|(k, _)| {
                if k == "xmlns" {
                    Some(String::new())
                } else {
                    k.strip_prefix("xmlns:").map(str::to_string)
                }
            })
            .collect();
        Ok(Self { name, xsd_prefixes })
    }

    fn error(&self, reason: String) -> SchemaError {
        SchemaError::Compile {
            name: self.name.to_string(),
            reason,
        }
    }

    fn unsupported(&self, construct: &str) -> SchemaError {
        self.error(format!("unsupported construct '{construct}'"))
    }

    fn required_attr<'e>(&self, el: &'e XmlElement, attr: &str) -> Result<&'e str, SchemaError> {
        el.attribute(attr).ok_or_else(|| {
            self.error(format!("'{}' is missing attribute '{attr}'", el.local_name()))
        })
    }

    /// Resolve a `type="..."` / `base="..."` value.
    fn type_name(&self, qname: &str) -> Result<TypeRef, SchemaError> {
        let prefix = qname.split_once(':').map_or("", |(p, _)| p);
        let local = local_part(qname);
        if self.xsd_prefixes.iter().any(|p| p == prefix) {
            if local == "anyType" {
                return Ok(TypeRef::Any);
            }
            return Builtin::from_local_name(local)
                .map(TypeRef::Builtin)
                .ok_or_else(|| self.error(format!("unsupported built-in type '{qname}'")));
        }
        Ok(TypeRef::Named(local.to_string()))
    }

    fn occurs(&self, el: &XmlElement) -> Result<Occurs, SchemaError> {
        let parse = |attr: &str, value: &str| {
            value
                .parse::<u32>()
                .map_err(|_| self.error(format!("invalid {attr} '{value}'")))
        };
        let min = match el.attribute("minOccurs") {
            Some(v) => parse("minOccurs", v)?,
            None => 1,
        };
        let max = match el.attribute("maxOccurs") {
            Some("unbounded") => None,
            Some(v) => Some(parse("maxOccurs", v)?),
            None => Some(1),
        };
        if max.is_some_and(|max| max < min) {
            return Err(self.error(format!("maxOccurs is less than minOccurs on '{}'", el.name)));
        }
        Ok(Occurs { min, max })
    }

    /// An element declaration's name and type.
    fn element_decl(&self, el: &XmlElement) -> Result<ElementDecl, SchemaError> {
        let name = self.required_attr(el, "name")?.to_string();
        let inline_complex = el.children_named("complexType").next();
        let inline_simple = el.children_named("simpleType").next();

        let ty = match (el.attribute("type"), inline_complex, inline_simple) {
            (Some(t), None, None) => self.type_name(t)?,
            (None, Some(ct), None) => TypeRef::Inline(Box::new(TypeDef::Complex(self.complex_type(ct)?))),
            (None, None, Some(st)) => TypeRef::Inline(Box::new(TypeDef::Simple(self.simple_type(st)?))),
            (None, None, None) => TypeRef::Any,
            _ => {
                return Err(self.error(format!(
                    "element '{name}' declares more than one type"
                )))
            }
        };
        Ok(ElementDecl { name, ty })
    }

    fn particle(&self, el: &XmlElement) -> Result<Particle, SchemaError> {
        let occurs = self.occurs(el)?;
        match el.local_name() {
            "element" => match el.attribute("ref") {
                Some(r) => Ok(Particle::Ref(local_part(r).to_string(), occurs)),
                None => Ok(Particle::Element(self.element_decl(el)?, occurs)),
            },
            "sequence" => Ok(Particle::Sequence(self.particles(el)?, occurs)),
            "choice" => Ok(Particle::Choice(self.particles(el)?, occurs)),
            other => Err(self.unsupported(other)),
        }
    }

    fn particles(&self, group: &XmlElement) -> Result<Vec<Particle>, SchemaError> {
        group
            .children
            .iter()
            .filter(|c| c.local_name() != "annotation")
            .map(|c| self.particle(c))
            .collect()
    }

    fn attribute_decl(&self, el: &XmlElement) -> Result<AttributeDecl, SchemaError> {
        let name = self.required_attr(el, "name")?.to_string();
        let ty = match (el.attribute("type"), el.children_named("simpleType").next()) {
            (Some(t), _) => self.type_name(t)?,
            (None, Some(st)) => TypeRef::Inline(Box::new(TypeDef::Simple(self.simple_type(st)?))),
            (None, None) => TypeRef::Builtin(Builtin::AnySimpleType),
        };
        let required = el.attribute("use") == Some("required");
        Ok(AttributeDecl { name, ty, required })
    }

    fn complex_type(&self, el: &XmlElement) -> Result<ComplexType, SchemaError> {
        let mut ct = ComplexType {
            content: Content::Empty,
            attributes: Vec::new(),
            any_attribute: false,
            mixed: el.attribute("mixed") == Some("true"),
        };

        for child in &el.children {
            match child.local_name() {
                "sequence" | "choice" => ct.content = Content::Particle(self.particle(child)?),
                "all" => {
                    let mut decls = Vec::new();
                    for item in child.children_named("element") {
                        let occurs = self.occurs(item)?;
                        if occurs.max.map_or(true, |max| max > 1) {
                            return Err(self.error(
                                "elements inside 'all' may occur at most once".to_string(),
                            ));
                        }
                        decls.push((self.element_decl(item)?, occurs));
                    }
                    ct.content = Content::All(decls);
                }
                "attribute" => ct.attributes.push(self.attribute_decl(child)?),
                "anyAttribute" => ct.any_attribute = true,
                "simpleContent" => {
                    let extension = child
                        .children_named("extension")
                        .next()
                        .ok_or_else(|| self.error("simpleContent needs an extension".to_string()))?;
                    let base = self.type_name(self.required_attr(extension, "base")?)?;
                    ct.content = Content::Simple(base);
                    for item in &extension.children {
                        match item.local_name() {
                            "attribute" => ct.attributes.push(self.attribute_decl(item)?),
                            "anyAttribute" => ct.any_attribute = true,
                            "annotation" => {}
                            other => return Err(self.unsupported(other)),
                        }
                    }
                }
                "annotation" => {}
                other => return Err(self.unsupported(other)),
            }
        }
        Ok(ct)
    }

    fn simple_type(&self, el: &XmlElement) -> Result<SimpleType, SchemaError> {
        let restriction = el
            .children_named("restriction")
            .next()
            .ok_or_else(|| self.error("simpleType supports only 'restriction'".to_string()))?;
        let base = match self.type_name(self.required_attr(restriction, "base")?)? {
            TypeRef::Builtin(b) => SimpleBase::Builtin(b),
            TypeRef::Named(n) => SimpleBase::Named(n),
            TypeRef::Any => SimpleBase::Builtin(Builtin::AnySimpleType),
            TypeRef::Inline(_) => return Err(self.unsupported("inline restriction base")),
        };

        let mut facets = Facets::default();
        for facet in &restriction.children {
            if facet.local_name() == "annotation" {
                continue;
            }
            let value = self.required_attr(facet, "value")?;
            let size = || {
                value
                    .parse::<usize>()
                    .map_err(|_| self.error(format!("invalid {} '{value}'", facet.local_name())))
            };
            let bound = || {
                value
                    .parse::<f64>()
                    .map_err(|_| self.error(format!("invalid {} '{value}'", facet.local_name())))
            };
            match facet.local_name() {
                "enumeration" => facets.enumeration.push(value.to_string()),
                "pattern" => {
                    let re = Regex::new(&format!("^(?:{value})$"))
                        .map_err(|e| self.error(format!("invalid pattern '{value}': {e}")))?;
                    facets.patterns.push(re);
                }
                "length" => facets.length = Some(size()?),
                "minLength" => facets.min_length = Some(size()?),
                "maxLength" => facets.max_length = Some(size()?),
                "minInclusive" => facets.min_inclusive = Some(bound()?),
                "maxInclusive" => facets.max_inclusive = Some(bound()?),
                "minExclusive" => facets.min_exclusive = Some(bound()?),
                "maxExclusive" => facets.max_exclusive = Some(bound()?),
                other => return Err(self.unsupported(other)),
            }
        }
        Ok(SimpleType { base, facets })
    }
}

// ── Instance validation ─────────────────────────────────────────────

/// Attributes that belong to XML itself rather than the vocabulary.
fn is_reserved_attribute(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:") || name.starts_with("xsi:") || name.starts_with("xml:")
}

struct Validation<'s> {
    schema: &'s XsdSchema,
    violations: Vec<Violation>,
}

impl<'s> Validation<'s> {
    fn report(&mut self, path: &str, schema_path: &str, message: String) {
        self.violations.push(Violation {
            instance_path: path.to_string(),
            schema_path: schema_path.to_string(),
            message,
        });
    }

    fn resolve(&self, ty: &'s TypeRef) -> Option<Resolved<'s>> {
        match ty {
            TypeRef::Builtin(_) => Some(Resolved::SimpleValue),
            TypeRef::Any => Some(Resolved::Any),
            TypeRef::Named(name) => match self.schema.types.get(name)? {
                TypeDef::Simple(_) => Some(Resolved::SimpleValue),
                TypeDef::Complex(ct) => Some(Resolved::Complex(ct)),
            },
            TypeRef::Inline(def) => match def.as_ref() {
                TypeDef::Simple(_) => Some(Resolved::SimpleValue),
                TypeDef::Complex(ct) => Some(Resolved::Complex(ct)),
            },
        }
    }

    fn element(&mut self, ty: &'s TypeRef, el: &XmlElement, path: &str) {
        let Some(resolved) = self.resolve(ty) else {
            self.report(path, "", "element type is undefined".to_string());
            return;
        };
        match resolved {
            Resolved::Any => {}
            Resolved::SimpleValue => {
                self.no_attributes(el, path);
                self.no_children(el, path);
                if let Err(message) = self.simple_value(ty, &el.text, 0) {
                    self.report(path, "type", message);
                }
            }
            Resolved::Complex(ct) => self.complex(ct, el, path),
        }
    }

    fn no_attributes(&mut self, el: &XmlElement, path: &str) {
        for (name, _) in &el.attributes {
            if !is_reserved_attribute(name) {
                self.report(path, "type", format!("attribute '{name}' is not allowed"));
            }
        }
    }

    fn no_children(&mut self, el: &XmlElement, path: &str) {
        if let Some(child) = el.children.first() {
            self.report(
                path,
                "type",
                format!("element '{}' is not allowed in simple content", child.local_name()),
            );
        }
    }

    /// Check text against a simple type reference.
    fn simple_value(&self, ty: &TypeRef, raw: &str, depth: usize) -> Result<(), String> {
        if depth > MAX_TYPE_DEPTH {
            return Err("type derivation is too deep".to_string());
        }
        match ty {
            TypeRef::Builtin(b) => b.check(normalize(*b, raw)),
            TypeRef::Any => Ok(()),
            TypeRef::Named(name) => match self.schema.types.get(name) {
                Some(TypeDef::Simple(st)) => self.simple_type(st, raw, depth + 1),
                Some(TypeDef::Complex(_)) => Err(format!("'{name}' is not a simple type")),
                None => Err(format!("undefined type '{name}'")),
            },
            TypeRef::Inline(def) => match def.as_ref() {
                TypeDef::Simple(st) => self.simple_type(st, raw, depth + 1),
                TypeDef::Complex(_) => Err("expected a simple type".to_string()),
            },
        }
    }

    fn simple_type(&self, st: &SimpleType, raw: &str, depth: usize) -> Result<(), String> {
        let base_ref = match &st.base {
            SimpleBase::Builtin(b) => TypeRef::Builtin(*b),
            SimpleBase::Named(n) => TypeRef::Named(n.clone()),
        };
        self.simple_value(&base_ref, raw, depth)?;
        let value = match self.root_builtin(st, depth) {
            Some(b) => normalize(b, raw),
            None => raw,
        };
        st.facets.check(value)
    }

    fn root_builtin(&self, st: &SimpleType, depth: usize) -> Option<Builtin> {
        if depth > MAX_TYPE_DEPTH {
            return None;
        }
        match &st.base {
            SimpleBase::Builtin(b) => Some(*b),
            SimpleBase::Named(n) => match self.schema.types.get(n)? {
                TypeDef::Simple(parent) => self.root_builtin(parent, depth + 1),
                TypeDef::Complex(_) => None,
            },
        }
    }

    fn complex(&mut self, ct: &'s ComplexType, el: &XmlElement, path: &str) {
        self.attributes(ct, el, path);

        match &ct.content {
            Content::Simple(base) => {
                self.no_children(el, path);
                if let Err(message) = self.simple_value(base, &el.text, 0) {
                    self.report(path, "simpleContent", message);
                }
            }
            Content::Empty => {
                if let Some(child) = el.children.first() {
                    self.report(
                        path,
                        "complexType",
                        format!("element '{}' is not allowed in empty content", child.local_name()),
                    );
                }
                self.element_only_text(ct, el, path);
            }
            Content::Particle(particle) => {
                self.element_only_text(ct, el, path);
                let mut matched = Vec::new();
                match self.match_particle(particle, &el.children, 0, &mut matched) {
                    Ok(pos) if pos < el.children.len() => self.report(
                        path,
                        "complexType",
                        format!("unexpected element '{}'", el.children[pos].local_name()),
                    ),
                    Ok(_) => {}
                    Err(message) => self.report(path, "complexType", message),
                }
                for (index, ty) in matched {
                    let child = &el.children[index];
                    self.element(ty, child, &format!("{path}/{}", child.local_name()));
                }
            }
            Content::All(decls) => {
                self.element_only_text(ct, el, path);
                let mut seen = vec![false; decls.len()];
                for child in &el.children {
                    let child_path = format!("{path}/{}", child.local_name());
                    match decls.iter().position(|(d, _)| d.name == child.local_name()) {
                        Some(i) if seen[i] => self.report(
                            &child_path,
                            "all",
                            format!("element '{}' appears more than once", child.local_name()),
                        ),
                        Some(i) => {
                            seen[i] = true;
                            self.element(&decls[i].0.ty, child, &child_path);
                        }
                        None => self.report(
                            path,
                            "all",
                            format!("unexpected element '{}'", child.local_name()),
                        ),
                    }
                }
                for ((decl, occurs), present) in decls.iter().zip(&seen) {
                    if !present && occurs.min > 0 {
                        self.report(path, "all", format!("missing element '{}'", decl.name));
                    }
                }
            }
        }
    }

    fn element_only_text(&mut self, ct: &ComplexType, el: &XmlElement, path: &str) {
        if !ct.mixed && !el.text.trim().is_empty() {
            self.report(
                path,
                "complexType",
                "character data is not allowed in element-only content".to_string(),
            );
        }
    }

    fn attributes(&mut self, ct: &ComplexType, el: &XmlElement, path: &str) {
        for (name, value) in &el.attributes {
            if is_reserved_attribute(name) {
                continue;
            }
            match ct.attributes.iter().find(|a| a.name == local_part(name)) {
                Some(decl) => {
                    if let Err(message) = self.simple_value(&decl.ty, value, 0) {
                        self.report(path, "attribute", format!("attribute '{name}': {message}"));
                    }
                }
                None if ct.any_attribute => {}
                None => self.report(path, "attribute", format!("attribute '{name}' is not allowed")),
            }
        }
        for decl in ct.attributes.iter().filter(|a| a.required) {
            if !el.attributes.iter().any(|(k, _)| local_part(k) == decl.name) {
                self.report(path, "attribute", format!("missing required attribute '{}'", decl.name));
            }
        }
    }

    /// Match `particle` against `children[pos..]`, recording which
    /// declaration each consumed child matched. Returns the new position.
    fn match_particle(
        &self,
        particle: &'s Particle,
        children: &[XmlElement],
        pos: usize,
        matched: &mut Vec<(usize, &'s TypeRef)>,
    ) -> Result<usize, String> {
        match particle {
            Particle::Element(decl, occurs) => {
                self.match_element(&decl.name, &decl.ty, *occurs, children, pos, matched)
            }
            Particle::Ref(name, occurs) => match self.schema.elements.get(name) {
                Some(decl) => self.match_element(name, &decl.ty, *occurs, children, pos, matched),
                None => Err(format!("undefined element '{name}'")),
            },
            Particle::Sequence(items, occurs) => {
                self.repeat(*occurs, pos, matched, |v, pos, matched| {
                    items
                        .iter()
                        .try_fold(pos, |pos, item| v.match_particle(item, children, pos, matched))
                })
            }
            Particle::Choice(items, occurs) => {
                self.repeat(*occurs, pos, matched, |v, pos, matched| {
                    let mut empty_match = false;
                    let mut last_err = None;
                    for item in items {
                        let mark = matched.len();
                        match v.match_particle(item, children, pos, matched) {
                            Ok(next) if next > pos => return Ok(next),
                            Ok(_) => empty_match = true,
                            Err(e) => last_err = Some(e),
                        }
                        matched.truncate(mark);
                    }
                    if empty_match {
                        Ok(pos)
                    } else {
                        Err(last_err.unwrap_or_else(|| "empty choice".to_string()))
                    }
                })
            }
        }
    }

    fn match_element(
        &self,
        name: &str,
        ty: &'s TypeRef,
        occurs: Occurs,
        children: &[XmlElement],
        mut pos: usize,
        matched: &mut Vec<(usize, &'s TypeRef)>,
    ) -> Result<usize, String> {
        let mut count = 0;
        while occurs.allows_more(count) && pos < children.len() && children[pos].local_name() == name {
            matched.push((pos, ty));
            pos += 1;
            count += 1;
        }
        if count < occurs.min {
            return Err(match children.get(pos) {
                Some(found) => format!("expected element '{name}', found '{}'", found.local_name()),
                None => format!("missing element '{name}'"),
            });
        }
        Ok(pos)
    }

    /// Apply a group `occurs` times, stopping early once the minimum is met
    /// and another round fails or consumes nothing.
    fn repeat<F>(
        &self,
        occurs: Occurs,
        mut pos: usize,
        matched: &mut Vec<(usize, &'s TypeRef)>,
        round: F,
    ) -> Result<usize, String>
    where
        F: Fn(&Self, usize, &mut Vec<(usize, &'s TypeRef)>) -> Result<usize, String>,
    {
        let mut count = 0;
        while occurs.allows_more(count) {
            let mark = matched.len();
            match round(self, pos, matched) {
                // A round that consumes nothing satisfies every remaining minimum.
                Ok(next) if next == pos => return Ok(pos),
                Ok(next) => {
                    pos = next;
                    count += 1;
                }
                Err(e) => {
                    matched.truncate(mark);
                    if count >= occurs.min {
                        break;
                    }
                    return Err(e);
                }
            }
        }
        Ok(pos)
    }
}

/// What an element's type resolves to; simple values are checked through
/// the original `TypeRef`.
enum Resolved<'s> {
    SimpleValue,
    Complex(&'s ComplexType),
    Any,
}

fn normalize(builtin: Builtin, raw: &str) -> &str {
    if builtin.preserves_whitespace() {
        raw
    } else {
        raw.trim()
    }
}

impl XmlSchema for XsdSchema {
    fn name(&self) -> &str {
        &self.name
    }

    fn assert_valid(&self, tree: &XmlElement) -> Result<(), SchemaError> {
        let mut validation = Validation {
            schema: self,
            violations: Vec::new(),
        };
        let path = format!("/{}", tree.local_name());
        match self.elements.get(tree.local_name()) {
            Some(decl) => validation.element(&decl.ty, tree, &path),
            None => validation.report(
                &path,
                "",
                format!("no global declaration for element '{}'", tree.local_name()),
            ),
        }

        if validation.violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::Invalid {
                schema: self.name.clone(),
                violations: Violations::new(validation.violations),
            })
        }
    }
}
