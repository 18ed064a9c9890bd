//! Payload values carried through the builders.
//!
//! - [`DocSource`] - a document to insert, either JSON text or a BSON document tree
//! - [`Field`] - a validated document path such as `address.city` or `tags[0]`
//! - [`ExprValue`] - a value used by updates and parameter bindings
//!
//! All of them are owned values. Builders take them by value and move them
//! into the request when the operation executes.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::{
    bind::{placeholders, validate_name},
    error::{CrudError, CrudResult},
};

/// A document handed to an add operation.
///
/// JSON text is kept as text until the operation executes, at which point it is
/// decoded into a [`Document`].
#[derive(Debug, Clone, PartialEq)]
pub enum DocSource {
    /// A JSON object in text form.
    Json(String),
    /// An already built document tree.
    Doc(Document),
}

impl DocSource {
    /// Serializes any serde value into a document source.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::Serialization`] if the value does not serialize to a document.
    pub fn from_serialize<T: Serialize>(value: &T) -> CrudResult<Self> {
        Ok(DocSource::Doc(bson::serialize_to_document(value)?))
    }

    /// Decodes JSON text without consuming the source.
    ///
    /// Returns `None` for [`DocSource::Doc`], which needs no decoding.
    pub(crate) fn parse_json(&self) -> Option<CrudResult<Document>> {
        match self {
            DocSource::Json(text) => Some(
                serde_json::from_str::<Document>(text).map_err(CrudError::from),
            ),
            DocSource::Doc(_) => None,
        }
    }
}

impl From<&str> for DocSource {
    fn from(json: &str) -> Self {
        DocSource::Json(json.to_string())
    }
}

impl From<String> for DocSource {
    fn from(json: String) -> Self {
        DocSource::Json(json)
    }
}

impl From<serde_json::Value> for DocSource {
    fn from(value: serde_json::Value) -> Self {
        DocSource::Json(value.to_string())
    }
}

impl From<Document> for DocSource {
    fn from(doc: Document) -> Self {
        DocSource::Doc(doc)
    }
}

impl From<&Document> for DocSource {
    fn from(doc: &Document) -> Self {
        DocSource::Doc(doc.clone())
    }
}

/// One step of a document path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// A named member, `.name` or `."quoted name"`.
    Member(String),
    /// Any member, `.*`.
    AnyMember,
    /// An array element, `[n]`.
    Index(usize),
    /// Any array element, `[*]`.
    AnyIndex,
}

/// A document path, validated when it is constructed.
///
/// Accepted forms include `name`, `a.b.c`, `$.a`, `a[0].b`, `a[*]`, `a.*`
/// and `a."with space"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Field {
    text: String,
    segments: Vec<PathSegment>,
}

impl Field {
    /// Parses a document path.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::InvalidArgument`] if the path is empty or malformed.
    pub fn parse(path: &str) -> CrudResult<Self> {
        let text = path.trim();
        let segments = parse_path(text)
            .map_err(|reason| CrudError::InvalidArgument(format!("invalid field path {path:?}: {reason}")))?;

        Ok(Field { text: text.to_string(), segments })
    }

    /// Returns the path as written.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Returns the parsed path segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns `true` if the path contains `*` or `[*]`.
    pub fn has_wildcard(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, PathSegment::AnyMember | PathSegment::AnyIndex))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Field {
    type Err = CrudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::parse(s)
    }
}

impl TryFrom<&str> for Field {
    type Error = CrudError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Field::parse(value)
    }
}

impl TryFrom<String> for Field {
    type Error = CrudError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Field::parse(&value)
    }
}

impl From<Field> for String {
    fn from(field: Field) -> Self {
        field.text
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn parse_path(text: &str) -> Result<Vec<PathSegment>, &'static str> {
    if text.is_empty() {
        return Err("path is empty");
    }

    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut pos = 0;

    // `$` names the document root and must be followed by a member or subscript.
    let mut expect_member = true;
    if chars[0] == '$' {
        pos = 1;
        if pos == chars.len() {
            return Err("path refers to the whole document");
        }
        expect_member = false;
    }

    while pos < chars.len() {
        match chars[pos] {
            '.' if !expect_member => {
                pos += 1;
                expect_member = true;
            }
            '[' => {
                if expect_member && !(segments.is_empty() && pos == 0) {
                    return Err("subscript follows a dot");
                }
                if pos == 0 {
                    return Err("path starts with a subscript");
                }
                let close = chars[pos..]
                    .iter()
                    .position(|c| *c == ']')
                    .map(|offset| pos + offset)
                    .ok_or("unterminated subscript")?;
                let inner: String = chars[pos + 1..close].iter().collect();
                let segment = if inner == "*" {
                    PathSegment::AnyIndex
                } else if !inner.is_empty() && inner.chars().all(|c| c.is_ascii_digit()) {
                    PathSegment::Index(inner.parse().map_err(|_| "subscript out of range")?)
                } else {
                    return Err("subscript must be a number or *");
                };
                segments.push(segment);
                pos = close + 1;
                expect_member = false;
            }
            '*' if expect_member => {
                segments.push(PathSegment::AnyMember);
                pos += 1;
                expect_member = false;
            }
            '"' | '`' if expect_member => {
                let quote = chars[pos];
                let close = chars[pos + 1..]
                    .iter()
                    .position(|c| *c == quote)
                    .map(|offset| pos + 1 + offset)
                    .ok_or("unterminated quoted member")?;
                let name: String = chars[pos + 1..close].iter().collect();
                if name.is_empty() {
                    return Err("empty quoted member");
                }
                segments.push(PathSegment::Member(name));
                pos = close + 1;
                expect_member = false;
            }
            c if expect_member && is_ident_start(c) => {
                let start = pos;
                while pos < chars.len() && is_ident_char(chars[pos]) {
                    pos += 1;
                }
                segments.push(PathSegment::Member(chars[start..pos].iter().collect()));
                expect_member = false;
            }
            _ => return Err("unexpected character"),
        }
    }

    if expect_member {
        return Err("path ends with a dot");
    }

    Ok(segments)
}

/// A value used in update steps and parameter bindings.
///
/// Scalars map onto the document store's native types. [`ExprValue::Param`]
/// refers to a named binding and [`ExprValue::Expr`] carries expression text
/// that is evaluated server-side.
///
/// # Example
///
/// ```ignore
/// use xcrud_core::value::{ExprValue, expr, param};
///
/// let a: ExprValue = 42.into();
/// let b: ExprValue = "text".into();
/// let c = param("limit");
/// let d = expr("price * 2");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(#[serde(with = "u64_text")] u64),
    Double(f64),
    Bytes(#[serde(with = "serde_bytes")] Vec<u8>),
    String(String),
    Document(Document),
    Array(Vec<ExprValue>),
    /// Reference to a named parameter, resolved from the binding table.
    Param(String),
    /// Raw expression text, forwarded verbatim.
    Expr(String),
}

impl ExprValue {
    /// Builds an octet sequence value.
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        ExprValue::Bytes(data.into())
    }

    /// Returns the names of every parameter this value refers to, in order of appearance.
    pub fn params(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_params(&mut names);
        names
    }

    fn collect_params(&self, names: &mut Vec<String>) {
        match self {
            ExprValue::Param(name) => names.push(name.clone()),
            ExprValue::Expr(text) => names.extend(placeholders(text)),
            ExprValue::Array(items) => items
                .iter()
                .for_each(|item| item.collect_params(names)),
            _ => {}
        }
    }

    /// Checks the name of every parameter reference inside this value.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::InvalidArgument`] for the first invalid name.
    pub fn validate_params(&self) -> CrudResult<()> {
        match self {
            ExprValue::Param(name) => validate_name(name),
            ExprValue::Array(items) => items.iter().try_for_each(ExprValue::validate_params),
            _ => Ok(()),
        }
    }

    /// Returns the size in bytes of the largest octet sequence inside this value.
    pub(crate) fn max_octets(&self) -> usize {
        match self {
            ExprValue::Bytes(data) => data.len(),
            ExprValue::Array(items) => items
                .iter()
                .map(ExprValue::max_octets)
                .max()
                .unwrap_or(0),
            _ => 0,
        }
    }

    /// Converts a literal value into BSON.
    ///
    /// Returns `None` for parameter references and raw expressions, which have
    /// no literal representation.
    pub fn to_bson(&self) -> Option<Bson> {
        Some(match self {
            ExprValue::Null => Bson::Null,
            ExprValue::Bool(value) => Bson::Boolean(*value),
            ExprValue::Int(value) => Bson::Int64(*value),
            ExprValue::UInt(value) => match i64::try_from(*value) {
                Ok(value) => Bson::Int64(value),
                Err(_) => Bson::Double(*value as f64),
            },
            ExprValue::Double(value) => Bson::Double(*value),
            ExprValue::Bytes(data) => Bson::Binary(bson::Binary {
                subtype: bson::spec::BinarySubtype::Generic,
                bytes: data.clone(),
            }),
            ExprValue::String(value) => Bson::String(value.clone()),
            ExprValue::Document(doc) => Bson::Document(doc.clone()),
            ExprValue::Array(items) => Bson::Array(
                items
                    .iter()
                    .map(ExprValue::to_bson)
                    .collect::<Option<Vec<_>>>()?,
            ),
            ExprValue::Param(_) | ExprValue::Expr(_) => return None,
        })
    }
}

/// Builds a raw expression value.
pub fn expr(text: impl Into<String>) -> ExprValue {
    ExprValue::Expr(text.into())
}

/// Builds a reference to a named parameter.
pub fn param(name: impl Into<String>) -> ExprValue {
    ExprValue::Param(name.into())
}

impl From<()> for ExprValue {
    fn from(_: ()) -> Self {
        ExprValue::Null
    }
}

impl From<bool> for ExprValue {
    fn from(value: bool) -> Self {
        ExprValue::Bool(value)
    }
}

macro_rules! impl_from_signed {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ExprValue {
            fn from(value: $ty) -> Self {
                ExprValue::Int(i64::from(value))
            }
        })*
    };
}

macro_rules! impl_from_unsigned {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ExprValue {
            fn from(value: $ty) -> Self {
                ExprValue::UInt(u64::from(value))
            }
        })*
    };
}

impl_from_signed!(i8, i16, i32, i64);
impl_from_unsigned!(u8, u16, u32, u64);

impl From<f32> for ExprValue {
    fn from(value: f32) -> Self {
        ExprValue::Double(f64::from(value))
    }
}

impl From<f64> for ExprValue {
    fn from(value: f64) -> Self {
        ExprValue::Double(value)
    }
}

impl From<&str> for ExprValue {
    fn from(value: &str) -> Self {
        ExprValue::String(value.to_string())
    }
}

impl From<String> for ExprValue {
    fn from(value: String) -> Self {
        ExprValue::String(value)
    }
}

impl From<Document> for ExprValue {
    fn from(doc: Document) -> Self {
        ExprValue::Document(doc)
    }
}

impl<T: Into<ExprValue>> From<Vec<T>> for ExprValue {
    fn from(items: Vec<T>) -> Self {
        ExprValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ExprValue>> From<Option<T>> for ExprValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ExprValue::Null, Into::into)
    }
}

impl TryFrom<Bson> for ExprValue {
    type Error = CrudError;

    fn try_from(value: Bson) -> Result<Self, Self::Error> {
        Ok(match value {
            Bson::Null => ExprValue::Null,
            Bson::Boolean(value) => ExprValue::Bool(value),
            Bson::Int32(value) => ExprValue::Int(i64::from(value)),
            Bson::Int64(value) => ExprValue::Int(value),
            Bson::Double(value) => ExprValue::Double(value),
            Bson::String(value) => ExprValue::String(value),
            Bson::Binary(binary) => ExprValue::Bytes(binary.bytes),
            Bson::Document(doc) => ExprValue::Document(doc),
            Bson::Array(items) => ExprValue::Array(
                items
                    .into_iter()
                    .map(ExprValue::try_from)
                    .collect::<CrudResult<Vec<_>>>()?,
            ),
            other => {
                return Err(CrudError::InvalidArgument(format!(
                    "unsupported value type {:?}",
                    other.element_type()
                )));
            }
        })
    }
}

/// BSON has no unsigned 64-bit integer, so `UInt` travels as decimal text.
mod u64_text {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(D::Error::custom)
    }
}
