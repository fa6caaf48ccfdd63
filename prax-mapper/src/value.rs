//! Column values, entity identifiers and their database conversions.

use smol_str::SmolStr;
use std::fmt;
use uuid::Uuid;

use crate::error::{MapperError, MapperResult};

/// A single column value as stored in, or bound to, the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl Value {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Borrow the string content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer content, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(s) => write!(f, "'{}'", s),
            Self::Bytes(b) => write!(f, "x'{}'", hex(b)),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

/// The identifier of a persisted entity.
///
/// Its [`Display`](fmt::Display) rendering is the string key used by the
/// identity map and by every per-identifier lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    /// Integer identifier.
    Int(i64),
    /// Text identifier.
    Text(SmolStr),
    /// UUID identifier.
    Uuid(Uuid),
    /// Binary identifier.
    Bytes(Vec<u8>),
}

impl EntityId {
    /// The string-rendered key for this identifier.
    pub fn key(&self) -> SmolStr {
        match self {
            Self::Text(s) => s.clone(),
            other => SmolStr::new(other.to_string()),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
            Self::Uuid(u) => write!(f, "{}", u.hyphenated()),
            Self::Bytes(b) => write!(f, "{}", hex(b)),
        }
    }
}

impl From<i64> for EntityId {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for EntityId {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<&str> for EntityId {
    fn from(v: &str) -> Self {
        Self::Text(SmolStr::new(v))
    }
}

impl From<Uuid> for EntityId {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<Vec<u8>> for EntityId {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// Storage type of an entity identifier column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IdentifierType {
    /// 64-bit integer column.
    #[default]
    Integer,
    /// Unicode string column.
    String,
    /// ASCII-only string column.
    Ascii,
    /// Binary column.
    Binary,
    /// UUID stored in its hyphenated text form.
    Uuid,
}

/// Binding type for an array-valued `IN (...)` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayParameterType {
    /// Array of integers.
    Integer,
    /// Array of strings.
    String,
    /// Array of ASCII strings.
    Ascii,
    /// Array of binary values.
    Binary,
}

impl ArrayParameterType {
    /// Get the parameter type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Integer => "integer[]",
            Self::String => "string[]",
            Self::Ascii => "ascii_string[]",
            Self::Binary => "binary[]",
        }
    }
}

impl fmt::Display for ArrayParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IdentifierType {
    /// The array binding type used when a list of these identifiers is bound
    /// to a single `IN (...)` parameter.
    pub fn array_parameter_type(&self) -> ArrayParameterType {
        match self {
            Self::Integer => ArrayParameterType::Integer,
            Self::String | Self::Uuid => ArrayParameterType::String,
            Self::Ascii => ArrayParameterType::Ascii,
            Self::Binary => ArrayParameterType::Binary,
        }
    }

    /// Convert an identifier into its database representation.
    pub fn to_database(&self, id: &EntityId) -> MapperResult<Value> {
        match (self, id) {
            (Self::Integer, EntityId::Int(i)) => Ok(Value::Int(*i)),
            (Self::String, EntityId::Text(s)) => Ok(Value::Text(s.to_string())),
            (Self::Ascii, EntityId::Text(s)) if s.is_ascii() => Ok(Value::Text(s.to_string())),
            (Self::Binary, EntityId::Bytes(b)) => Ok(Value::Bytes(b.clone())),
            (Self::Uuid, EntityId::Uuid(u)) => Ok(Value::Text(u.hyphenated().to_string())),
            (ty, id) => Err(MapperError::invalid_data_type(format!(
                "identifier {} cannot be stored as {:?}",
                id, ty
            ))),
        }
    }

    /// Convert a database value back into an identifier.
    pub fn from_database(&self, value: &Value) -> MapperResult<EntityId> {
        match (self, value) {
            (Self::Integer, Value::Int(i)) => Ok(EntityId::Int(*i)),
            (Self::String | Self::Ascii, Value::Text(s)) => Ok(EntityId::Text(SmolStr::new(s))),
            (Self::Binary, Value::Bytes(b)) => Ok(EntityId::Bytes(b.clone())),
            (Self::Uuid, Value::Text(s)) => Uuid::parse_str(s)
                .map(EntityId::Uuid)
                .map_err(|e| {
                    MapperError::invalid_data_type(format!("invalid uuid identifier '{}'", s))
                        .with_source(e)
                }),
            (ty, value) => Err(MapperError::invalid_data_type(format!(
                "database value {} is not a valid {:?} identifier",
                value, ty
            ))),
        }
    }
}

fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}
