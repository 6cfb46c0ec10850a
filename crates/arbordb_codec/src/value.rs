//! Typed field values and their declared types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single field value of a row.
///
/// `Null` is a member of every [`FieldType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit IEEE float.
    Double(f64),
    /// Text string (UTF-8).
    Text(String),
    /// Byte string.
    Bytes(Vec<u8>),
}

impl Value {
    /// Creates a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Returns true for `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the integer payload, if any.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the numeric payload as a float, coercing integers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Double(_) => "double",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Text(s) => write!(f, "'{s}'"),
            Self::Bytes(b) => {
                f.write_str("x'")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("'")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Self::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Text collation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Collation {
    /// Byte-wise UTF-8 order.
    #[default]
    Binary,
    /// Order ignoring case; the collating bytes are not reversible.
    CaseInsensitive,
}

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `Value::Bool`.
    Boolean,
    /// `Value::Int`.
    Integer,
    /// `Value::Double`.
    Double,
    /// `Value::Text` under a collation.
    Text(Collation),
    /// `Value::Bytes`, ordered byte-wise.
    Varbinary,
    /// `Value::Bytes` without an order; storable but not indexable or sortable.
    Blob,
}

impl FieldType {
    /// Returns true if `value` is a member of this type. NULL always is.
    #[must_use]
    pub const fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (Self::Boolean, Value::Bool(_))
                | (Self::Integer, Value::Int(_))
                | (Self::Double, Value::Double(_))
                | (Self::Text(_), Value::Text(_))
                | (Self::Varbinary | Self::Blob, Value::Bytes(_))
        )
    }

    /// Returns true if the type has a total order and a collating encoding.
    #[must_use]
    pub const fn is_orderable(&self) -> bool {
        !matches!(self, Self::Blob)
    }

    /// Returns true for the numeric types, which compare with each other.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Double)
    }

    /// The type used when values must round-trip through collating bytes.
    ///
    /// Case-insensitive text is stored with binary collation and blobs as
    /// varbinary.
    #[must_use]
    pub const fn storage_type(&self) -> Self {
        match self {
            Self::Text(_) => Self::Text(Collation::Binary),
            Self::Blob => Self::Varbinary,
            other => *other,
        }
    }

    /// Short name of the type, used in error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::Double => "DOUBLE",
            Self::Text(Collation::Binary) => "TEXT",
            Self::Text(Collation::CaseInsensitive) => "TEXT COLLATE NOCASE",
            Self::Varbinary => "VARBINARY",
            Self::Blob => "BLOB",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
