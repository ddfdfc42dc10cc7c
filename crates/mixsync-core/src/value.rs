//! Tagged scalar values carried in node messages.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ValueError;

/// Variant tag of a [`TypedValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Boolean.
    Bool,
    /// Signed integer.
    Int,
    /// Floating point.
    Double,
    /// UTF-8 text.
    Text,
}

impl ValueKind {
    /// Descriptor tag used on the wire for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Double => "float",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single protocol value.
///
/// Encoded on the wire as the bare JSON scalar. Decoding tries the variants
/// in declaration order, so `3` becomes [`TypedValue::Int`] while `3.0` and
/// `3.5` become [`TypedValue::Double`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypedValue {
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Double(f64),
    /// Text value.
    Text(String),
}

impl TypedValue {
    /// Variant tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Double(_) => ValueKind::Double,
            Self::Text(_) => ValueKind::Text,
        }
    }

    /// Interpret the value as a boolean.
    ///
    /// Numbers are `true` when non-zero; text accepts `true`/`false`/`1`/`0`.
    pub fn to_bool(&self) -> Result<bool, ValueError> {
        match self {
            Self::Bool(b) => Ok(*b),
            Self::Int(i) => Ok(*i != 0),
            Self::Double(d) => Ok(*d != 0.0),
            Self::Text(s) => match s.trim() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(ValueError::Unparseable {
                    expected: ValueKind::Bool,
                    text: s.clone(),
                }),
            },
        }
    }

    /// Interpret the value as an integer. Floats are rounded to nearest.
    pub fn to_i64(&self) -> Result<i64, ValueError> {
        match self {
            Self::Bool(b) => Ok(i64::from(*b)),
            Self::Int(i) => Ok(*i),
            Self::Double(d) => {
                if !d.is_finite() {
                    return Err(ValueError::NotFinite);
                }
                #[allow(clippy::cast_possible_truncation)]
                let rounded = d.round() as i64;
                Ok(rounded)
            }
            Self::Text(s) => s.trim().parse().map_err(|_| ValueError::Unparseable {
                expected: ValueKind::Int,
                text: s.clone(),
            }),
        }
    }

    /// Interpret the value as a float.
    pub fn to_f64(&self) -> Result<f64, ValueError> {
        match self {
            Self::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Ok(*i as f64),
            Self::Double(d) => Ok(*d),
            Self::Text(s) => s.trim().parse().map_err(|_| ValueError::Unparseable {
                expected: ValueKind::Double,
                text: s.clone(),
            }),
        }
    }

    /// Borrow the text payload, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for TypedValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}
