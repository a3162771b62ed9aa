//! Runtime value representation for decoded fields.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decoded field value.
///
/// Integer and float variants mirror the FIT base types; the remaining
/// variants are produced by rendering: enum labels become [`Value::String`],
/// `date_time` fields become [`Value::Timestamp`], and scaled numeric fields
/// become [`Value::Float64`]. Absence ("no data" markers) is represented as
/// `Option::None` at the call site, never as a variant here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    SInt8(i8),
    UInt8(u8),
    SInt16(i16),
    UInt16(u16),
    SInt32(i32),
    UInt32(u32),
    /// Wide integer produced by component extraction and accumulation, which
    /// can exceed the 32-bit range of any single wire encoding.
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Bool(bool),
    String(String),
    /// Raw byte blob (`byte` base type).
    Bytes(Vec<u8>),
    /// Absolute timestamp rendered from a `date_time` field.
    Timestamp(DateTime<Utc>),
    /// Naive device-local timestamp rendered from a `local_date_time` field.
    LocalTimestamp(NaiveDateTime),
    /// Multi-element field (declared size a multiple of the base type size).
    /// Elements are individually subject to invalid-sentinel suppression.
    Array(Vec<Option<Value>>),
}

impl Value {
    /// The value as an unsigned integer, when it is one.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt8(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::UInt64(v) => Some(v),
            Value::SInt8(v) => u64::try_from(v).ok(),
            Value::SInt16(v) => u64::try_from(v).ok(),
            Value::SInt32(v) => u64::try_from(v).ok(),
            _ => None,
        }
    }

    /// The value as a signed integer, when it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::SInt8(v) => Some(v.into()),
            Value::SInt16(v) => Some(v.into()),
            Value::SInt32(v) => Some(v.into()),
            Value::UInt8(v) => Some(v.into()),
            Value::UInt16(v) => Some(v.into()),
            Value::UInt32(v) => Some(v.into()),
            Value::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// The value as a float, converting from any numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float32(v) => Some(v.into()),
            Value::Float64(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64).or(self.as_u64().map(|v| v as f64)),
        }
    }

    /// The value as a string slice, when it is a string or enum label.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The value as a bool, when it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }

    /// Whether this value is numeric (integer or float, but not an array).
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Value::SInt8(_)
                | Value::UInt8(_)
                | Value::SInt16(_)
                | Value::UInt16(_)
                | Value::SInt32(_)
                | Value::UInt32(_)
                | Value::UInt64(_)
                | Value::Float32(_)
                | Value::Float64(_)
        )
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::SInt8(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::SInt16(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::SInt32(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Bytes(v) => {
                for (i, b) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Value::Timestamp(v) => write!(f, "{v}"),
            Value::LocalTimestamp(v) => write!(f, "{v}"),
            Value::Array(values) => {
                write!(f, "[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match v {
                        Some(v) => write!(f, "{v}")?,
                        None => write!(f, "invalid")?,
                    }
                }
                write!(f, "]")
            }
        }
    }
}
