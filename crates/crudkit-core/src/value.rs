//! Runtime values bound as statement parameters and read back from rows.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::mapping::ScalarType;

/// Text formats accepted when a driver hands back a date/time as a string.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Canonical text form used when a date/time is stored as a string.
pub const DATETIME_TEXT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A runtime value passed to or returned from a connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit floating point.
    Float64(f64),
    /// Exact decimal as text.
    Decimal(String),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(Vec<u8>),
    /// Date and time without offset.
    DateTime(NaiveDateTime),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short name of the variant, used in conversion errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float64(_) => "float64",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::DateTime(_) => "datetime",
        }
    }

    /// Try to get as i64 without loss.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(*i as i64),
            Value::Int64(i) => Some(*i),
            Value::Bool(b) => Some(*b as i64),
            Value::Float64(f) => float_to_i64(*f),
            Value::Decimal(s) => decimal_to_i64(s),
            _ => None,
        }
    }

    /// Try to get as string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) | Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Convert to the given column type.
    ///
    /// Null converts to null for every type. Numeric narrowing fails rather
    /// than truncating, so an integer key read back as `NUMBER` text or as a
    /// float survives exactly or is rejected.
    pub fn coerce(self, target: ScalarType) -> Result<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        let found = self.type_name();
        let fail = || Error::conversion(target.to_string(), found);

        match target {
            ScalarType::Bool => match self {
                Value::Bool(b) => Ok(Value::Bool(b)),
                other => match other.as_i64() {
                    Some(0) => Ok(Value::Bool(false)),
                    Some(1) => Ok(Value::Bool(true)),
                    _ => Err(fail()),
                },
            },
            ScalarType::Int32 => {
                let wide = self.as_i64().ok_or_else(fail)?;
                i32::try_from(wide).map(Value::Int32).map_err(|_| fail())
            }
            ScalarType::Int64 => self.as_i64().map(Value::Int64).ok_or_else(fail),
            ScalarType::Float64 => match self {
                Value::Float64(f) => Ok(Value::Float64(f)),
                Value::Int32(i) => Ok(Value::Float64(i as f64)),
                Value::Int64(i) => Ok(Value::Float64(i as f64)),
                Value::Decimal(s) | Value::String(s) => {
                    s.trim().parse().map(Value::Float64).map_err(|_| fail())
                }
                _ => Err(fail()),
            },
            ScalarType::Decimal => match self {
                Value::Decimal(s) => Ok(Value::Decimal(s)),
                Value::Int32(i) => Ok(Value::Decimal(i.to_string())),
                Value::Int64(i) => Ok(Value::Decimal(i.to_string())),
                Value::Float64(f) => Ok(Value::Decimal(f.to_string())),
                Value::String(s) if s.trim().parse::<f64>().is_ok() => {
                    Ok(Value::Decimal(s.trim().to_string()))
                }
                _ => Err(fail()),
            },
            ScalarType::String => match self {
                Value::String(s) | Value::Decimal(s) => Ok(Value::String(s)),
                Value::Int32(i) => Ok(Value::String(i.to_string())),
                Value::Int64(i) => Ok(Value::String(i.to_string())),
                _ => Err(fail()),
            },
            ScalarType::Bytes => match self {
                Value::Bytes(b) => Ok(Value::Bytes(b)),
                _ => Err(fail()),
            },
            ScalarType::DateTime => match self {
                Value::DateTime(dt) => Ok(Value::DateTime(dt)),
                Value::String(s) => parse_datetime(&s).map(Value::DateTime).ok_or_else(fail),
                _ => Err(fail()),
            },
        }
    }
}

fn float_to_i64(f: f64) -> Option<i64> {
    // 2^63 is exactly representable, so the upper bound is exclusive.
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn decimal_to_i64(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(i) = text.parse() {
        return Some(i);
    }
    let (whole, frac) = text.split_once('.')?;
    if frac.chars().all(|c| c == '0') {
        whole.parse().ok()
    } else {
        None
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Typed extraction from a [`Value`].
pub trait FromValue: Sized {
    /// Convert a value into this type.
    fn from_value(value: Value) -> Result<Self>;
}

macro_rules! from_value_impl {
    ($ty:ty, $scalar:expr, $variant:ident) => {
        impl FromValue for $ty {
            fn from_value(value: Value) -> Result<Self> {
                let found = value.type_name();
                match value.coerce($scalar)? {
                    Value::$variant(v) => Ok(v),
                    _ => Err(Error::conversion(stringify!($ty), found)),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

from_value_impl!(bool, ScalarType::Bool, Bool);
from_value_impl!(i32, ScalarType::Int32, Int32);
from_value_impl!(i64, ScalarType::Int64, Int64);
from_value_impl!(f64, ScalarType::Float64, Float64);
from_value_impl!(String, ScalarType::String, String);
from_value_impl!(Vec<u8>, ScalarType::Bytes, Bytes);
from_value_impl!(NaiveDateTime, ScalarType::DateTime, DateTime);

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
