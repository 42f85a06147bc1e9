//! Column type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar column types understood by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// Exact decimal, carried as text (e.g. Oracle `NUMBER`).
    Decimal,
    /// UTF-8 string.
    String,
    /// Binary data.
    Bytes,
    /// Date and time without offset.
    DateTime,
}

impl ScalarType {
    /// Check if this type is an integer type (eligible for identity keys).
    pub fn is_integral(&self) -> bool {
        matches!(self, ScalarType::Int32 | ScalarType::Int64)
    }

    /// Check if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ScalarType::Int32 | ScalarType::Int64 | ScalarType::Float64 | ScalarType::Decimal
        )
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Bool => "bool",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Float64 => "float64",
            ScalarType::Decimal => "decimal",
            ScalarType::String => "string",
            ScalarType::Bytes => "bytes",
            ScalarType::DateTime => "datetime",
        };
        f.write_str(name)
    }
}
