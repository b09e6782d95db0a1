//! Data type definitions for livebind values.
//!
//! This module defines the scalar types a stored object property can hold.

/// Scalar data types understood by the binding layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type (true/false)
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point number
    Float,
    /// UTF-8 string
    String,
    /// Date stored as Unix timestamp (milliseconds)
    Date,
}

impl DataType {
    /// Returns the type name as it appears in schemas and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Date => "date",
        }
    }

    /// Returns whether values of this type order numerically.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
