use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::errors::{ExchangeError, Result};

/// Payload-free discriminant of [`DataType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    Utf8,
    Binary,
    Date,
    Timestamp,
    Array,
    Struct,
}

impl TypeTag {
    pub const ALL: [TypeTag; 14] = [
        TypeTag::Boolean,
        TypeTag::Int8,
        TypeTag::Int16,
        TypeTag::Int32,
        TypeTag::Int64,
        TypeTag::Float32,
        TypeTag::Float64,
        TypeTag::Decimal,
        TypeTag::Utf8,
        TypeTag::Binary,
        TypeTag::Date,
        TypeTag::Timestamp,
        TypeTag::Array,
        TypeTag::Struct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Boolean => "Boolean",
            TypeTag::Int8 => "Int8",
            TypeTag::Int16 => "Int16",
            TypeTag::Int32 => "Int32",
            TypeTag::Int64 => "Int64",
            TypeTag::Float32 => "Float32",
            TypeTag::Float64 => "Float64",
            TypeTag::Decimal => "Decimal",
            TypeTag::Utf8 => "Utf8",
            TypeTag::Binary => "Binary",
            TypeTag::Date => "Date",
            TypeTag::Timestamp => "Timestamp",
            TypeTag::Array => "Array",
            TypeTag::Struct => "Struct",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        TypeTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ExchangeError::format(format!("unknown type name '{s}'")))
    }
}

/// Logical column types that round-trip through vectors and the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    /// Unscaled value stored as a 128-bit integer.
    Decimal { precision: u8, scale: i8 },
    Utf8,
    Binary,
    /// Days since the Unix epoch.
    Date,
    /// Microseconds since the Unix epoch.
    Timestamp,
    Array(Box<Field>),
    Struct(Vec<Field>),
}

impl DataType {
    pub fn tag(&self) -> TypeTag {
        match self {
            DataType::Boolean => TypeTag::Boolean,
            DataType::Int8 => TypeTag::Int8,
            DataType::Int16 => TypeTag::Int16,
            DataType::Int32 => TypeTag::Int32,
            DataType::Int64 => TypeTag::Int64,
            DataType::Float32 => TypeTag::Float32,
            DataType::Float64 => TypeTag::Float64,
            DataType::Decimal { .. } => TypeTag::Decimal,
            DataType::Utf8 => TypeTag::Utf8,
            DataType::Binary => TypeTag::Binary,
            DataType::Date => TypeTag::Date,
            DataType::Timestamp => TypeTag::Timestamp,
            DataType::Array(_) => TypeTag::Array,
            DataType::Struct(_) => TypeTag::Struct,
        }
    }

    pub fn array_of(element: Field) -> Self {
        DataType::Array(Box::new(element))
    }

    pub fn is_nested(&self) -> bool {
        matches!(self, DataType::Array(_) | DataType::Struct(_))
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Decimal { precision, scale } => write!(f, "Decimal({precision}, {scale})"),
            DataType::Array(element) => write!(f, "Array<{}>", element.data_type),
            DataType::Struct(fields) => {
                f.write_str("Struct<")?;
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.data_type)?;
                }
                f.write_str(">")
            }
            other => f.write_str(other.tag().as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Result<Self> {
        if fields.is_empty() {
            return Err(ExchangeError::format(
                "schema must contain at least one field",
            ));
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}
