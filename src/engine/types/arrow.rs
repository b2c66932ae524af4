use std::sync::Arc;

use arrow_schema::{
    DataType as ArrowDataType, Field as ArrowField, Fields, Schema as ArrowSchema, TimeUnit,
};

use super::data_type::{DataType, Field, Schema};
use crate::engine::errors::{ExchangeError, Result};

/// Deepest nesting of arrays and structs accepted from the wire.
pub const MAX_NESTING_DEPTH: usize = 64;

impl DataType {
    pub fn to_arrow_data_type(&self) -> ArrowDataType {
        match self {
            DataType::Boolean => ArrowDataType::Boolean,
            DataType::Int8 => ArrowDataType::Int8,
            DataType::Int16 => ArrowDataType::Int16,
            DataType::Int32 => ArrowDataType::Int32,
            DataType::Int64 => ArrowDataType::Int64,
            DataType::Float32 => ArrowDataType::Float32,
            DataType::Float64 => ArrowDataType::Float64,
            DataType::Decimal { precision, scale } => ArrowDataType::Decimal128(*precision, *scale),
            DataType::Utf8 => ArrowDataType::Utf8,
            DataType::Binary => ArrowDataType::Binary,
            DataType::Date => ArrowDataType::Date32,
            DataType::Timestamp => ArrowDataType::Timestamp(TimeUnit::Microsecond, None),
            DataType::Array(element) => ArrowDataType::List(Arc::new(element.to_arrow_field())),
            DataType::Struct(fields) => ArrowDataType::Struct(
                fields.iter().map(Field::to_arrow_field).collect::<Fields>(),
            ),
        }
    }

    /// Maps an arrow type back; anything this crate cannot hold is a format error.
    pub fn from_arrow_data_type(data_type: &ArrowDataType) -> Result<Self> {
        Self::from_arrow_at(data_type, 0)
    }

    fn from_arrow_at(data_type: &ArrowDataType, depth: usize) -> Result<Self> {
        if depth > MAX_NESTING_DEPTH {
            return Err(ExchangeError::format(format!(
                "schema nesting deeper than {MAX_NESTING_DEPTH}"
            )));
        }
        let mapped = match data_type {
            ArrowDataType::Boolean => DataType::Boolean,
            ArrowDataType::Int8 => DataType::Int8,
            ArrowDataType::Int16 => DataType::Int16,
            ArrowDataType::Int32 => DataType::Int32,
            ArrowDataType::Int64 => DataType::Int64,
            ArrowDataType::Float32 => DataType::Float32,
            ArrowDataType::Float64 => DataType::Float64,
            ArrowDataType::Decimal128(precision, scale) => DataType::Decimal {
                precision: *precision,
                scale: *scale,
            },
            ArrowDataType::Utf8 => DataType::Utf8,
            ArrowDataType::Binary => DataType::Binary,
            ArrowDataType::Date32 => DataType::Date,
            ArrowDataType::Timestamp(TimeUnit::Microsecond, None) => DataType::Timestamp,
            ArrowDataType::List(element) => {
                DataType::array_of(Field::from_arrow_at(element, depth + 1)?)
            }
            ArrowDataType::Struct(fields) => DataType::Struct(
                fields
                    .iter()
                    .map(|field| Field::from_arrow_at(field, depth + 1))
                    .collect::<Result<Vec<_>>>()?,
            ),
            other => {
                return Err(ExchangeError::format(format!(
                    "unsupported column type {other}"
                )));
            }
        };
        Ok(mapped)
    }
}

impl Field {
    pub fn to_arrow_field(&self) -> ArrowField {
        ArrowField::new(&self.name, self.data_type.to_arrow_data_type(), self.nullable)
    }

    fn from_arrow_at(field: &ArrowField, depth: usize) -> Result<Self> {
        Ok(Field::new(
            field.name().as_str(),
            DataType::from_arrow_at(field.data_type(), depth)?,
            field.is_nullable(),
        ))
    }
}

impl Schema {
    pub fn to_arrow_schema(&self) -> ArrowSchema {
        ArrowSchema::new(
            self.fields()
                .iter()
                .map(Field::to_arrow_field)
                .collect::<Vec<_>>(),
        )
    }

    pub fn from_arrow_schema(schema: &ArrowSchema) -> Result<Self> {
        let fields = schema
            .fields()
            .iter()
            .map(|field| Field::from_arrow_at(field, 0))
            .collect::<Result<Vec<_>>>()?;
        Schema::new(fields)
    }
}
