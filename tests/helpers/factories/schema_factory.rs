use std::sync::Arc;

use crate::engine::types::{DataType, Field, Schema};

pub struct SchemaFactory {
    fields: Vec<Field>,
}

impl SchemaFactory {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// One nullable column of every supported type, nested ones included.
    pub fn all_types() -> Self {
        Self::new()
            .with_required("id", DataType::Int64)
            .with("flag", DataType::Boolean)
            .with("tiny", DataType::Int8)
            .with("small", DataType::Int16)
            .with("count", DataType::Int32)
            .with("ratio", DataType::Float32)
            .with("score", DataType::Float64)
            .with(
                "price",
                DataType::Decimal {
                    precision: 38,
                    scale: 4,
                },
            )
            .with("name", DataType::Utf8)
            .with("blob", DataType::Binary)
            .with("day", DataType::Date)
            .with("seen_at", DataType::Timestamp)
            .with(
                "tags",
                DataType::array_of(Field::new("item", DataType::Utf8, true)),
            )
            .with(
                "meta",
                DataType::Struct(vec![
                    Field::new("version", DataType::Int32, false),
                    Field::new(
                        "points",
                        DataType::array_of(Field::new("item", DataType::Float64, true)),
                        true,
                    ),
                ]),
            )
    }

    pub fn with(mut self, name: &str, data_type: DataType) -> Self {
        self.fields.push(Field::new(name, data_type, true));
        self
    }

    pub fn with_required(mut self, name: &str, data_type: DataType) -> Self {
        self.fields.push(Field::new(name, data_type, false));
        self
    }

    pub fn create(self) -> Arc<Schema> {
        Arc::new(Schema::new(self.fields).expect("factory schema needs at least one field"))
    }
}
