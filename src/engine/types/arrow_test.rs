use std::sync::Arc;

use arrow_schema::{DataType as ArrowDataType, Field as ArrowField, Schema as ArrowSchema, TimeUnit};

use super::{DataType, Field, MAX_NESTING_DEPTH, Schema};
use crate::engine::errors::ExchangeError;

#[test]
fn nested_schema_maps_to_arrow_and_back() {
    let schema = Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("price", DataType::Decimal { precision: 18, scale: -2 }, true),
        Field::new(
            "tags",
            DataType::array_of(Field::new("item", DataType::Utf8, true)),
            true,
        ),
        Field::new(
            "meta",
            DataType::Struct(vec![
                Field::new("seen", DataType::Timestamp, true),
                Field::new(
                    "scores",
                    DataType::array_of(Field::new("item", DataType::Float32, false)),
                    false,
                ),
            ]),
            true,
        ),
    ])
    .unwrap();

    let arrow = schema.to_arrow_schema();
    assert!(!arrow.field(0).is_nullable());
    assert_eq!(arrow.field(1).data_type(), &ArrowDataType::Decimal128(18, -2));
    assert_eq!(Schema::from_arrow_schema(&arrow).unwrap(), schema);
}

#[test]
fn temporal_types_use_days_and_microseconds() {
    assert_eq!(DataType::Date.to_arrow_data_type(), ArrowDataType::Date32);
    assert_eq!(
        DataType::Timestamp.to_arrow_data_type(),
        ArrowDataType::Timestamp(TimeUnit::Microsecond, None)
    );
    let millis = ArrowDataType::Timestamp(TimeUnit::Millisecond, None);
    assert!(matches!(
        DataType::from_arrow_data_type(&millis).unwrap_err(),
        ExchangeError::Format(_)
    ));
}

#[test]
fn unsupported_arrow_types_are_rejected() {
    let schema = ArrowSchema::new(vec![ArrowField::new("x", ArrowDataType::LargeUtf8, true)]);
    assert!(matches!(
        Schema::from_arrow_schema(&schema).unwrap_err(),
        ExchangeError::Format(_)
    ));
}

#[test]
fn empty_arrow_schema_is_rejected() {
    let schema = ArrowSchema::new(Vec::<ArrowField>::new());
    assert!(Schema::from_arrow_schema(&schema).is_err());
}

#[test]
fn runaway_nesting_is_rejected() {
    let mut data_type = ArrowDataType::Int32;
    for _ in 0..=MAX_NESTING_DEPTH + 1 {
        data_type = ArrowDataType::List(Arc::new(ArrowField::new("a", data_type, true)));
    }
    assert!(matches!(
        DataType::from_arrow_data_type(&data_type).unwrap_err(),
        ExchangeError::Format(_)
    ));
}
