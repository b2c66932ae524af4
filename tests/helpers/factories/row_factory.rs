use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::engine::types::{DataType, Row, ScalarValue, Schema};

/// Random rows conforming to a schema. Non-nullable fields never get nulls.
pub struct RowFactory {
    schema: Arc<Schema>,
    null_ratio: f64,
    seed: u64,
}

impl RowFactory {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            null_ratio: 0.2,
            seed: 42,
        }
    }

    pub fn with_null_ratio(mut self, ratio: f64) -> Self {
        self.null_ratio = ratio;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn create(self) -> Row {
        self.create_list(1).remove(0)
    }

    pub fn create_list(self, count: usize) -> Vec<Row> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        (0..count)
            .map(|_| {
                self.schema
                    .fields()
                    .iter()
                    .map(|f| random_value(&f.data_type, f.nullable, self.null_ratio, &mut rng))
                    .collect::<Vec<_>>()
                    .into()
            })
            .collect()
    }
}

pub fn random_value(
    data_type: &DataType,
    nullable: bool,
    null_ratio: f64,
    rng: &mut StdRng,
) -> ScalarValue {
    if nullable && rng.gen_bool(null_ratio) {
        return ScalarValue::Null;
    }
    match data_type {
        DataType::Boolean => ScalarValue::Boolean(rng.r#gen()),
        DataType::Int8 => ScalarValue::Int8(rng.r#gen()),
        DataType::Int16 => ScalarValue::Int16(rng.r#gen()),
        DataType::Int32 => ScalarValue::Int32(rng.r#gen()),
        DataType::Int64 => ScalarValue::Int64(rng.r#gen()),
        DataType::Float32 => ScalarValue::Float32(rng.gen_range(-1e6..1e6)),
        DataType::Float64 => ScalarValue::Float64(rng.gen_range(-1e12..1e12)),
        DataType::Decimal { .. } => ScalarValue::Decimal(rng.r#gen::<i64>() as i128 * 1_000),
        DataType::Utf8 => {
            let len = rng.gen_range(0..12);
            let text: String = (0..len)
                .map(|_| ['a', 'z', 'é', '中', ' ', '7'][rng.gen_range(0..6)])
                .collect();
            ScalarValue::Utf8(text)
        }
        DataType::Binary => {
            let len = rng.gen_range(0..16);
            ScalarValue::Binary((0..len).map(|_| rng.r#gen()).collect())
        }
        DataType::Date => ScalarValue::Date(rng.gen_range(-10_000..40_000)),
        DataType::Timestamp => ScalarValue::Timestamp(rng.gen_range(0..2_000_000_000_000_000)),
        DataType::Array(element) => {
            let len = rng.gen_range(0..5);
            ScalarValue::Array(
                (0..len)
                    .map(|_| random_value(&element.data_type, element.nullable, null_ratio, rng))
                    .collect(),
            )
        }
        DataType::Struct(fields) => ScalarValue::Struct(
            fields
                .iter()
                .map(|f| random_value(&f.data_type, f.nullable, null_ratio, rng))
                .collect(),
        ),
    }
}
