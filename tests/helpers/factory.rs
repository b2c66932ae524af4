use std::sync::Arc;

pub use super::factories::{BatchFactory, RowFactory, SchemaFactory};
use crate::engine::types::Schema;

pub struct Factory;

impl Factory {
    /// Schema covering every supported type.
    pub fn schema() -> SchemaFactory {
        SchemaFactory::all_types()
    }

    pub fn empty_schema() -> SchemaFactory {
        SchemaFactory::new()
    }

    pub fn rows(schema: Arc<Schema>) -> RowFactory {
        RowFactory::new(schema)
    }

    pub fn batch(schema: Arc<Schema>) -> BatchFactory {
        BatchFactory::new(schema)
    }
}
