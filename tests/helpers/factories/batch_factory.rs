use std::sync::Arc;

use crate::engine::codec::rows_to_batch;
use crate::engine::core::batch::ColumnarBatch;
use crate::engine::core::memory::BufferAllocator;
use crate::engine::types::{Row, Schema};

pub struct BatchFactory {
    schema: Arc<Schema>,
    rows: Vec<Row>,
    allocator: BufferAllocator,
}

impl BatchFactory {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            allocator: BufferAllocator::heap(),
        }
    }

    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_allocator(mut self, allocator: BufferAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn create(self) -> ColumnarBatch {
        let expected = self.rows.len();
        let mut rows = self.rows.into_iter().map(Ok);
        let batch = rows_to_batch(&mut rows, &self.schema, 0, &self.allocator, 16)
            .expect("rows conform to schema")
            .unwrap_or_else(|| {
                ColumnarBatch::new(self.schema, 0, &self.allocator).expect("empty batch allocates")
            });
        assert_eq!(batch.num_rows(), expected, "factory batch lost rows");
        batch
    }
}
