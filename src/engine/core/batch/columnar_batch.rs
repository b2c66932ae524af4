use std::sync::Arc;

use tracing::trace;

use super::row_view::RowView;
use crate::engine::core::column::ColumnVector;
use crate::engine::core::memory::BufferAllocator;
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::types::{Row, Schema};

/// An ordered set of column vectors sharing one row count.
#[derive(Debug)]
pub struct ColumnarBatch {
    schema: Arc<Schema>,
    columns: Vec<ColumnVector>,
    num_rows: usize,
    closed: bool,
}

impl ColumnarBatch {
    /// Allocates one empty vector per schema field.
    pub fn new(schema: Arc<Schema>, capacity: usize, allocator: &BufferAllocator) -> Result<Self> {
        let columns = schema
            .fields()
            .iter()
            .map(|field| ColumnVector::new(field.data_type.clone(), capacity, allocator))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            schema,
            columns,
            num_rows: 0,
            closed: false,
        })
    }

    /// Wraps already filled vectors. Their types must follow the schema.
    pub fn from_columns(
        schema: Arc<Schema>,
        columns: Vec<ColumnVector>,
        num_rows: usize,
    ) -> Result<Self> {
        if columns.len() != schema.field_count() {
            return Err(ExchangeError::TypeMismatch {
                expected: format!("{} columns", schema.field_count()),
                actual: format!("{} columns", columns.len()),
            });
        }
        for (field, column) in schema.fields().iter().zip(&columns) {
            if &field.data_type != column.data_type() {
                return Err(ExchangeError::TypeMismatch {
                    expected: field.data_type.to_string(),
                    actual: column.data_type().to_string(),
                });
            }
        }
        let mut batch = Self {
            schema,
            columns,
            num_rows: 0,
            closed: false,
        };
        batch.set_num_rows(num_rows)?;
        Ok(batch)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn columns(&self) -> &[ColumnVector] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> Result<&ColumnVector> {
        self.columns.get(idx).ok_or(ExchangeError::OutOfBounds {
            index: idx,
            len: self.columns.len(),
        })
    }

    pub fn column_mut(&mut self, idx: usize) -> Result<&mut ColumnVector> {
        let len = self.columns.len();
        self.columns
            .get_mut(idx)
            .ok_or(ExchangeError::OutOfBounds { index: idx, len })
    }

    pub fn column_by_name(&self, name: &str) -> Option<&ColumnVector> {
        self.schema
            .index_of(name)
            .and_then(|idx| self.columns.get(idx))
    }

    /// Sets the row count and seals every vector to it.
    ///
    /// `n` must fit every vector's capacity. Vectors shorter than `n` are padded
    /// with nulls, longer ones truncated; offsets are validated afterwards.
    pub fn set_num_rows(&mut self, n: usize) -> Result<()> {
        if self.closed {
            return Err(ExchangeError::Capacity("batch is closed".into()));
        }
        if let Some(column) = self.columns.iter().find(|c| c.capacity() < n) {
            return Err(ExchangeError::Capacity(format!(
                "row count {n} exceeds capacity {} of a {} column",
                column.capacity(),
                column.data_type()
            )));
        }
        for column in &mut self.columns {
            column.set_len(n)?;
        }
        self.num_rows = n;
        trace!(target: "batch_exchange::batch", rows = n, "Batch sealed");
        Ok(())
    }

    pub fn row(&self, idx: usize) -> Result<RowView<'_>> {
        if idx >= self.num_rows {
            return Err(ExchangeError::OutOfBounds {
                index: idx,
                len: self.num_rows,
            });
        }
        Ok(RowView::new(self, idx))
    }

    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> + '_ {
        (0..self.num_rows).map(move |idx| RowView::new(self, idx))
    }

    /// Copies every row out as an owned [`Row`].
    pub fn to_rows(&self) -> Result<Vec<Row>> {
        self.rows().map(|row| row.to_row()).collect()
    }

    /// Closes every vector. Later calls are no-ops.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        for column in &mut self.columns {
            column.close();
        }
        self.num_rows = 0;
        self.closed = true;
    }
}
