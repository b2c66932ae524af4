use super::columnar_batch::ColumnarBatch;
use crate::engine::core::column::{ArrayView, NativeType, StructView};
use crate::engine::errors::Result;
use crate::engine::types::{Row, ScalarValue};

/// A `(batch, row)` pair that reads straight from the batch's vectors.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    batch: &'a ColumnarBatch,
    row: usize,
}

impl<'a> RowView<'a> {
    pub(crate) fn new(batch: &'a ColumnarBatch, row: usize) -> Self {
        Self { batch, row }
    }

    pub fn index(&self) -> usize {
        self.row
    }

    pub fn is_null(&self, col: usize) -> Result<bool> {
        self.batch.column(col)?.is_null(self.row)
    }

    pub fn get<T: NativeType>(&self, col: usize) -> Result<Option<T>> {
        self.batch.column(col)?.get(self.row)
    }

    pub fn get_str(&self, col: usize) -> Result<Option<&'a str>> {
        self.batch.column(col)?.get_str(self.row)
    }

    pub fn get_bytes(&self, col: usize) -> Result<Option<&'a [u8]>> {
        self.batch.column(col)?.get_bytes(self.row)
    }

    pub fn get_array(&self, col: usize) -> Result<Option<ArrayView<'a>>> {
        self.batch.column(col)?.get_array(self.row)
    }

    pub fn get_struct(&self, col: usize) -> Result<Option<StructView<'a>>> {
        self.batch.column(col)?.get_struct(self.row)
    }

    pub fn get_scalar(&self, col: usize) -> Result<ScalarValue> {
        self.batch.column(col)?.get_scalar(self.row)
    }

    pub fn to_row(&self) -> Result<Row> {
        (0..self.batch.num_columns())
            .map(|col| self.get_scalar(col))
            .collect::<Result<Vec<_>>>()
            .map(Row::new)
    }
}
