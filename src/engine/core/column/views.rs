use super::native::NativeType;
use super::vector::ColumnVector;
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::types::ScalarValue;

/// Borrowed window over the child elements of one array row.
#[derive(Debug, Clone, Copy)]
pub struct ArrayView<'a> {
    child: &'a ColumnVector,
    offset: usize,
    len: usize,
}

impl<'a> ArrayView<'a> {
    pub(crate) fn new(child: &'a ColumnVector, offset: usize, len: usize) -> Self {
        Self { child, offset, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of the first element in the child vector.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn elements(&self) -> &'a ColumnVector {
        self.child
    }

    pub fn get<T: NativeType>(&self, idx: usize) -> Result<Option<T>> {
        self.child.get(self.position(idx)?)
    }

    pub fn get_str(&self, idx: usize) -> Result<Option<&'a str>> {
        self.child.get_str(self.position(idx)?)
    }

    pub fn get_scalar(&self, idx: usize) -> Result<ScalarValue> {
        self.child.get_scalar(self.position(idx)?)
    }

    pub fn to_scalars(&self) -> Result<Vec<ScalarValue>> {
        (0..self.len).map(|idx| self.get_scalar(idx)).collect()
    }

    fn position(&self, idx: usize) -> Result<usize> {
        if idx >= self.len {
            return Err(ExchangeError::OutOfBounds {
                index: idx,
                len: self.len,
            });
        }
        Ok(self.offset + idx)
    }
}

/// Borrowed view of one struct row; field `i` reads row `row` of child `i`.
#[derive(Debug, Clone, Copy)]
pub struct StructView<'a> {
    parent: &'a ColumnVector,
    row: usize,
}

impl<'a> StructView<'a> {
    pub(crate) fn new(parent: &'a ColumnVector, row: usize) -> Self {
        Self { parent, row }
    }

    pub fn field_count(&self) -> usize {
        self.parent.children().len()
    }

    pub fn field(&self, idx: usize) -> Result<&'a ColumnVector> {
        self.parent.child(idx).ok_or(ExchangeError::OutOfBounds {
            index: idx,
            len: self.field_count(),
        })
    }

    pub fn get<T: NativeType>(&self, idx: usize) -> Result<Option<T>> {
        self.field(idx)?.get(self.row)
    }

    pub fn get_str(&self, idx: usize) -> Result<Option<&'a str>> {
        self.field(idx)?.get_str(self.row)
    }

    pub fn get_scalar(&self, idx: usize) -> Result<ScalarValue> {
        self.field(idx)?.get_scalar(self.row)
    }

    pub fn to_scalars(&self) -> Result<Vec<ScalarValue>> {
        (0..self.field_count())
            .map(|idx| self.get_scalar(idx))
            .collect()
    }
}
