use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::trace;

use crate::engine::core::batch::ColumnarBatch;
use crate::engine::core::memory::BufferAllocator;
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::types::{Row, Schema};

/// Pulls rows into a new batch until the source is exhausted or `limit` rows
/// were taken (`limit <= 0` means no limit).
///
/// Returns `Ok(None)` when the source had no rows left. Vectors start at
/// `initial_capacity` rows (never more than `limit`) and grow as rows arrive.
/// A null for a non-nullable field is a type mismatch.
pub fn rows_to_batch<I>(
    rows: &mut I,
    schema: &Arc<Schema>,
    limit: i64,
    allocator: &BufferAllocator,
    initial_capacity: usize,
) -> Result<Option<ColumnarBatch>>
where
    I: Iterator<Item = Result<Row>>,
{
    let limit = usize::try_from(limit).ok().filter(|&l| l > 0);
    let Some(first) = rows.next() else {
        return Ok(None);
    };
    let first = first?;

    let capacity = limit.map_or(initial_capacity, |l| l.min(initial_capacity)).max(1);
    let mut batch = ColumnarBatch::new(Arc::clone(schema), capacity, allocator)?;
    let mut count = 0usize;
    let mut next = Some(first);
    while let Some(row) = next.take() {
        append_row(&mut batch, &row, count)?;
        count += 1;
        if limit.is_some_and(|l| count >= l) {
            break;
        }
        next = rows.next().transpose()?;
    }

    batch.set_num_rows(count)?;
    trace!(target: "batch_exchange::codec", rows = count, "Rows batched");
    Ok(Some(batch))
}

fn append_row(batch: &mut ColumnarBatch, row: &Row, row_idx: usize) -> Result<()> {
    if row.len() != batch.num_columns() {
        return Err(ExchangeError::TypeMismatch {
            expected: format!("{} values", batch.num_columns()),
            actual: format!("{} values in row {row_idx}", row.len()),
        });
    }
    let schema = Arc::clone(batch.schema());
    for (idx, (value, field)) in row.values().iter().zip(schema.fields()).enumerate() {
        if !value.fits(field) {
            return Err(ExchangeError::TypeMismatch {
                expected: format!("non-null {} for '{}'", field.data_type, field.name),
                actual: format!("{value:?} in row {row_idx}"),
            });
        }
        batch.column_mut(idx)?.append_scalar(value)?;
    }
    Ok(())
}

/// Copies every row of `batch` into owned rows.
pub fn batch_to_rows(batch: &ColumnarBatch) -> Result<Vec<Row>> {
    batch.to_rows()
}

/// Turns a fallible row source into a sequence of batches of at most `limit` rows.
///
/// Stops after the first error. When a cancel flag is attached it is checked
/// before every row.
pub struct RowBatcher<I> {
    rows: I,
    schema: Arc<Schema>,
    limit: i64,
    allocator: BufferAllocator,
    initial_capacity: usize,
    cancel: Option<Arc<AtomicBool>>,
    done: bool,
}

impl<I> RowBatcher<I>
where
    I: Iterator<Item = Result<Row>>,
{
    pub fn new(rows: I, schema: Arc<Schema>, limit: i64, allocator: BufferAllocator) -> Self {
        Self {
            rows,
            schema,
            limit,
            allocator,
            initial_capacity: 1024,
            cancel: None,
            done: false,
        }
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }
}

impl<I> Iterator for RowBatcher<I>
where
    I: Iterator<Item = Result<Row>>,
{
    type Item = Result<ColumnarBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.is_cancelled() {
            self.done = true;
            return Some(Err(ExchangeError::Cancelled));
        }

        let cancel = self.cancel.clone();
        let source = &mut self.rows;
        let mut guarded = std::iter::from_fn(|| {
            if cancel
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Acquire))
            {
                return Some(Err(ExchangeError::Cancelled));
            }
            source.next()
        });

        let result = rows_to_batch(
            &mut guarded,
            &self.schema,
            self.limit,
            &self.allocator,
            self.initial_capacity,
        );
        match result {
            Ok(Some(batch)) => Some(Ok(batch)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<I> std::iter::FusedIterator for RowBatcher<I> where I: Iterator<Item = Result<Row>> {}
