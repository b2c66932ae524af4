use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use super::reader::ExchangeReader;
use super::stream::ExchangeStream;
use super::writer::ExchangeWriter;
use crate::engine::codec::{Compression, TimingData};
use crate::engine::core::batch::ColumnarBatch;
use crate::engine::core::memory::BufferAllocator;
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::types::Schema;

/// Per-batch computation run by an [`EchoWorker`].
pub trait BatchTransform: Send {
    /// Schema of the batches produced for `input`.
    fn output_schema(&self, input: &Schema) -> Result<Schema>;

    fn transform(&mut self, batch: ColumnarBatch, output: &Arc<Schema>) -> Result<ColumnarBatch>;
}

/// Sends every batch back unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityTransform;

impl BatchTransform for IdentityTransform {
    fn output_schema(&self, input: &Schema) -> Result<Schema> {
        Ok(input.clone())
    }

    fn transform(&mut self, batch: ColumnarBatch, _output: &Arc<Schema>) -> Result<ColumnarBatch> {
        Ok(batch)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub batches: u64,
    pub rows: u64,
}

/// Worker side of the exchange: reads the executor's stream, transforms each
/// batch and writes the results back, followed by timing data and end-of-data.
///
/// A failing transform is reported to the executor as a peer exception.
pub struct EchoWorker<T: BatchTransform> {
    transform: T,
    compression: Compression,
    allocator: BufferAllocator,
    boot_ms: i64,
}

impl<T: BatchTransform> EchoWorker<T> {
    pub fn new(transform: T) -> Self {
        Self {
            transform,
            compression: Compression::None,
            allocator: BufferAllocator::heap(),
            boot_ms: epoch_millis(),
        }
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_allocator(mut self, allocator: BufferAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    /// Serves one connection to completion.
    ///
    /// Input errors end the exchange without a reply; the stream is dropped so
    /// the executor sees it close.
    pub fn serve<S: ExchangeStream>(&mut self, stream: S) -> Result<WorkerReport> {
        let init_ms = epoch_millis();
        let peer = stream.describe();
        let mut reader = ExchangeReader::new(stream.try_clone_stream()?, self.allocator.clone());
        let mut writer = ExchangeWriter::new(stream, self.compression);

        writer.begin()?;
        let mut next = reader.read()?;

        let input_schema = reader
            .schema()
            .cloned()
            .ok_or_else(|| ExchangeError::protocol("input ended without a schema"))?;
        let output_schema = match self.transform.output_schema(&input_schema) {
            Ok(schema) => Arc::new(schema),
            Err(err) => return Err(Self::report(&mut writer, &mut reader, err)),
        };
        writer.write_schema(&output_schema)?;

        let mut report = WorkerReport::default();
        while let Some(batch) = next.take() {
            let mut output = match self.transform.transform(batch, &output_schema) {
                Ok(output) => output,
                Err(err) => return Err(Self::report(&mut writer, &mut reader, err)),
            };
            writer.write_batch(&output)?;
            report.batches += 1;
            report.rows += output.num_rows() as u64;
            output.close();

            next = reader.read()?;
        }

        writer.write_timing(TimingData {
            boot_ms: self.boot_ms,
            init_ms,
            finish_ms: epoch_millis(),
        })?;
        writer.finish()?;

        info!(
            target: "batch_exchange::worker",
            peer = %peer,
            batches = report.batches,
            rows = report.rows,
            "Exchange served"
        );
        Ok(report)
    }

    /// Sends the failure to the executor and returns it as a peer error.
    ///
    /// Remaining input is read and dropped afterwards so the executor's writer
    /// is not cut off before it has seen the exception.
    fn report<W: Write, R: Read>(
        writer: &mut ExchangeWriter<W>,
        reader: &mut ExchangeReader<R>,
        err: ExchangeError,
    ) -> ExchangeError {
        let message = match err {
            ExchangeError::PeerComputation(message) => message,
            other => other.to_string(),
        };
        warn!(target: "batch_exchange::worker", "Transform failed: {}", message);
        if let Err(e) = writer.write_exception(&message) {
            debug!(target: "batch_exchange::worker", error = %e, "Could not report failure");
        }
        while let Ok(Some(mut batch)) = reader.read() {
            batch.close();
        }
        ExchangeError::PeerComputation(message)
    }
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
