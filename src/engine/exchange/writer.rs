use std::io::Write;
use std::sync::Arc;

use tracing::debug;

use super::metrics::SessionMetrics;
use super::state::StreamState;
use crate::engine::codec::{Compression, Frame, FrameWriter, TimingData, encode_batch};
use crate::engine::core::batch::ColumnarBatch;
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::types::Schema;

/// Writes one exchange stream: start marker, schema once, batches, end-of-data.
pub struct ExchangeWriter<W: Write> {
    frames: FrameWriter<W>,
    compression: Compression,
    state: StreamState,
    metrics: Arc<SessionMetrics>,
}

impl<W: Write> ExchangeWriter<W> {
    pub fn new(inner: W, compression: Compression) -> Self {
        Self {
            frames: FrameWriter::new(inner),
            compression,
            state: StreamState::Idle,
            metrics: SessionMetrics::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn get_ref(&self) -> &W {
        self.frames.get_ref()
    }

    /// Writes the start-of-stream marker.
    pub fn begin(&mut self) -> Result<()> {
        self.require_state(StreamState::Idle, "start-of-stream")?;
        self.write(&Frame::StartOfStream)?;
        self.state = StreamState::StreamingSchema;
        Ok(())
    }

    pub fn write_schema(&mut self, schema: &Schema) -> Result<()> {
        self.require_state(StreamState::StreamingSchema, "schema")?;
        self.write(&Frame::Schema(schema.clone()))?;
        self.state = StreamState::StreamingBatches;
        debug!(
            target: "batch_exchange::writer",
            fields = schema.field_count(),
            "Schema sent"
        );
        Ok(())
    }

    /// Start marker followed by the schema.
    pub fn start(&mut self, schema: &Schema) -> Result<()> {
        self.begin()?;
        self.write_schema(schema)
    }

    pub fn write_batch(&mut self, batch: &ColumnarBatch) -> Result<()> {
        self.require_state(StreamState::StreamingBatches, "batch")?;
        let body = encode_batch(batch, self.compression)?;
        let bytes = body.len() as u64;
        self.write(&Frame::Batch(body))?;
        self.metrics.on_batch_sent(batch.num_rows() as u64, bytes);
        Ok(())
    }

    pub fn write_timing(&mut self, timing: TimingData) -> Result<()> {
        if !self.state.is_streaming() {
            return Err(self.out_of_order("timing"));
        }
        self.write(&Frame::Timing(timing))
    }

    /// Reports a computation failure to the peer. The stream is finished afterwards.
    pub fn write_exception(&mut self, message: &str) -> Result<()> {
        if self.state == StreamState::Idle {
            self.begin()?;
        }
        if !self.state.is_streaming() {
            return Err(self.out_of_order("exception"));
        }
        self.write(&Frame::PeerException(message.to_string()))?;
        self.state = StreamState::Closed;
        Ok(())
    }

    /// Writes end-of-data.
    pub fn finish(&mut self) -> Result<()> {
        self.require_state(StreamState::StreamingBatches, "end-of-data")?;
        self.write(&Frame::EndOfData)?;
        self.state = StreamState::Closed;
        debug!(
            target: "batch_exchange::writer",
            batches = self.metrics.batches_sent(),
            bytes = self.frames.bytes_written(),
            "Stream finished"
        );
        Ok(())
    }

    fn write(&mut self, frame: &Frame) -> Result<()> {
        match self.frames.write_frame(frame) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.state = StreamState::Errored;
                Err(err)
            }
        }
    }

    fn require_state(&self, state: StreamState, frame: &str) -> Result<()> {
        if self.state == state {
            Ok(())
        } else {
            Err(self.out_of_order(frame))
        }
    }

    fn out_of_order(&self, frame: &str) -> ExchangeError {
        ExchangeError::protocol(format!(
            "cannot write {frame} while writer is {}",
            self.state
        ))
    }
}
