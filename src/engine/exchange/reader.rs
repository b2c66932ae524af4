use std::io::Read;
use std::sync::Arc;

use tracing::{debug, error};

use super::error_slot::ErrorSlot;
use super::metrics::SessionMetrics;
use super::state::StreamState;
use crate::engine::codec::{Frame, FrameReader, decode_batch};
use crate::engine::core::batch::ColumnarBatch;
use crate::engine::core::memory::BufferAllocator;
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::types::Schema;

/// Reads one exchange stream and enforces its frame order.
///
/// Complete frames already on the stream are always delivered first. A failure
/// stored in the shared [`ErrorSlot`] by the writing side surfaces once the
/// stream ends or breaks, in place of the transport error it caused.
pub struct ExchangeReader<R: Read> {
    frames: FrameReader<R>,
    state: StreamState,
    schema: Option<Arc<Schema>>,
    allocator: Option<BufferAllocator>,
    error_slot: Arc<ErrorSlot>,
    metrics: Arc<SessionMetrics>,
}

impl<R: Read> ExchangeReader<R> {
    pub fn new(inner: R, allocator: BufferAllocator) -> Self {
        Self {
            frames: FrameReader::new(inner),
            state: StreamState::Idle,
            schema: None,
            allocator: Some(allocator),
            error_slot: Arc::new(ErrorSlot::new()),
            metrics: SessionMetrics::new(),
        }
    }

    pub fn with_error_slot(mut self, error_slot: Arc<ErrorSlot>) -> Self {
        self.error_slot = error_slot;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Schema announced by the peer, once received.
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    /// Next batch, `Ok(None)` at end-of-data.
    ///
    /// Timing frames are recorded and skipped. Any error moves the reader to
    /// `Errored`; reading again after end-of-data or an error is a protocol
    /// violation.
    pub fn read(&mut self) -> Result<Option<ColumnarBatch>> {
        match self.state {
            StreamState::Draining => {
                return Err(ExchangeError::protocol("read after end-of-data"));
            }
            StreamState::Closed => return Err(ExchangeError::protocol("read on a closed stream")),
            StreamState::Errored => {
                return Err(ExchangeError::protocol("read after the stream failed"));
            }
            _ => {}
        }

        loop {
            let frame = match self.frames.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    let err = self.error_slot.take().unwrap_or_else(|| {
                        ExchangeError::protocol(format!(
                            "stream ended while {} without end-of-data",
                            self.state
                        ))
                    });
                    return Err(self.fail(err));
                }
                Err(err) => {
                    let err = self.error_slot.take().unwrap_or(err);
                    return Err(self.fail(err));
                }
            };

            match (self.state, frame) {
                (StreamState::Idle, Frame::StartOfStream) => {
                    self.state = StreamState::StreamingSchema;
                }
                (StreamState::Idle, other) => {
                    return Err(self.violation(format!(
                        "{} before start-of-stream",
                        other.name()
                    )));
                }
                (_, Frame::Timing(timing)) => {
                    debug!(
                        target: "batch_exchange::reader",
                        boot_ms = timing.boot_ms,
                        init_ms = timing.init_ms,
                        finish_ms = timing.finish_ms,
                        "Worker timing"
                    );
                    self.metrics.record_timing(timing);
                }
                (_, Frame::PeerException(message)) => {
                    error!(target: "batch_exchange::reader", "Worker raised: {}", message);
                    self.state = StreamState::Errored;
                    return Err(ExchangeError::PeerComputation(message));
                }
                (StreamState::StreamingSchema, Frame::Schema(schema)) => {
                    debug!(
                        target: "batch_exchange::reader",
                        fields = schema.field_count(),
                        "Schema received"
                    );
                    self.schema = Some(Arc::new(schema));
                    self.state = StreamState::StreamingBatches;
                }
                (StreamState::StreamingBatches, Frame::Batch(body)) => {
                    return self.decode(&body).map(Some);
                }
                (StreamState::StreamingBatches, Frame::EndOfData) => {
                    self.state = StreamState::Draining;
                    self.allocator = None;
                    debug!(
                        target: "batch_exchange::reader",
                        batches = self.metrics.batches_received(),
                        bytes = self.frames.bytes_read(),
                        "End of data"
                    );
                    return Ok(None);
                }
                (StreamState::StreamingBatches, Frame::Schema(_)) => {
                    return Err(self.violation("second schema message".to_string()));
                }
                (StreamState::StreamingSchema, Frame::Batch(_)) => {
                    return Err(self.violation("batch before schema".to_string()));
                }
                (state, other) => {
                    return Err(self.violation(format!(
                        "unexpected {} while {state}",
                        other.name()
                    )));
                }
            }
        }
    }

    /// Marks the stream closed; later reads fail.
    pub fn close(&mut self) {
        if !self.state.is_terminal() {
            self.state = StreamState::Closed;
        }
        self.allocator = None;
    }

    fn decode(&mut self, body: &[u8]) -> Result<ColumnarBatch> {
        let (Some(schema), Some(allocator)) = (self.schema.as_ref(), self.allocator.as_ref())
        else {
            return Err(self.violation("batch without schema".to_string()));
        };
        match decode_batch(body, schema, allocator) {
            Ok(batch) => {
                self.metrics
                    .on_batch_received(batch.num_rows() as u64, body.len() as u64);
                Ok(batch)
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    fn violation(&mut self, message: String) -> ExchangeError {
        self.fail(ExchangeError::ProtocolViolation(message))
    }

    fn fail(&mut self, err: ExchangeError) -> ExchangeError {
        self.state = StreamState::Errored;
        self.allocator = None;
        err.log_error();
        err
    }
}
