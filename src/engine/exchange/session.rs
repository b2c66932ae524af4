use std::fmt;
use std::net::Shutdown;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use tracing::{debug, info, warn};

use super::error_slot::ErrorSlot;
use super::metrics::SessionMetrics;
use super::reader::ExchangeReader;
use super::state::StreamState;
use super::stream::{ExchangeStream, shutdown_quietly};
use super::writer::ExchangeWriter;
use crate::engine::codec::{Compression, RowBatcher};
use crate::engine::core::batch::ColumnarBatch;
use crate::engine::core::memory::{BufferAllocator, BufferArena, MemoryBackend};
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::types::{Row, Schema};
use crate::shared::config::ExchangeSettings;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// How long finishing waits for the writer thread before leaving it detached.
/// Only a row source that never yields keeps it running past the release.
const WRITER_JOIN_TIMEOUT: Duration = Duration::from_millis(500);

/// What a [`CancelHandle`] can do to a session without knowing its stream type.
trait SessionControl: Send + Sync {
    fn cancel(&self);
    fn is_cancelled(&self) -> bool;
    fn release(&self) -> bool;
}

/// State shared by the session, its writer thread and cancel handles.
struct SessionShared<S: ExchangeStream> {
    id: u64,
    stream: S,
    writer_arena: Option<Arc<BufferArena>>,
    reader_arena: Option<Arc<BufferArena>>,
    cancelled: Arc<AtomicBool>,
    released: AtomicBool,
}

impl<S: ExchangeStream> SessionShared<S> {
    fn allocator(arena: &Option<Arc<BufferArena>>) -> BufferAllocator {
        match arena {
            Some(arena) => BufferAllocator::arena(Arc::clone(arena)),
            None => BufferAllocator::heap(),
        }
    }
}

impl<S: ExchangeStream> SessionControl for SessionShared<S> {
    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            debug!(target: "batch_exchange::session", session = self.id, "Cancel requested");
        }
        self.release();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Shuts the socket down in both directions and closes both arenas, once.
    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }

        if let Err(e) = shutdown_quietly(&self.stream, Shutdown::Both) {
            warn!(
                target: "batch_exchange::session",
                session = self.id,
                error = %e,
                "Socket shutdown failed"
            );
        }
        for arena in [&self.writer_arena, &self.reader_arena].into_iter().flatten() {
            arena.close();
        }

        info!(target: "batch_exchange::session", session = self.id, "Session released");
        true
    }
}

/// Cancels a running session from any thread.
///
/// Cancelling shuts the socket down, which unblocks the writer thread and a
/// reader waiting on the worker. Repeated calls are no-ops.
#[derive(Clone)]
pub struct CancelHandle {
    control: Arc<dyn SessionControl>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.control.is_cancelled()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

struct WriterJob<S, I> {
    session: u64,
    stream: S,
    schema: Arc<Schema>,
    batches: RowBatcher<I>,
    compression: Compression,
    cancelled: Arc<AtomicBool>,
    error_slot: Arc<ErrorSlot>,
    metrics: Arc<SessionMetrics>,
}

impl<S, I> WriterJob<S, I>
where
    S: ExchangeStream,
    I: Iterator<Item = Result<Row>>,
{
    fn run(self) {
        let WriterJob {
            session,
            stream,
            schema,
            batches,
            compression,
            cancelled,
            error_slot,
            metrics,
        } = self;

        let mut writer = ExchangeWriter::new(stream, compression).with_metrics(metrics);
        let outcome = Self::drain(&mut writer, &schema, batches);

        match outcome {
            Ok(()) => {
                debug!(target: "batch_exchange::writer", session, "Writer finished");
            }
            Err(err) => {
                if cancelled.load(Ordering::Acquire) {
                    debug!(
                        target: "batch_exchange::writer",
                        session,
                        error = %err,
                        "Writer stopped by cancel"
                    );
                } else {
                    warn!(target: "batch_exchange::writer", session, error = %err, "Writer failed");
                }
                error_slot.set(err);
                // The worker sees end of input and stops, which unblocks our reader.
                let _ = shutdown_quietly(writer.get_ref(), Shutdown::Write);
            }
        }
    }

    fn drain(
        writer: &mut ExchangeWriter<S>,
        schema: &Schema,
        batches: RowBatcher<I>,
    ) -> Result<()> {
        writer.start(schema)?;
        for batch in batches {
            let mut batch = batch?;
            let sent = writer.write_batch(&batch);
            batch.close();
            sent?;
        }
        writer.finish()
    }
}

/// One executor-to-worker exchange.
///
/// Rows are batched and streamed to the worker on a dedicated writer thread while
/// the caller pulls the worker's result batches. The schema the worker announces
/// is available from [`WorkerSession::schema`] once the first batch (or the end)
/// has been read.
pub struct WorkerSession<S: ExchangeStream> {
    shared: Arc<SessionShared<S>>,
    reader: ExchangeReader<S>,
    writer: Option<JoinHandle<()>>,
    // Disconnects when the writer thread exits.
    writer_exited: Receiver<()>,
    metrics: Arc<SessionMetrics>,
    done: bool,
}

impl<S: ExchangeStream> WorkerSession<S> {
    /// Connects the row source to the worker behind `stream` and starts the writer thread.
    pub fn start<I>(
        stream: S,
        schema: Arc<Schema>,
        rows: I,
        settings: &ExchangeSettings,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = Result<Row>>,
        I::IntoIter: Send + 'static,
    {
        settings.validate()?;
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);

        let (writer_arena, reader_arena) = match settings.memory_backend {
            MemoryBackend::Heap => (None, None),
            MemoryBackend::Arena => (
                Some(BufferArena::new(
                    format!("session-{id}-writer"),
                    settings.arena_limit_bytes,
                )),
                Some(BufferArena::new(
                    format!("session-{id}-reader"),
                    settings.arena_limit_bytes,
                )),
            ),
        };

        let reader_stream = stream.try_clone_stream()?;
        let writer_stream = stream.try_clone_stream()?;
        let peer = stream.describe();

        let shared = Arc::new(SessionShared {
            id,
            stream,
            writer_arena,
            reader_arena,
            cancelled: Arc::new(AtomicBool::new(false)),
            released: AtomicBool::new(false),
        });

        let error_slot = Arc::new(ErrorSlot::new());
        let metrics = SessionMetrics::new();

        let reader_allocator = SessionShared::<S>::allocator(&shared.reader_arena);
        let reader = ExchangeReader::new(reader_stream, reader_allocator)
            .with_error_slot(Arc::clone(&error_slot))
            .with_metrics(Arc::clone(&metrics));

        let batches = RowBatcher::new(
            rows.into_iter(),
            Arc::clone(&schema),
            settings.batch_size,
            SessionShared::<S>::allocator(&shared.writer_arena),
        )
        .with_initial_capacity(settings.initial_capacity)
        .with_cancel(Arc::clone(&shared.cancelled));

        let job = WriterJob {
            session: id,
            stream: writer_stream,
            schema,
            batches,
            compression: settings.compression,
            cancelled: Arc::clone(&shared.cancelled),
            error_slot,
            metrics: Arc::clone(&metrics),
        };

        let (exit_tx, writer_exited) = channel::bounded::<()>(0);
        let handle = thread::Builder::new()
            .name(format!("exchange-writer-{id}"))
            .spawn(move || {
                let _exit = exit_tx;
                job.run();
            });
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                shared.release();
                return Err(ExchangeError::Io(e));
            }
        };

        info!(
            target: "batch_exchange::session",
            session = id,
            peer = %peer,
            batch_size = settings.batch_size,
            backend = ?settings.memory_backend,
            compression = %settings.compression,
            "Session started"
        );

        Ok(Self {
            shared,
            reader,
            writer: Some(handle),
            writer_exited,
            metrics,
            done: false,
        })
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn state(&self) -> StreamState {
        self.reader.state()
    }

    /// Schema of the worker's output, once announced.
    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.reader.schema()
    }

    pub fn metrics(&self) -> &Arc<SessionMetrics> {
        &self.metrics
    }

    pub fn writer_arena(&self) -> Option<&Arc<BufferArena>> {
        self.shared.writer_arena.as_ref()
    }

    pub fn reader_arena(&self) -> Option<&Arc<BufferArena>> {
        self.shared.reader_arena.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.shared.released.load(Ordering::Acquire)
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        let control: Arc<dyn SessionControl> = self.shared.clone();
        CancelHandle { control }
    }

    /// Next result batch from the worker, `Ok(None)` once the worker finished.
    ///
    /// Any error ends the session: resources are released before it is returned
    /// and later calls yield `Ok(None)`.
    pub fn next_batch(&mut self) -> Result<Option<ColumnarBatch>> {
        if self.done {
            return Ok(None);
        }
        if self.shared.is_cancelled() {
            self.done = true;
            self.finish();
            return Err(ExchangeError::Cancelled);
        }

        match self.reader.read() {
            Ok(Some(batch)) => Ok(Some(batch)),
            Ok(None) => {
                self.done = true;
                self.finish();
                Ok(None)
            }
            Err(err) => {
                self.done = true;
                let err = if self.shared.is_cancelled() {
                    ExchangeError::Cancelled
                } else {
                    err
                };
                self.finish();
                Err(err)
            }
        }
    }

    /// Stops the writer and releases the session. Returns promptly even when the
    /// row source is blocked; the writer thread is then left to exit on its own.
    pub fn cancel(&mut self) {
        self.shared.cancel();
        self.done = true;
        self.finish();
    }

    /// Releases the session. Safe to call more than once.
    pub fn close(&mut self) {
        self.done = true;
        self.finish();
    }

    fn finish(&mut self) {
        self.shared.release();
        self.reader.close();
        if let Some(handle) = self.writer.take() {
            match self.writer_exited.recv_timeout(WRITER_JOIN_TIMEOUT) {
                Err(RecvTimeoutError::Timeout) => {
                    debug!(
                        target: "batch_exchange::session",
                        session = self.shared.id,
                        "Writer still waiting on the row source, detached"
                    );
                }
                _ => {
                    if handle.join().is_err() {
                        warn!(
                            target: "batch_exchange::session",
                            session = self.shared.id,
                            "Writer thread panicked"
                        );
                    }
                }
            }
        }
        debug!(
            target: "batch_exchange::session",
            session = self.shared.id,
            batches_sent = self.metrics.batches_sent(),
            batches_received = self.metrics.batches_received(),
            "Session finished"
        );
    }
}

impl<S: ExchangeStream> fmt::Debug for WorkerSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerSession")
            .field("id", &self.shared.id)
            .field("state", &self.state())
            .field("released", &self.is_released())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl<S: ExchangeStream> Iterator for WorkerSession<S> {
    type Item = Result<ColumnarBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch().transpose()
    }
}

impl<S: ExchangeStream> std::iter::FusedIterator for WorkerSession<S> {}

impl<S: ExchangeStream> Drop for WorkerSession<S> {
    fn drop(&mut self) {
        if self.writer.is_some() || !self.is_released() {
            self.finish();
        }
    }
}
