use std::io;
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::Receiver;

use crate::engine::codec::Compression;
use crate::engine::core::memory::MemoryBackend;
use crate::engine::errors::{ExchangeError, Result};
use crate::engine::exchange::{BatchTransform, EchoWorker, WorkerReport};
use crate::engine::types::{DataType, Row, ScalarValue, Schema};
use crate::shared::config::ExchangeSettings;
use crate::test_helpers::factory::Factory;

/// Connected executor/worker socket pair.
pub fn socket_pair() -> (UnixStream, UnixStream) {
    UnixStream::pair().expect("unix socket pair")
}

/// Runs an [`EchoWorker`] on its own thread over `stream`.
pub fn spawn_worker<T>(stream: UnixStream, transform: T) -> JoinHandle<Result<WorkerReport>>
where
    T: BatchTransform + 'static,
{
    spawn_worker_with(stream, transform, Compression::None)
}

pub fn spawn_worker_with<T>(
    stream: UnixStream,
    transform: T,
    compression: Compression,
) -> JoinHandle<Result<WorkerReport>>
where
    T: BatchTransform + 'static,
{
    thread::Builder::new()
        .name("test-echo-worker".into())
        .spawn(move || {
            EchoWorker::new(transform)
                .with_compression(compression)
                .serve(stream)
        })
        .expect("spawn worker thread")
}

pub fn settings(batch_size: i64, backend: MemoryBackend) -> ExchangeSettings {
    ExchangeSettings {
        batch_size,
        initial_capacity: 2,
        memory_backend: backend,
        ..ExchangeSettings::default()
    }
}

/// `id: Int64 not null, name: Utf8` schema used by the session tests.
pub fn id_schema() -> Arc<Schema> {
    Factory::empty_schema()
        .with_required("id", DataType::Int64)
        .with("name", DataType::Utf8)
        .create()
}

pub fn id_row(i: i64) -> Row {
    Row::new(vec![
        ScalarValue::Int64(i),
        if i % 3 == 0 {
            ScalarValue::Null
        } else {
            ScalarValue::Utf8(format!("row-{i}"))
        },
    ])
}

pub fn id_rows(count: i64) -> Vec<Result<Row>> {
    (0..count).map(|i| Ok(id_row(i))).collect()
}

/// Yields `rows` ready rows, then blocks until `gate` fires (or is dropped) and
/// fails with `message`.
pub fn gated_failure(
    rows: i64,
    gate: Receiver<()>,
    message: &'static str,
) -> impl Iterator<Item = Result<Row>> + Send + 'static {
    let mut next = 0;
    let mut failed = false;
    std::iter::from_fn(move || {
        if failed {
            return None;
        }
        if next < rows {
            next += 1;
            return Some(Ok(id_row(next - 1)));
        }
        let _ = gate.recv();
        failed = true;
        Some(Err(ExchangeError::Io(io::Error::other(message))))
    })
}

/// Yields `rows` rows, then fails with `message` straight away.
pub fn failing_after(
    rows: i64,
    message: &'static str,
) -> impl Iterator<Item = Result<Row>> + Send + 'static {
    (0..=rows).map(move |i| {
        if i < rows {
            Ok(id_row(i))
        } else {
            Err(ExchangeError::Io(io::Error::other(message)))
        }
    })
}

/// Endless rows; stops only when the session cancels or fails.
pub fn endless_rows() -> impl Iterator<Item = Result<Row>> + Send + 'static {
    (0..).map(|i| Ok(id_row(i)))
}
