//! Executor/worker exchange over a duplex byte stream.
//!
//! The executor side is [`WorkerSession`]: a writer thread streams row batches to
//! the worker while the caller reads result batches back through an
//! [`ExchangeReader`]. [`EchoWorker`] is the reference worker side.

mod echo;
mod error_slot;
mod metrics;
mod reader;
mod session;
mod state;
mod stream;
mod writer;

#[cfg(test)]
mod state_test;
#[cfg(test)]
mod writer_test;

pub use echo::{BatchTransform, EchoWorker, IdentityTransform, WorkerReport};
pub use error_slot::ErrorSlot;
pub use metrics::SessionMetrics;
pub use reader::ExchangeReader;
pub use session::{CancelHandle, WorkerSession};
pub use state::StreamState;
pub use stream::ExchangeStream;
pub use writer::ExchangeWriter;
