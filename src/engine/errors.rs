use std::io;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::engine::types::TypeTag;

pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Errors raised by the columnar vectors, the batch codec and the exchange session.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Capacity error: {0}")]
    Capacity(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Index {index} out of bounds (len={len})")]
    OutOfBounds { index: usize, len: usize },

    #[error("Format error: {0}")]
    Format(String),

    #[error("Worker computation failed: {0}")]
    PeerComputation(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Session cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ExchangeError {
    pub fn type_mismatch(expected: impl ToString, actual: TypeTag) -> Self {
        ExchangeError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn format(msg: impl Into<String>) -> Self {
        ExchangeError::Format(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        ExchangeError::ProtocolViolation(msg.into())
    }

    /// True when the worker's own logic failed, as opposed to the wire protocol.
    pub fn is_peer_failure(&self) -> bool {
        matches!(self, ExchangeError::PeerComputation(_))
    }

    /// True when the byte stream itself broke or carried malformed content.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            ExchangeError::Format(_) | ExchangeError::ProtocolViolation(_) | ExchangeError::Io(_)
        )
    }

    pub fn log_error(&self) {
        match self {
            ExchangeError::PeerComputation(msg) => {
                error!(target: "batch_exchange::session", "Worker reported failure: {}", msg);
            }
            ExchangeError::Format(msg) | ExchangeError::ProtocolViolation(msg) => {
                error!(target: "batch_exchange::session", "Wire protocol broke: {}", msg);
            }
            ExchangeError::Cancelled => {
                debug!(target: "batch_exchange::session", "Session cancelled");
            }
            other => {
                warn!(target: "batch_exchange::session", "Session error: {}", other);
                debug!("Session error details: {:?}", other);
            }
        }
    }
}

impl From<config::ConfigError> for ExchangeError {
    fn from(err: config::ConfigError) -> Self {
        ExchangeError::Config(err.to_string())
    }
}

impl From<arrow_schema::ArrowError> for ExchangeError {
    fn from(err: arrow_schema::ArrowError) -> Self {
        ExchangeError::Format(err.to_string())
    }
}
