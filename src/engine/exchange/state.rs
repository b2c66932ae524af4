use std::fmt;

/// Lifecycle of one direction of an exchange stream.
///
/// ```text
/// Idle -> StreamingSchema -> StreamingBatches -> Draining -> Closed
///   \____________\_________________\_______________\-> Errored
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Nothing read or written yet.
    Idle,
    /// Start marker seen; the schema message comes next.
    StreamingSchema,
    StreamingBatches,
    /// End-of-data seen; no more frames are legal.
    Draining,
    Closed,
    Errored,
}

impl StreamState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamState::Idle => "idle",
            StreamState::StreamingSchema => "streaming-schema",
            StreamState::StreamingBatches => "streaming-batches",
            StreamState::Draining => "draining",
            StreamState::Closed => "closed",
            StreamState::Errored => "errored",
        }
    }

    /// No further frames can be produced or consumed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Draining | StreamState::Closed | StreamState::Errored
        )
    }

    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            StreamState::StreamingSchema | StreamState::StreamingBatches
        )
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
