use thiserror::Error;

/// Result type for realtime operations.
pub type Result<T> = std::result::Result<T, RealtimeError>;

/// Errors produced by the streaming-model adapter.
#[derive(Debug, Clone, Error)]
pub enum RealtimeError {
    /// Transport-level failure (connect, send, receive).
    #[error("connection error: {0}")]
    Connection(String),

    /// The peer sent something we could not make sense of.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The stream or handler is already closed.
    #[error("stream closed")]
    Closed,
}

impl RealtimeError {
    /// Create a connection error.
    pub fn connection(detail: impl Into<String>) -> Self {
        Self::Connection(detail.into())
    }

    /// Create a protocol error.
    pub fn protocol(detail: impl Into<String>) -> Self {
        Self::Protocol(detail.into())
    }
}
