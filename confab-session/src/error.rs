use confab_core::CoreError;
use confab_realtime::RealtimeError;
use confab_sentiment::AnalyzerError;
use thiserror::Error;

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Errors surfaced by the session orchestrator.
///
/// `Clone` so the idempotent stop guard can hand every caller the same
/// error value.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The caller does not own the meeting (or it does not exist — the
    /// store does not distinguish).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("a session for this meeting is already active: {0}")]
    AlreadyActive(String),

    #[error("room error: {0}")]
    Room(String),

    #[error("model stream error: {0}")]
    Model(String),

    #[error("recording error: {0}")]
    Recording(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<CoreError> for SessionError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Unauthorized(detail) | CoreError::NotFound(detail) => {
                Self::Unauthorized(detail)
            }
            CoreError::MissingConfig(detail) | CoreError::InvalidConfig(detail) => {
                Self::Config(detail)
            }
            CoreError::Store(detail) => Self::Storage(detail),
        }
    }
}

impl From<RealtimeError> for SessionError {
    fn from(err: RealtimeError) -> Self {
        Self::Model(err.to_string())
    }
}

impl From<AnalyzerError> for SessionError {
    fn from(err: AnalyzerError) -> Self {
        Self::Config(err.to_string())
    }
}
