use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced by the core domain layer and its collaborator stores.
///
/// Variants carry string details so downstream error types can stay
/// `Clone`-able (the orchestrator caches its stop result).
#[derive(Debug, Clone, Error)]
pub enum CoreError {
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("store error: {0}")]
    Store(String),
}

impl CoreError {
    /// Missing environment variable or config field.
    pub fn missing_config(detail: impl Into<String>) -> Self {
        Self::MissingConfig(detail.into())
    }

    /// The caller does not own the requested resource.
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::Unauthorized(detail.into())
    }

    /// Collaborator store failure.
    pub fn store(detail: impl Into<String>) -> Self {
        Self::Store(detail.into())
    }
}
