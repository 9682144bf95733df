//! Sentiment analysis side-channel for meeting sessions.
//!
//! A [`SentimentAnalyzer`] turns one user utterance into a structured
//! [`SentimentRecord`]. Implementations are selected through the
//! [`AnalyzerKind`] registry; the only built-in variant runs a local model
//! behind an Ollama-compatible HTTP API.

pub mod local;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use local::{LocalAnalyzerConfig, LocalSentimentAnalyzer};

/// Result type for analyzer operations.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Errors produced by sentiment analyzers.
#[derive(Debug, Clone, Error)]
pub enum AnalyzerError {
    #[error("empty text provided")]
    EmptyText,

    /// The analyzer was closed, or the caller's scope was cancelled while
    /// waiting.
    #[error("analysis cancelled")]
    Cancelled,

    #[error("sentiment backend error: {0}")]
    Backend(String),

    #[error("malformed sentiment response: {0}")]
    MalformedResponse(String),

    #[error("unsupported analyzer kind: {0}")]
    UnsupportedKind(String),
}

impl AnalyzerError {
    pub fn backend(detail: impl Into<String>) -> Self {
        Self::Backend(detail.into())
    }

    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedResponse(detail.into())
    }
}

/// Overall sentiment classification of an utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl SentimentLabel {
    /// Parse a backend-reported label. Unrecognized values coerce to
    /// [`SentimentLabel::Neutral`].
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => write!(f, "positive"),
            Self::Negative => write!(f, "negative"),
            Self::Neutral => write!(f, "neutral"),
        }
    }
}

/// Per-emotion intensities, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Emotions {
    #[serde(default)]
    pub joy: f64,
    #[serde(default)]
    pub anger: f64,
    #[serde(default)]
    pub sadness: f64,
    #[serde(default)]
    pub fear: f64,
}

/// Structured sentiment for one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    /// The analyzed text.
    pub text: String,
    pub sentiment: SentimentLabel,
    /// Backend confidence in `[0, 1]`.
    pub score: f64,
    pub emotions: Emotions,
    pub timestamp: DateTime<Utc>,
    /// Display name of the speaker the text came from.
    pub source: String,
}

/// Capability interface: analyze one utterance, or shut the analyzer down.
#[async_trait::async_trait]
pub trait SentimentAnalyzer: Send + Sync {
    /// Analyze `text` attributed to `source`. The cancellation scope covers
    /// the caller's wait, not the backend call itself (which runs under the
    /// analyzer's own per-request timeout).
    async fn analyze(
        &self,
        cancel: &CancellationToken,
        text: &str,
        source: &str,
    ) -> Result<SentimentRecord>;

    /// Cancel the worker and fail any queued requests. Idempotent.
    async fn close(&self);
}

/// Registry key selecting an analyzer implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerKind {
    /// Local model behind an Ollama-compatible HTTP API.
    Local,
    OpenAi,
    Anthropic,
}

impl std::fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Construct an analyzer for the given kind.
pub fn new_analyzer(
    kind: AnalyzerKind,
    config: LocalAnalyzerConfig,
) -> Result<Arc<dyn SentimentAnalyzer>> {
    match kind {
        AnalyzerKind::Local => Ok(Arc::new(LocalSentimentAnalyzer::new(config))),
        other => Err(AnalyzerError::UnsupportedKind(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parse_coerces_unknown_to_neutral() {
        assert_eq!(SentimentLabel::parse("positive"), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::parse("NEGATIVE"), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::parse("ecstatic"), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::parse(""), SentimentLabel::Neutral);
    }

    #[test]
    fn test_record_serialization() {
        let record = SentimentRecord {
            text: "great demo".to_string(),
            sentiment: SentimentLabel::Positive,
            score: 0.92,
            emotions: Emotions { joy: 0.8, ..Default::default() },
            timestamp: Utc::now(),
            source: "Ada".to_string(),
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["sentiment"], "positive");
        assert_eq!(value["emotions"]["joy"], 0.8);
        assert_eq!(value["source"], "Ada");
    }

    #[test]
    fn test_registry_unsupported_kinds() {
        for kind in [AnalyzerKind::OpenAi, AnalyzerKind::Anthropic] {
            let err = new_analyzer(kind, LocalAnalyzerConfig::default()).err().unwrap();
            assert!(matches!(err, AnalyzerError::UnsupportedKind(_)));
        }
    }
}
