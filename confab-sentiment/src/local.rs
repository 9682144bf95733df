//! Local-model sentiment analyzer over an Ollama-compatible HTTP API.
//!
//! One background worker drains a bounded request queue, so the backend
//! sees at most one generate call in flight per analyzer instance.

use crate::{AnalyzerError, Emotions, Result, SentimentAnalyzer, SentimentLabel, SentimentRecord};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Bound on queued analysis requests.
const REQUEST_QUEUE_CAPACITY: usize = 10;

/// Configuration for the local analyzer.
#[derive(Debug, Clone)]
pub struct LocalAnalyzerConfig {
    /// Backend host URL. Default: `http://localhost:11434`
    pub host: String,
    /// Model name. Default: `llama3.2:3b`
    pub model: String,
    /// Per-request timeout, independent of the caller's cancellation scope.
    pub request_timeout: Duration,
}

impl Default for LocalAnalyzerConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl LocalAnalyzerConfig {
    /// Create a config with custom host and model.
    pub fn with_host(host: impl Into<String>, model: impl Into<String>) -> Self {
        Self { host: host.into(), model: model.into(), ..Default::default() }
    }

    /// Load overrides from `OLLAMA_HOST` / `SENTIMENT_MODEL` if present.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            config.host = host;
        }
        if let Ok(model) = std::env::var("SENTIMENT_MODEL") {
            config.model = model;
        }
        config
    }
}

struct AnalysisRequest {
    text: String,
    source: String,
    record_tx: oneshot::Sender<SentimentRecord>,
    error_tx: oneshot::Sender<AnalyzerError>,
}

/// Sentiment analyzer backed by a local generate endpoint.
pub struct LocalSentimentAnalyzer {
    queue: mpsc::Sender<AnalysisRequest>,
    cancel: CancellationToken,
}

impl LocalSentimentAnalyzer {
    /// Create the analyzer and spawn its worker.
    pub fn new(config: LocalAnalyzerConfig) -> Self {
        let (queue, requests) = mpsc::channel(REQUEST_QUEUE_CAPACITY);
        let cancel = CancellationToken::new();
        let client = reqwest::Client::new();

        tokio::spawn(worker(client, config, requests, cancel.clone()));

        Self { queue, cancel }
    }
}

#[async_trait::async_trait]
impl SentimentAnalyzer for LocalSentimentAnalyzer {
    async fn analyze(
        &self,
        cancel: &CancellationToken,
        text: &str,
        source: &str,
    ) -> Result<SentimentRecord> {
        if text.trim().is_empty() {
            return Err(AnalyzerError::EmptyText);
        }

        let (record_tx, record_rx) = oneshot::channel();
        let (error_tx, error_rx) = oneshot::channel();
        let request = AnalysisRequest {
            text: text.to_string(),
            source: source.to_string(),
            record_tx,
            error_tx,
        };

        // Enqueue races against the caller's scope, never dropping silently.
        tokio::select! {
            sent = self.queue.send(request) => {
                sent.map_err(|_| AnalyzerError::Cancelled)?;
            }
            _ = cancel.cancelled() => return Err(AnalyzerError::Cancelled),
        }

        tokio::select! {
            _ = cancel.cancelled() => Err(AnalyzerError::Cancelled),
            outcome = async {
                match record_rx.await {
                    Ok(record) => Ok(record),
                    // Record sender dropped: either an error was sent, or
                    // the worker shut down with the request in hand.
                    Err(_) => match error_rx.await {
                        Ok(err) => Err(err),
                        Err(_) => Err(AnalyzerError::Cancelled),
                    },
                }
            } => outcome,
        }
    }

    async fn close(&self) {
        self.cancel.cancel();
    }
}

async fn worker(
    client: reqwest::Client,
    config: LocalAnalyzerConfig,
    mut requests: mpsc::Receiver<AnalysisRequest>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            request = requests.recv() => {
                let Some(request) = request else { return };
                match generate(&client, &config, &request.text, &request.source).await {
                    Ok(record) => {
                        let _ = request.record_tx.send(record);
                    }
                    Err(err) => {
                        debug!(error = %err, "sentiment analysis failed");
                        let _ = request.error_tx.send(err);
                    }
                }
            }
        }
    }

    // Fail anything still queued so no caller is left waiting.
    requests.close();
    while let Ok(request) = requests.try_recv() {
        let _ = request.error_tx.send(AnalyzerError::Cancelled);
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct RawSentiment {
    #[serde(default)]
    sentiment: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    emotions: Emotions,
}

async fn generate(
    client: &reqwest::Client,
    config: &LocalAnalyzerConfig,
    text: &str,
    source: &str,
) -> Result<SentimentRecord> {
    let request = GenerateRequest {
        model: &config.model,
        prompt: sentiment_prompt(text),
        stream: false,
        options: GenerateOptions { temperature: 0.1, num_predict: 200 },
    };

    let url = format!("{}/api/generate", config.host.trim_end_matches('/'));
    let call = async {
        let response = client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AnalyzerError::backend(format!("generate request failed: {e}")))?;
        if !response.status().is_success() {
            return Err(AnalyzerError::backend(format!(
                "generate returned status {}",
                response.status()
            )));
        }
        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| AnalyzerError::backend(format!("invalid generate response: {e}")))
    };

    let response = tokio::time::timeout(config.request_timeout, call)
        .await
        .map_err(|_| AnalyzerError::backend("generate request timed out"))??;

    parse_record(&response.response, text, source)
}

fn sentiment_prompt(text: &str) -> String {
    format!(
        r#"Analyze the sentiment of the following text and respond ONLY with a JSON object in this exact format:
{{
  "sentiment": "positive" or "negative" or "neutral",
  "score": confidence score between 0.0 and 1.0,
  "emotions": {{
    "joy": 0.0-1.0,
    "anger": 0.0-1.0,
    "sadness": 0.0-1.0,
    "fear": 0.0-1.0
  }}
}}

Text to analyze: "{text}"

JSON response:"#
    )
}

/// Extract the first `{` .. last `}` JSON object embedded in a model reply.
fn extract_json(response: &str) -> Result<&str> {
    let start = response.find('{');
    let end = response.rfind('}');
    match (start, end) {
        (Some(start), Some(end)) if start < end => Ok(&response[start..=end]),
        _ => Err(AnalyzerError::malformed(format!("no JSON object in response: {response}"))),
    }
}

fn parse_record(response: &str, text: &str, source: &str) -> Result<SentimentRecord> {
    let json = extract_json(response.trim())?;
    let raw: RawSentiment = serde_json::from_str(json)
        .map_err(|e| AnalyzerError::malformed(format!("{e}, response: {json}")))?;

    let sentiment = SentimentLabel::parse(&raw.sentiment);
    if sentiment == SentimentLabel::Neutral && !raw.sentiment.eq_ignore_ascii_case("neutral") {
        warn!(label = %raw.sentiment, "unrecognized sentiment label, coercing to neutral");
    }

    Ok(SentimentRecord {
        text: text.to_string(),
        sentiment,
        score: raw.score,
        emotions: raw.emotions,
        timestamp: Utc::now(),
        source: source.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_strips_surrounding_prose() {
        let response = "Sure! Here you go: {\"sentiment\": \"positive\"} Hope that helps.";
        assert_eq!(extract_json(response).unwrap(), "{\"sentiment\": \"positive\"}");
    }

    #[test]
    fn test_extract_json_rejects_missing_braces() {
        assert!(extract_json("no json here").is_err());
        assert!(extract_json("} backwards {").is_err());
    }

    #[test]
    fn test_parse_record_full_reply() {
        let response = r#"{"sentiment": "Positive", "score": 0.9,
            "emotions": {"joy": 0.7, "anger": 0.0, "sadness": 0.1, "fear": 0.0}}"#;
        let record = parse_record(response, "what a day", "Ada").unwrap();
        assert_eq!(record.sentiment, SentimentLabel::Positive);
        assert_eq!(record.score, 0.9);
        assert_eq!(record.emotions.joy, 0.7);
        assert_eq!(record.text, "what a day");
        assert_eq!(record.source, "Ada");
    }

    #[test]
    fn test_parse_record_coerces_unknown_label() {
        let response = r#"{"sentiment": "elated", "score": 0.5}"#;
        let record = parse_record(response, "hm", "Ada").unwrap();
        assert_eq!(record.sentiment, SentimentLabel::Neutral);
    }

    #[test]
    fn test_parse_record_malformed_json() {
        let err = parse_record("{not json}", "hm", "Ada").err().unwrap();
        assert!(matches!(err, AnalyzerError::MalformedResponse(_)));
    }
}
