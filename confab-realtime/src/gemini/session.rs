//! Gemini Live WebSocket session.

use crate::audio::PCM16_INPUT_MIME;
use crate::error::{RealtimeError, Result};
use crate::gemini::wire::{ClientMessage, Content, MediaChunk, RealtimeInput, ServerMessage, Setup};
use crate::gemini::{DEFAULT_REALTIME_MODEL, GEMINI_LIVE_URL};
use crate::stream::ModelStream;
use async_trait::async_trait;
use base64::Engine;
use confab_core::ModelConfig;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures::stream::SplitSink<WsStream, Message>;
type WsSource = futures::stream::SplitStream<WsStream>;

/// Connection settings for one live session.
#[derive(Debug, Clone)]
pub struct GeminiLiveConfig {
    api_key: String,
    model: String,
    system_instruction: Option<String>,
}

impl GeminiLiveConfig {
    /// Build from a model config snapshot, falling back to the default
    /// realtime model.
    pub fn from_model_config(config: &ModelConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            model: config
                .realtime_model
                .clone()
                .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
            system_instruction: None,
        }
    }

    /// Seed the model's system instruction (the meeting agent's
    /// instructions).
    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// WebSocket URL for connection.
    pub fn websocket_url(&self) -> String {
        format!("{}?key={}", GEMINI_LIVE_URL, self.api_key)
    }
}

/// A live bidirectional session with the Gemini realtime API.
pub struct GeminiLiveSession {
    connected: AtomicBool,
    sender: Mutex<WsSink>,
    receiver: Mutex<WsSource>,
}

impl GeminiLiveSession {
    /// Connect and send the setup message.
    pub async fn connect(config: &GeminiLiveConfig) -> Result<Self> {
        let (ws_stream, _response) = connect_async(config.websocket_url())
            .await
            .map_err(|e| RealtimeError::connection(format!("WebSocket connect error: {e}")))?;

        let (sink, source) = ws_stream.split();

        let session = Self {
            connected: AtomicBool::new(true),
            sender: Mutex::new(sink),
            receiver: Mutex::new(source),
        };

        session.send_setup(config).await?;

        Ok(session)
    }

    /// Send the initial setup message.
    async fn send_setup(&self, config: &GeminiLiveConfig) -> Result<()> {
        let system_instruction = config.system_instruction.clone().map(Content::from_text);

        let generation_config = json!({
            "responseModalities": ["AUDIO"],
            "thinkingConfig": { "thinkingBudget": 0 },
        });

        let setup = ClientMessage {
            setup: Some(Setup {
                model: config.model.clone(),
                system_instruction,
                generation_config: Some(generation_config),
                input_audio_transcription: Some(json!({})),
                output_audio_transcription: Some(json!({})),
            }),
            realtime_input: None,
        };

        self.send_raw(&setup).await
    }

    /// Send a raw message.
    async fn send_raw<T: Serialize>(&self, value: &T) -> Result<()> {
        let msg = serde_json::to_string(value)
            .map_err(|e| RealtimeError::protocol(format!("JSON serialize error: {e}")))?;

        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Text(msg.into()))
            .await
            .map_err(|e| RealtimeError::connection(format!("send error: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl ModelStream for GeminiLiveSession {
    async fn send_audio(&self, pcm_le: &[u8]) -> Result<()> {
        let data = base64::engine::general_purpose::STANDARD.encode(pcm_le);
        let msg = ClientMessage {
            setup: None,
            realtime_input: Some(RealtimeInput {
                media_chunks: Some(vec![MediaChunk {
                    mime_type: PCM16_INPUT_MIME.to_string(),
                    data,
                }]),
                text: None,
            }),
        };
        self.send_raw(&msg).await
    }

    async fn next_message(&self) -> Option<Result<ServerMessage>> {
        let mut receiver = self.receiver.lock().await;

        match receiver.next().await {
            Some(Ok(Message::Text(text))) => Some(ServerMessage::parse(&text)),
            // The Live API also delivers JSON in binary frames.
            Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => Some(ServerMessage::parse(text)),
                Err(e) => Some(Err(RealtimeError::protocol(format!(
                    "non-UTF-8 binary frame: {e}"
                )))),
            },
            Some(Ok(Message::Close(_))) => {
                self.connected.store(false, Ordering::SeqCst);
                None
            }
            Some(Ok(_)) => Some(Ok(ServerMessage::default())),
            Some(Err(e)) => {
                self.connected.store(false, Ordering::SeqCst);
                Some(Err(RealtimeError::connection(format!("receive error: {e}"))))
            }
            None => {
                self.connected.store(false, Ordering::SeqCst);
                None
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> Result<()> {
        if !self.connected.swap(false, Ordering::SeqCst) {
            debug!("live session already closed");
            return Ok(());
        }

        let mut sender = self.sender.lock().await;
        sender
            .send(Message::Close(None))
            .await
            .map_err(|e| RealtimeError::connection(format!("close error: {e}")))?;

        Ok(())
    }
}

impl std::fmt::Debug for GeminiLiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiLiveSession")
            .field("connected", &self.connected.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_url_carries_key() {
        let config = GeminiLiveConfig::from_model_config(&ModelConfig::new("secret-key"));
        let url = config.websocket_url();
        assert!(url.starts_with("wss://generativelanguage.googleapis.com/"));
        assert!(url.ends_with("?key=secret-key"));
    }

    #[test]
    fn test_default_model_applies_when_unset() {
        let config = GeminiLiveConfig::from_model_config(&ModelConfig::new("k"));
        assert_eq!(config.model(), DEFAULT_REALTIME_MODEL);

        let config = GeminiLiveConfig::from_model_config(
            &ModelConfig::new("k").with_model("models/other-live"),
        );
        assert_eq!(config.model(), "models/other-live");
    }
}
