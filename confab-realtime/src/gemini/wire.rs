//! Typed messages for the Gemini Live BidiGenerateContent protocol.

use crate::error::{RealtimeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level client message. Exactly one field is populated per send.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMessage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setup: Option<Setup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub realtime_input: Option<RealtimeInput>,
}

/// Initial session configuration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Setup {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<Value>,
    /// An empty object enables input transcription.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<Value>,
    /// An empty object enables output transcription.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_audio_transcription: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub parts: Vec<ContentPart>,
}

impl Content {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { parts: vec![ContentPart { text: Some(text.into()) }] }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Streaming media input.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_chunks: Option<Vec<MediaChunk>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    /// Base64-encoded payload.
    pub data: String,
}

/// Top-level server message. Fields we do not consume are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerMessage {
    pub setup_complete: Option<Value>,
    pub server_content: Option<ServerContent>,
}

impl ServerMessage {
    /// Parse a raw JSON frame.
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| RealtimeError::protocol(format!("parse error: {e}")))
    }
}

/// Content frame: interleaved transcription chunks, model audio parts and
/// the turn-completion marker.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerContent {
    pub input_transcription: Option<TranscriptionChunk>,
    pub output_transcription: Option<TranscriptionChunk>,
    pub model_turn: Option<ModelTurn>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TranscriptionChunk {
    pub text: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelTurn {
    pub parts: Vec<TurnPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TurnPart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InlineData {
    pub mime_type: Option<String>,
    /// Base64-encoded payload.
    pub data: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_serialization_skips_absent_fields() {
        let message = ClientMessage {
            setup: Some(Setup {
                model: "models/test".to_string(),
                system_instruction: Some(Content::from_text("be brief")),
                generation_config: None,
                input_audio_transcription: Some(serde_json::json!({})),
                output_audio_transcription: None,
            }),
            realtime_input: None,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["setup"]["model"], "models/test");
        assert_eq!(value["setup"]["systemInstruction"]["parts"][0]["text"], "be brief");
        assert!(value["setup"].get("generationConfig").is_none());
        assert!(value["setup"].get("outputAudioTranscription").is_none());
        assert!(value.get("realtimeInput").is_none());
    }

    #[test]
    fn test_media_chunk_field_names() {
        let input = RealtimeInput {
            media_chunks: Some(vec![MediaChunk {
                mime_type: "audio/pcm;rate=16000".to_string(),
                data: "AAAA".to_string(),
            }]),
            text: None,
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["mediaChunks"][0]["mimeType"], "audio/pcm;rate=16000");
    }

    #[test]
    fn test_parse_transcription_frames() {
        let message = ServerMessage::parse(
            r#"{"serverContent": {"inputTranscription": {"text": "hel"}}}"#,
        )
        .unwrap();
        let content = message.server_content.unwrap();
        assert_eq!(content.input_transcription.unwrap().text, "hel");
        assert!(!content.turn_complete);

        let message = ServerMessage::parse(
            r#"{"serverContent": {"outputTranscription": {"text": "hi"}, "turnComplete": true}}"#,
        )
        .unwrap();
        let content = message.server_content.unwrap();
        assert_eq!(content.output_transcription.unwrap().text, "hi");
        assert!(content.turn_complete);
    }

    #[test]
    fn test_parse_model_audio_parts() {
        let message = ServerMessage::parse(
            r#"{"serverContent": {"modelTurn": {"parts": [
                {"inlineData": {"mimeType": "audio/pcm;rate=24000", "data": "AgE="}}
            ]}}}"#,
        )
        .unwrap();
        let turn = message.server_content.unwrap().model_turn.unwrap();
        assert_eq!(turn.parts.len(), 1);
        assert_eq!(turn.parts[0].inline_data.as_ref().unwrap().data, "AgE=");
    }

    #[test]
    fn test_parse_setup_complete() {
        let message = ServerMessage::parse(r#"{"setupComplete": {}}"#).unwrap();
        assert!(message.setup_complete.is_some());
        assert!(message.server_content.is_none());
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        assert!(ServerMessage::parse("{nope").is_err());
    }
}
