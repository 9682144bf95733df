//! Transcript model shared by the realtime handler and the recording
//! pipeline.
//!
//! A transcript is an ordered sequence of committed segments. Segments are
//! appended only by the model receive loop; timestamps are monotonically
//! non-decreasing across the sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who spoke a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeakerRole {
    /// The human participant.
    User,
    /// The agent.
    Ai,
}

impl std::fmt::Display for SpeakerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Ai => write!(f, "ai"),
        }
    }
}

/// A committed entry in the transcript: one speaker's contribution within
/// one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub role: SpeakerRole,
    /// Speaker's display name.
    pub name: String,
    /// Trimmed concatenation of all chunks received for the turn.
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// An interim (not yet committed) transcript update streamed to room
/// participants while a turn is in progress. Content is cumulative, not a
/// delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptUpdate {
    pub role: SpeakerRole,
    pub name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Ordered sequence of committed segments for one meeting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub segments: Vec<TranscriptSegment>,
}

impl Transcript {
    pub fn new() -> Self {
        Self { segments: Vec::new() }
    }

    pub fn push(&mut self, segment: TranscriptSegment) {
        self.segments.push(segment);
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Serialize in the persisted artifact layout (indented JSON).
    pub fn to_json_pretty(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn segment(role: SpeakerRole, content: &str) -> TranscriptSegment {
        TranscriptSegment {
            role,
            name: "Ada".to_string(),
            content: content.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&SpeakerRole::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&SpeakerRole::Ai).unwrap(), "\"ai\"");
    }

    #[test]
    fn test_transcript_round_trip() {
        let mut transcript = Transcript::new();
        transcript.push(segment(SpeakerRole::User, "hello there"));
        transcript.push(segment(SpeakerRole::Ai, "hi!"));

        let bytes = transcript.to_json_pretty().unwrap();
        let decoded = Transcript::from_json(&bytes).unwrap();
        assert_eq!(decoded, transcript);
    }

    #[test]
    fn test_persisted_layout_fields() {
        let mut transcript = Transcript::new();
        transcript.push(segment(SpeakerRole::Ai, "greetings"));

        let value: serde_json::Value =
            serde_json::from_slice(&transcript.to_json_pretty().unwrap()).unwrap();
        let seg = &value["segments"][0];
        assert_eq!(seg["role"], "ai");
        assert_eq!(seg["name"], "Ada");
        assert_eq!(seg["content"], "greetings");
        // RFC 3339 timestamp
        assert!(seg["timestamp"].as_str().unwrap().starts_with("2025-06-01T12:00:00"));
    }
}
