//! Out-of-band events broadcast on the room text channel.

use confab_core::TranscriptUpdate;
use confab_sentiment::SentimentRecord;
use serde::Serialize;

/// A text-channel event, serialized as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum TextEvent {
    /// Cumulative interim transcript for the turn in progress.
    Transcript(TranscriptUpdate),
    /// Sentiment for a completed user utterance.
    Sentiment(SentimentRecord),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use confab_core::SpeakerRole;
    use confab_sentiment::{Emotions, SentimentLabel};

    #[test]
    fn test_transcript_event_layout() {
        let event = TextEvent::Transcript(TranscriptUpdate {
            role: SpeakerRole::User,
            name: "Ada".to_string(),
            content: "hello".to_string(),
            timestamp: Utc::now(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "transcript");
        assert_eq!(value["data"]["role"], "user");
        assert_eq!(value["data"]["content"], "hello");
    }

    #[test]
    fn test_sentiment_event_layout() {
        let event = TextEvent::Sentiment(SentimentRecord {
            text: "hello".to_string(),
            sentiment: SentimentLabel::Positive,
            score: 0.8,
            emotions: Emotions::default(),
            timestamp: Utc::now(),
            source: "Ada".to_string(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "sentiment");
        assert_eq!(value["data"]["sentiment"], "positive");
    }
}
