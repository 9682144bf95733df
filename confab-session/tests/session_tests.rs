//! Orchestrator lifecycle tests that need no external services.

use async_trait::async_trait;
use confab_core::{
    BlobStoreConfig, CoreError, MeetingRow, MeetingStatus, MeetingStore, ModelConfig, RoomConfig,
    User, UserStore,
};
use confab_sentiment::LocalAnalyzerConfig;
use confab_session::{Session, SessionCallbacks, SessionConfig, SessionError, SessionManager};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

fn test_config() -> SessionConfig {
    SessionConfig {
        room: RoomConfig::new("https://rooms.example", "lk-key", "lk-secret"),
        model: ModelConfig::new("gemini-key"),
        blob: BlobStoreConfig {
            region: "us-east-1".to_string(),
            bucket: "artifacts".to_string(),
            access_key: "ak".to_string(),
            secret_key: "sk".to_string(),
        },
        analyzer: LocalAnalyzerConfig::default(),
    }
}

fn test_meeting(user_id: &str) -> MeetingRow {
    MeetingRow {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        name: "standup".to_string(),
        status: MeetingStatus::Upcoming,
        agent_name: "Scout".to_string(),
        agent_instructions: "You take meeting notes.".to_string(),
        transcript_url: None,
        recording_url: None,
    }
}

#[tokio::test]
async fn test_stop_is_idempotent_and_fires_callback_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = calls.clone();
    let callbacks = SessionCallbacks {
        on_meeting_end: Box::new(move |_, recording_url, transcript_url, err| {
            assert_eq!(recording_url, "");
            assert_eq!(transcript_url, "");
            assert!(err.is_none());
            seen.fetch_add(1, Ordering::SeqCst);
        }),
    };

    let session = Session::new(
        test_meeting("user-1"),
        User { id: "user-1".to_string(), name: "Ada".to_string() },
        test_config(),
        callbacks,
    );

    // Concurrent and repeated stops all observe the same result.
    let mut handles = Vec::new();
    for _ in 0..5 {
        let session = session.clone();
        handles.push(tokio::spawn(async move { session.stop().await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
    assert!(session.stop().await.is_ok());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_issue_user_token_is_idempotent() {
    let session = Session::new(
        test_meeting("user-1"),
        User { id: "user-1".to_string(), name: "Ada".to_string() },
        test_config(),
        SessionCallbacks { on_meeting_end: Box::new(|_, _, _, _| {}) },
    );

    let first = session.issue_user_token().unwrap();
    let second = session.issue_user_token().unwrap();
    assert!(!first.is_empty());
    assert!(!second.is_empty());
}

/// Store that refuses every lookup, as for a meeting owned by someone
/// else.
struct DenyingMeetingStore;

#[async_trait]
impl MeetingStore for DenyingMeetingStore {
    async fn get_meeting(
        &self,
        meeting_id: Uuid,
        _user_id: &str,
    ) -> confab_core::Result<MeetingRow> {
        Err(CoreError::NotFound(meeting_id.to_string()))
    }
}

struct StaticUserStore;

#[async_trait]
impl UserStore for StaticUserStore {
    async fn get_user(&self, user_id: &str) -> confab_core::Result<User> {
        Ok(User { id: user_id.to_string(), name: "Ada".to_string() })
    }
}

#[tokio::test]
async fn test_unauthorized_start_spawns_nothing() {
    let post_calls = Arc::new(AtomicUsize::new(0));
    let seen = post_calls.clone();
    let manager = SessionManager::new(
        Arc::new(DenyingMeetingStore),
        Arc::new(StaticUserStore),
        test_config(),
        Arc::new(move |_, _, _, _| {
            seen.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let err = manager.start_session(Uuid::new_v4(), "intruder").await.err().unwrap();
    assert!(matches!(err, SessionError::Unauthorized(_)));
    assert_eq!(manager.active_count(), 0);
    assert_eq!(post_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_stop_unknown_meeting_is_a_no_op() {
    let manager = SessionManager::new(
        Arc::new(DenyingMeetingStore),
        Arc::new(StaticUserStore),
        test_config(),
        Arc::new(|_, _, _, _| {}),
    );

    assert!(manager.stop_session(Uuid::new_v4()).await.is_ok());
}
