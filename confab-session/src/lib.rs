//! Realtime session orchestrator for the Confab meeting assistant.
//!
//! A [`Session`] owns, for one meeting, the room adapter, the model stream
//! handler, the sentiment analyzer and the recording controller, wires them
//! together over bounded channels, and coordinates an idempotent shutdown
//! that finalizes the recording and transcript artifacts before invoking
//! the post-meeting callback exactly once. The [`SessionManager`] maps
//! meeting ids to active sessions and enforces the ownership check at
//! start.

pub mod error;
pub mod events;
pub mod manager;
pub mod recording;
pub mod room;
pub mod session;
pub mod storage;

pub use error::{Result, SessionError};
pub use events::TextEvent;
pub use manager::{MeetingEndHook, SessionManager};
pub use recording::{RecordingArtifacts, RecordingController};
pub use room::{
    AUDIO_CHANNEL_CAPACITY, RoomAdapter, RoomHooks, TEXT_CHANNEL_CAPACITY, TEXT_TOPIC,
    mint_join_token,
};
pub use session::{Session, SessionCallbacks, SessionConfig};
pub use storage::{TranscriptStore, parse_s3_url};
