//! Core domain types for the Confab meeting assistant.
//!
//! This crate defines what the rest of the workspace talks about: meeting
//! rows and the collaborator stores that serve them, the transcript model
//! shared by the realtime handler and the recording pipeline, and the
//! immutable configuration snapshots a session is constructed with.

pub mod config;
pub mod error;
pub mod meeting;
pub mod transcript;

pub use config::{BlobStoreConfig, ModelConfig, RoomConfig};
pub use error::{CoreError, Result};
pub use meeting::{MeetingRow, MeetingStatus, MeetingStore, User, UserStore};
pub use transcript::{SpeakerRole, Transcript, TranscriptSegment, TranscriptUpdate};
