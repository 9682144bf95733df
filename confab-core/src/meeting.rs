//! Meeting and user rows plus the collaborator stores that serve them.
//!
//! Persistence itself lives outside this workspace; the session core only
//! consumes these interfaces.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a meeting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Upcoming,
    Active,
    Completed,
    Failed,
}

impl std::fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upcoming => write!(f, "upcoming"),
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// A meeting row joined with its agent's details, as returned by the
/// meeting store for an owning user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRow {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub status: MeetingStatus,
    /// Display name the agent joins the room under.
    pub agent_name: String,
    /// System instruction seeded into the realtime model.
    pub agent_instructions: String,
    pub transcript_url: Option<String>,
    pub recording_url: Option<String>,
}

/// A user row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
}

/// Read access to meetings, scoped by owning user.
///
/// `get_meeting` returns `CoreError::NotFound` when the meeting does not
/// exist *or* is not owned by `user_id`; callers treat both as
/// unauthorized.
#[async_trait]
pub trait MeetingStore: Send + Sync {
    async fn get_meeting(&self, meeting_id: Uuid, user_id: &str) -> Result<MeetingRow>;
}

/// Read access to users.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<User>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&MeetingStatus::Active).unwrap(), "\"active\"");
        let status: MeetingStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(status, MeetingStatus::Failed);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(MeetingStatus::Upcoming.to_string(), "upcoming");
        assert_eq!(MeetingStatus::Completed.to_string(), "completed");
    }
}
