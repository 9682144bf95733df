//! Registry of active sessions, with the ownership check at start.

use crate::error::{Result, SessionError};
use crate::session::{Session, SessionCallbacks, SessionConfig};
use confab_core::{CoreError, MeetingStore, UserStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

/// Post-processing trigger: meeting id, recording URL, transcript URL
/// (empty when the upload failed), terminal error. Fire-and-forget.
pub type MeetingEndHook = Arc<dyn Fn(Uuid, String, String, Option<SessionError>) + Send + Sync>;

/// Creates, tracks and stops sessions, one per active meeting.
pub struct SessionManager {
    meetings: Arc<dyn MeetingStore>,
    users: Arc<dyn UserStore>,
    config: SessionConfig,
    on_meeting_end: MeetingEndHook,
    active: Arc<Mutex<HashMap<Uuid, Arc<Session>>>>,
}

impl SessionManager {
    pub fn new(
        meetings: Arc<dyn MeetingStore>,
        users: Arc<dyn UserStore>,
        config: SessionConfig,
        on_meeting_end: MeetingEndHook,
    ) -> Self {
        Self {
            meetings,
            users,
            config,
            on_meeting_end,
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Start a session for `meeting_id` on behalf of `user_id`.
    ///
    /// A meeting the store cannot find for this user maps to
    /// [`SessionError::Unauthorized`]: no workers are started and no
    /// callback fires. Returns the session and the user's join token —
    /// the sole externally-returned artifact of start.
    pub async fn start_session(
        &self,
        meeting_id: Uuid,
        user_id: &str,
    ) -> Result<(Arc<Session>, String)> {
        if self.active.lock().expect("active lock").contains_key(&meeting_id) {
            return Err(SessionError::AlreadyActive(meeting_id.to_string()));
        }

        let meeting =
            self.meetings.get_meeting(meeting_id, user_id).await.map_err(|err| match err {
                CoreError::NotFound(_) | CoreError::Unauthorized(_) => SessionError::Unauthorized(
                    format!("user {user_id} does not have access to meeting {meeting_id}"),
                ),
                other => SessionError::from(other),
            })?;
        let user = self.users.get_user(user_id).await?;

        let active = self.active.clone();
        let hook = self.on_meeting_end.clone();
        let callbacks = SessionCallbacks {
            on_meeting_end: Box::new(move |meeting_id, recording_url, transcript_url, err| {
                active.lock().expect("active lock").remove(&meeting_id);
                (hook)(
                    meeting_id,
                    recording_url.to_string(),
                    transcript_url.to_string(),
                    err.cloned(),
                );
            }),
        };

        let session = Session::new(meeting, user, self.config.clone(), callbacks);
        session.start().await?;

        let token = match session.issue_user_token() {
            Ok(token) => token,
            Err(err) => {
                let _ = session.stop().await;
                return Err(err);
            }
        };

        self.active.lock().expect("active lock").insert(meeting_id, session.clone());
        info!(meeting_id = %meeting_id, active = self.active_count(), "session registered");

        Ok((session, token))
    }

    /// Stop the session for `meeting_id`, if one is active.
    pub async fn stop_session(&self, meeting_id: Uuid) -> Result<()> {
        let session = self.active.lock().expect("active lock").get(&meeting_id).cloned();
        match session {
            Some(session) => session.stop().await,
            None => Ok(()),
        }
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().expect("active lock").len()
    }
}
