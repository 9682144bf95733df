//! Room-composite recording egress and artifact finalization.

use crate::error::{Result, SessionError};
use crate::storage::TranscriptStore;
use confab_core::{BlobStoreConfig, RoomConfig, Transcript};
use livekit_api::services::egress::{EgressClient, EgressOutput, RoomCompositeOptions};
use livekit_protocol as proto;
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Artifact URLs produced by [`RecordingController::stop`]. Either URL may
/// be absent if its upload failed; the first failure is carried in
/// `error`.
#[derive(Debug, Clone, Default)]
pub struct RecordingArtifacts {
    pub recording_url: Option<String>,
    pub transcript_url: Option<String>,
    pub error: Option<SessionError>,
}

/// Starts and stops the external recording egress, and uploads the final
/// transcript.
pub struct RecordingController {
    egress: EgressClient,
    store: TranscriptStore,
    blob: BlobStoreConfig,
    user_id: String,
    meeting_id: Uuid,
    egress_id: Mutex<Option<String>>,
}

impl RecordingController {
    pub fn new(
        room: &RoomConfig,
        blob: &BlobStoreConfig,
        user_id: impl Into<String>,
        meeting_id: Uuid,
    ) -> Self {
        Self {
            egress: EgressClient::with_api_key(&room.host, &room.api_key, &room.api_secret),
            store: TranscriptStore::new(blob),
            blob: blob.clone(),
            user_id: user_id.into(),
            meeting_id,
            egress_id: Mutex::new(None),
        }
    }

    fn recording_key(&self) -> String {
        format!("{}/{}/recording.mp4", self.user_id, self.meeting_id)
    }

    fn transcript_key(&self) -> String {
        format!("{}/{}/transcript.json", self.user_id, self.meeting_id)
    }

    /// Start a room-composite egress writing to the blob bucket.
    ///
    /// Failure is non-fatal for the session: the caller logs and the
    /// meeting proceeds without a recording.
    pub async fn start(&self) -> Result<()> {
        let output = EgressOutput::File(proto::EncodedFileOutput {
            file_type: proto::EncodedFileType::Mp4 as i32,
            filepath: self.recording_key(),
            output: Some(proto::encoded_file_output::Output::S3(proto::S3Upload {
                access_key: self.blob.access_key.clone(),
                secret: self.blob.secret_key.clone(),
                region: self.blob.region.clone(),
                bucket: self.blob.bucket.clone(),
                force_path_style: false,
                ..Default::default()
            })),
            ..Default::default()
        });

        let info = self
            .egress
            .start_room_composite_egress(
                &self.meeting_id.to_string(),
                vec![output],
                RoomCompositeOptions { layout: "speaker".to_string(), ..Default::default() },
            )
            .await
            .map_err(|e| SessionError::Recording(format!("egress start failed: {e}")))?;

        info!(meeting_id = %self.meeting_id, egress_id = %info.egress_id, "recording started");
        *self.egress_id.lock().expect("egress lock") = Some(info.egress_id);
        Ok(())
    }

    /// Stop the egress (if one is running) and upload the transcript.
    ///
    /// The transcript upload happens regardless of egress outcome; neither
    /// failure aborts the shutdown.
    pub async fn stop(&self, transcript: &Transcript) -> RecordingArtifacts {
        let mut artifacts = RecordingArtifacts::default();

        let egress_id = self.egress_id.lock().expect("egress lock").take();
        if let Some(egress_id) = egress_id {
            match self.egress.stop_egress(&egress_id).await {
                Ok(_) => {
                    info!(meeting_id = %self.meeting_id, egress_id = %egress_id, "recording stopped");
                    artifacts.recording_url = Some(self.store.object_url(&self.recording_key()));
                }
                Err(err) => {
                    warn!(meeting_id = %self.meeting_id, error = %err, "failed to stop recording");
                    artifacts.error =
                        Some(SessionError::Recording(format!("egress stop failed: {err}")));
                }
            }
        }

        match self.store.put_transcript(&self.transcript_key(), transcript).await {
            Ok(url) => artifacts.transcript_url = Some(url),
            Err(err) => {
                warn!(meeting_id = %self.meeting_id, error = %err, "failed to upload transcript");
                artifacts.error.get_or_insert(err);
            }
        }

        artifacts
    }
}
