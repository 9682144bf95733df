//! The session orchestrator: owns one meeting's workers end to end.

use crate::error::{Result, SessionError};
use crate::events::TextEvent;
use crate::recording::RecordingController;
use crate::room::{
    AUDIO_CHANNEL_CAPACITY, RoomAdapter, RoomHooks, TEXT_CHANNEL_CAPACITY, mint_join_token,
};
use confab_core::{BlobStoreConfig, MeetingRow, ModelConfig, RoomConfig, User};
use confab_realtime::{
    GeminiLiveConfig, HandlerCallbacks, ModelStreamHandler, Pcm16Frame, SpeakerNames,
};
use confab_sentiment::{AnalyzerKind, LocalAnalyzerConfig, SentimentAnalyzer, new_analyzer};
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, OnceCell, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Callbacks supplied by the session's owner.
pub struct SessionCallbacks {
    /// Fired exactly once when the session ends. Artifact URLs are empty
    /// strings when the corresponding upload failed; `err` carries the
    /// terminal error, if any. Fire-and-forget.
    pub on_meeting_end: Box<dyn Fn(Uuid, &str, &str, Option<&SessionError>) + Send + Sync>,
}

/// Immutable configuration snapshot a session is constructed with.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub room: RoomConfig,
    pub model: ModelConfig,
    pub blob: BlobStoreConfig,
    pub analyzer: LocalAnalyzerConfig,
}

impl SessionConfig {
    /// Load every snapshot from the environment.
    pub fn from_env() -> confab_core::Result<Self> {
        Ok(Self {
            room: RoomConfig::from_env()?,
            model: ModelConfig::from_env()?,
            blob: BlobStoreConfig::from_env()?,
            analyzer: LocalAnalyzerConfig::from_env(),
        })
    }
}

/// Live resources owned by a started session.
struct SessionRuntime {
    analyzer: Arc<dyn SentimentAnalyzer>,
    handler: Arc<ModelStreamHandler>,
    room: RoomAdapter,
    recording: RecordingController,
}

/// One active meeting: the room adapter, model stream handler, sentiment
/// analyzer and recording controller, bound to a single cancellation
/// scope.
pub struct Session {
    meeting: MeetingRow,
    user: User,
    config: SessionConfig,
    callbacks: SessionCallbacks,
    cancel: CancellationToken,
    disconnected: Arc<Notify>,
    runtime: tokio::sync::Mutex<Option<SessionRuntime>>,
    stop_result: OnceCell<Option<SessionError>>,
}

impl Session {
    /// Constructor only; no side effects until [`Session::start`].
    pub fn new(
        meeting: MeetingRow,
        user: User,
        config: SessionConfig,
        callbacks: SessionCallbacks,
    ) -> Arc<Self> {
        Arc::new(Self {
            meeting,
            user,
            config,
            callbacks,
            cancel: CancellationToken::new(),
            disconnected: Arc::new(Notify::new()),
            runtime: tokio::sync::Mutex::new(None),
            stop_result: OnceCell::new(),
        })
    }

    pub fn meeting_id(&self) -> Uuid {
        self.meeting.id
    }

    /// Bring up the sentiment analyzer, model stream handler and room
    /// adapter (in that order), then optionally the recording egress. On
    /// failure, already-constructed workers are torn down in reverse order;
    /// no callback fires.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let analyzer = new_analyzer(AnalyzerKind::Local, self.config.analyzer.clone())?;

        let (audio_tx, audio_rx) = mpsc::channel(AUDIO_CHANNEL_CAPACITY);
        let (text_tx, text_rx) = mpsc::channel(TEXT_CHANNEL_CAPACITY);
        let callbacks = wire_callbacks(audio_tx, text_tx);

        let live_config = GeminiLiveConfig::from_model_config(&self.config.model)
            .with_system_instruction(self.meeting.agent_instructions.as_str());
        let names = SpeakerNames {
            user: self.user.name.clone(),
            agent: self.meeting.agent_name.clone(),
        };
        let handler = match ModelStreamHandler::connect(
            &live_config,
            names,
            analyzer.clone(),
            callbacks,
            self.cancel.clone(),
        )
        .await
        {
            Ok(handler) => handler,
            Err(err) => {
                analyzer.close().await;
                return Err(err.into());
            }
        };

        let disconnected = self.disconnected.clone();
        let hooks = RoomHooks {
            on_participant_disconnected: Box::new(move || disconnected.notify_one()),
        };
        let room = match RoomAdapter::connect(
            &self.config.room,
            &self.meeting.id.to_string(),
            &self.meeting.agent_name,
            handler.clone(),
            audio_rx,
            text_rx,
            hooks,
            self.cancel.clone(),
        )
        .await
        {
            Ok(room) => room,
            Err(err) => {
                handler.close().await;
                analyzer.close().await;
                return Err(err);
            }
        };

        let recording = RecordingController::new(
            &self.config.room,
            &self.config.blob,
            self.meeting.user_id.as_str(),
            self.meeting.id,
        );
        if let Err(err) = recording.start().await {
            warn!(meeting_id = %self.meeting.id, error = %err,
                "recording unavailable, continuing without it");
        }

        *self.runtime.lock().await = Some(SessionRuntime { analyzer, handler, room, recording });

        // Converge disconnects and fatal errors on the idempotent stop
        // path. Holds only a weak reference so a dropped session does not
        // linger.
        let weak = Arc::downgrade(self);
        let cancel = self.cancel.clone();
        let disconnected = self.disconnected.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = disconnected.notified() => {}
            }
            if let Some(session) = weak.upgrade() {
                if let Err(err) = session.stop().await {
                    debug!(error = %err, "session stop after trigger");
                }
            }
        });

        info!(meeting_id = %self.meeting.id, "session started");
        Ok(())
    }

    /// Mint the user's join token. Idempotent; safe to call after start.
    pub fn issue_user_token(&self) -> Result<String> {
        mint_join_token(
            &self.config.room,
            &self.meeting.id.to_string(),
            &self.user.id,
            &self.user.name,
        )
    }

    /// Shut the session down. Idempotent: the first caller runs the
    /// shutdown sequence and fires `on_meeting_end` exactly once; every
    /// caller observes the same result.
    pub async fn stop(&self) -> Result<()> {
        let result = self.stop_result.get_or_init(|| self.do_stop()).await;
        match result {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn do_stop(&self) -> Option<SessionError> {
        self.cancel.cancel();

        let runtime = self.runtime.lock().await.take();
        let mut error: Option<SessionError> = None;
        let mut recording_url = String::new();
        let mut transcript_url = String::new();

        if let Some(runtime) = runtime {
            // Finalize artifacts first: the transcript is complete once the
            // scope is cancelled (nothing else appends).
            let transcript = runtime.handler.transcript_snapshot();
            let artifacts = runtime.recording.stop(&transcript).await;
            recording_url = artifacts.recording_url.unwrap_or_default();
            transcript_url = artifacts.transcript_url.unwrap_or_default();
            error = artifacts.error;

            runtime.room.disconnect().await;
            runtime.handler.close().await;
            runtime.analyzer.close().await;

            // A fatal mid-session error outranks post-processing failures.
            if let Some(fatal) = runtime.handler.take_error() {
                error = Some(fatal.into());
            }
            // Dropping the runtime releases the last channel senders; the
            // publish and text workers drain and exit.
        }

        info!(meeting_id = %self.meeting.id, "meeting ended, starting post-processing");
        (self.callbacks.on_meeting_end)(
            self.meeting.id,
            &recording_url,
            &transcript_url,
            error.as_ref(),
        );

        error
    }
}

/// Translate handler callbacks into channel sends. Audio and text events
/// drop (with a warning) when their channel is full; a closed channel
/// means the session is shutting down and the event is discarded silently.
fn wire_callbacks(
    audio_tx: mpsc::Sender<Pcm16Frame>,
    text_tx: mpsc::Sender<TextEvent>,
) -> HandlerCallbacks {
    let sentiment_tx = text_tx.clone();

    HandlerCallbacks {
        on_audio: Box::new(move |frame| match audio_tx.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => warn!("audio channel full, dropping frame"),
            Err(TrySendError::Closed(_)) => {}
        }),
        on_transcript: Box::new(move |update| {
            match text_tx.try_send(TextEvent::Transcript(update)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => warn!("text channel full, dropping transcript event"),
                Err(TrySendError::Closed(_)) => {}
            }
        }),
        on_sentiment: Box::new(move |record| {
            match sentiment_tx.try_send(TextEvent::Sentiment(record)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => warn!("text channel full, dropping sentiment event"),
                Err(TrySendError::Closed(_)) => {}
            }
        }),
    }
}
