//! LiveKit room adapter: remote audio in, local audio and text events out.

use crate::error::{Result, SessionError};
use crate::events::TextEvent;
use confab_core::RoomConfig;
use confab_realtime::audio::{MODEL_INPUT_SAMPLE_RATE, MODEL_OUTPUT_SAMPLE_RATE};
use confab_realtime::{ModelStreamHandler, Pcm16Frame, RealtimeError};
use futures::StreamExt;
use livekit::DataPacket;
use livekit::prelude::*;
use livekit::webrtc::audio_source::native::NativeAudioSource;
use livekit::webrtc::audio_stream::native::NativeAudioStream;
use livekit::webrtc::prelude::{AudioFrame, AudioSourceOptions, RtcAudioSource};
use livekit_api::access_token::{AccessToken, VideoGrants};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Bound on buffered outbound audio frames. Producers drop on full.
pub const AUDIO_CHANNEL_CAPACITY: usize = 500;

/// Bound on buffered outbound text events. Producers drop on full.
pub const TEXT_CHANNEL_CAPACITY: usize = 100;

/// Topic text events are broadcast under.
pub const TEXT_TOPIC: &str = "room";

/// Queue depth of the local audio source, in milliseconds.
const PUBLISH_QUEUE_MS: u32 = 1000;

/// Mint a time-limited (1 hour) access token granting `roomJoin` for
/// `room_name` under `identity`.
pub fn mint_join_token(
    config: &RoomConfig,
    room_name: &str,
    identity: &str,
    name: &str,
) -> Result<String> {
    AccessToken::with_api_key(&config.api_key, &config.api_secret)
        .with_identity(identity)
        .with_name(name)
        .with_grants(VideoGrants {
            room_join: true,
            room: room_name.to_string(),
            ..Default::default()
        })
        .with_ttl(Duration::from_secs(3600))
        .to_jwt()
        .map_err(|e| SessionError::Room(format!("token mint failed: {e}")))
}

/// Hooks the orchestrator supplies for room-level lifecycle events.
pub struct RoomHooks {
    /// The remote participant left; the session should stop.
    pub on_participant_disconnected: Box<dyn Fn() + Send + Sync>,
}

/// Joins the room as the agent, wires the first remote audio track into
/// the model stream handler, publishes the agent's audio track, and
/// broadcasts text events.
pub struct RoomAdapter {
    room: Arc<Room>,
}

impl RoomAdapter {
    /// Connect and spawn the publish, text and event-loop workers.
    pub async fn connect(
        config: &RoomConfig,
        room_name: &str,
        agent_name: &str,
        handler: Arc<ModelStreamHandler>,
        audio_rx: mpsc::Receiver<Pcm16Frame>,
        text_rx: mpsc::Receiver<TextEvent>,
        hooks: RoomHooks,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let token = mint_join_token(config, room_name, agent_name, agent_name)?;

        let (room, events) = Room::connect(&config.host, &token, RoomOptions::default())
            .await
            .map_err(|e| SessionError::Room(format!("room connect failed: {e}")))?;
        let room = Arc::new(room);
        info!(room = %room_name, identity = %agent_name, "joined room");

        tokio::spawn(publish_worker(
            room.clone(),
            agent_name.to_string(),
            audio_rx,
            cancel.clone(),
        ));
        tokio::spawn(text_worker(room.clone(), text_rx, cancel.clone()));
        tokio::spawn(event_loop(events, handler, hooks, cancel));

        Ok(Self { room })
    }

    /// Leave the room. The event loop observes the disconnect and tears
    /// down the subscribe reader.
    pub async fn disconnect(&self) {
        if let Err(err) = self.room.close().await {
            debug!(error = %err, "room close");
        }
    }
}

/// Dispatches room events: attaches the first remote audio track, reports
/// participant disconnects, and drops the subscribe reader when the room
/// goes away.
async fn event_loop(
    mut events: mpsc::UnboundedReceiver<RoomEvent>,
    handler: Arc<ModelStreamHandler>,
    hooks: RoomHooks,
    cancel: CancellationToken,
) {
    let mut reader: Option<JoinHandle<()>> = None;

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            RoomEvent::TrackSubscribed { track, .. } => {
                if reader.is_some() {
                    continue;
                }
                if let RemoteTrack::Audio(audio) = track {
                    debug!("attaching remote audio track");
                    reader =
                        Some(tokio::spawn(subscribe_reader(audio, handler.clone(), cancel.clone())));
                }
            }
            RoomEvent::ParticipantDisconnected(participant) => {
                info!(identity = ?participant.identity(), "participant disconnected");
                (hooks.on_participant_disconnected)();
            }
            RoomEvent::Disconnected { reason } => {
                info!(?reason, "disconnected from room");
                if let Some(reader) = reader.take() {
                    reader.abort();
                }
            }
            _ => {}
        }
    }

    if let Some(reader) = reader.take() {
        reader.abort();
    }
}

/// Forwards the remote participant's audio, resampled to 16 kHz mono, into
/// the model stream handler.
async fn subscribe_reader(
    track: RemoteAudioTrack,
    handler: Arc<ModelStreamHandler>,
    cancel: CancellationToken,
) {
    let mut stream = NativeAudioStream::new(track.rtc_track(), MODEL_INPUT_SAMPLE_RATE as i32, 1);

    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            frame = stream.next() => match frame {
                Some(frame) => frame,
                None => break,
            },
        };

        if let Err(err) = handler.send_audio_chunk(frame.data.as_ref()).await {
            if matches!(err, RealtimeError::Closed) {
                break;
            }
            warn!(error = %err, "failed to forward remote audio");
        }
    }
}

/// Publishes a 24 kHz mono local track fed from the audio-out channel.
async fn publish_worker(
    room: Arc<Room>,
    agent_name: String,
    mut audio_rx: mpsc::Receiver<Pcm16Frame>,
    cancel: CancellationToken,
) {
    let source = NativeAudioSource::new(
        AudioSourceOptions::default(),
        MODEL_OUTPUT_SAMPLE_RATE,
        1,
        PUBLISH_QUEUE_MS,
    );
    let track = LocalAudioTrack::create_audio_track(&agent_name, RtcAudioSource::Native(source.clone()));

    if let Err(err) = room
        .local_participant()
        .publish_track(
            LocalTrack::Audio(track),
            TrackPublishOptions { source: TrackSource::Microphone, ..Default::default() },
        )
        .await
    {
        error!(error = %err, "failed to publish local track");
        return;
    }

    loop {
        let samples = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            samples = audio_rx.recv() => match samples {
                Some(samples) => samples,
                None => break,
            },
        };

        let samples_per_channel = samples.len() as u32;
        let frame = AudioFrame {
            data: samples.into(),
            sample_rate: MODEL_OUTPUT_SAMPLE_RATE,
            num_channels: 1,
            samples_per_channel,
        };
        if let Err(err) = source.capture_frame(&frame).await {
            warn!(error = %err, "failed to write audio sample");
        }
    }

    source.clear_buffer();
    debug!("publish worker exited");
}

/// Serializes text events as JSON and broadcasts them on the room topic.
async fn text_worker(
    room: Arc<Room>,
    mut text_rx: mpsc::Receiver<TextEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = text_rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let payload = match serde_json::to_vec(&event) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize text event");
                continue;
            }
        };

        if let Err(err) = room
            .local_participant()
            .publish_data(DataPacket {
                payload,
                topic: Some(TEXT_TOPIC.to_string()),
                reliable: true,
                ..Default::default()
            })
            .await
        {
            warn!(error = %err, "failed to broadcast text event");
        }
    }

    debug!("text worker exited");
}
