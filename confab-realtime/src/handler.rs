//! Model stream handler: the session-side face of the realtime model.
//!
//! One receive loop per handler consumes server messages, forwards model
//! audio, streams cumulative interim transcripts, and on every
//! turn-completion commits the accumulated text as transcript segments
//! (user first, then agent). Partial turn content is promoted only by a
//! turn-completion event; anything pending when the loop exits is lost.

use crate::audio::{Pcm16Frame, decode_pcm16_le, encode_pcm16_le};
use crate::error::{RealtimeError, Result};
use crate::gemini::session::{GeminiLiveConfig, GeminiLiveSession};
use crate::gemini::wire::ServerMessage;
use crate::stream::ModelStream;
use base64::Engine;
use chrono::{DateTime, Utc};
use confab_core::{SpeakerRole, Transcript, TranscriptSegment, TranscriptUpdate};
use confab_sentiment::{SentimentAnalyzer, SentimentRecord};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Lifecycle state of a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum HandlerState {
    Connecting = 0,
    Streaming = 1,
    Closing = 2,
    Closed = 3,
}

/// Forward-only state cell.
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: HandlerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn get(&self) -> HandlerState {
        match self.0.load(Ordering::SeqCst) {
            0 => HandlerState::Connecting,
            1 => HandlerState::Streaming,
            2 => HandlerState::Closing,
            _ => HandlerState::Closed,
        }
    }

    /// Advance to `state` unless the cell is already past it.
    fn advance(&self, state: HandlerState) {
        self.0.fetch_max(state as u8, Ordering::SeqCst);
    }
}

/// Display names attached to transcript entries.
#[derive(Debug, Clone)]
pub struct SpeakerNames {
    pub user: String,
    pub agent: String,
}

/// Callbacks supplied by the session orchestrator. The handler holds no
/// reference back to the orchestrator, only these and the cancellation
/// scope.
pub struct HandlerCallbacks {
    /// One decoded frame of 24 kHz model audio.
    pub on_audio: Box<dyn Fn(Pcm16Frame) + Send + Sync>,
    /// Cumulative interim transcript for the turn in progress.
    pub on_transcript: Box<dyn Fn(TranscriptUpdate) + Send + Sync>,
    /// Sentiment for a completed user utterance, whenever it arrives.
    pub on_sentiment: Box<dyn Fn(SentimentRecord) + Send + Sync>,
}

/// Accumulates one turn's text until the model signals completion.
///
/// Owned exclusively by the receive loop (single-writer).
struct TurnBuffer {
    pending_user: String,
    pending_agent: String,
    turn_start: DateTime<Utc>,
}

impl TurnBuffer {
    fn new() -> Self {
        Self { pending_user: String::new(), pending_agent: String::new(), turn_start: Utc::now() }
    }

    fn push_user(&mut self, chunk: &str) {
        if !chunk.is_empty() {
            self.pending_user.push(' ');
            self.pending_user.push_str(chunk);
        }
    }

    fn push_agent(&mut self, chunk: &str) {
        if !chunk.is_empty() {
            self.pending_agent.push(' ');
            self.pending_agent.push_str(chunk);
        }
    }

    fn reset(&mut self) {
        self.pending_user.clear();
        self.pending_agent.clear();
        self.turn_start = Utc::now();
    }
}

/// Bidirectional adapter between a session and the streaming model.
pub struct ModelStreamHandler {
    stream: Arc<dyn ModelStream>,
    names: SpeakerNames,
    transcript: Mutex<Transcript>,
    state: StateCell,
    cancel: CancellationToken,
    last_error: Mutex<Option<RealtimeError>>,
}

impl ModelStreamHandler {
    /// Connect to Gemini Live and start the receive loop.
    ///
    /// `cancel` is the session scope: a fatal receive error cancels it.
    pub async fn connect(
        config: &GeminiLiveConfig,
        names: SpeakerNames,
        analyzer: Arc<dyn SentimentAnalyzer>,
        callbacks: HandlerCallbacks,
        cancel: CancellationToken,
    ) -> Result<Arc<Self>> {
        let session = GeminiLiveSession::connect(config).await?;
        Ok(Self::with_stream(Arc::new(session), names, analyzer, callbacks, cancel))
    }

    /// Wrap an already-connected stream and start the receive loop.
    pub fn with_stream(
        stream: Arc<dyn ModelStream>,
        names: SpeakerNames,
        analyzer: Arc<dyn SentimentAnalyzer>,
        callbacks: HandlerCallbacks,
        cancel: CancellationToken,
    ) -> Arc<Self> {
        let handler = Arc::new(Self {
            stream,
            names,
            transcript: Mutex::new(Transcript::new()),
            state: StateCell::new(HandlerState::Streaming),
            cancel,
            last_error: Mutex::new(None),
        });

        tokio::spawn(receive_loop(handler.clone(), Arc::new(callbacks), analyzer));

        handler
    }

    /// Push one PCM16 frame (16 kHz mono) to the model.
    pub async fn send_audio_chunk(&self, frame: &[i16]) -> Result<()> {
        if self.state.get() >= HandlerState::Closing {
            return Err(RealtimeError::Closed);
        }
        self.stream.send_audio(&encode_pcm16_le(frame)).await
    }

    /// Current transcript, as a read-only snapshot. Valid at or after
    /// close.
    pub fn transcript_snapshot(&self) -> Transcript {
        self.transcript.lock().expect("transcript lock").clone()
    }

    pub fn state(&self) -> HandlerState {
        self.state.get()
    }

    /// The fatal receive error observed by the loop, if any. Takes
    /// ownership so the orchestrator reports it exactly once.
    pub fn take_error(&self) -> Option<RealtimeError> {
        self.last_error.lock().expect("error lock").take()
    }

    /// Cancel, then release the underlying streaming session. Idempotent.
    pub async fn close(&self) {
        self.state.advance(HandlerState::Closing);
        self.cancel.cancel();
        if let Err(err) = self.stream.close().await {
            debug!(error = %err, "stream close");
        }
        self.state.advance(HandlerState::Closed);
    }

    fn handle_message(
        &self,
        message: ServerMessage,
        turn: &mut TurnBuffer,
        callbacks: &Arc<HandlerCallbacks>,
        analyzer: &Arc<dyn SentimentAnalyzer>,
    ) {
        let Some(content) = message.server_content else { return };

        if let Some(chunk) = &content.input_transcription {
            turn.push_user(&chunk.text);
            (callbacks.on_transcript)(TranscriptUpdate {
                role: SpeakerRole::User,
                name: self.names.user.clone(),
                content: turn.pending_user.trim().to_string(),
                timestamp: turn.turn_start,
            });
        }

        if let Some(chunk) = &content.output_transcription {
            turn.push_agent(&chunk.text);
            (callbacks.on_transcript)(TranscriptUpdate {
                role: SpeakerRole::Ai,
                name: self.names.agent.clone(),
                content: turn.pending_agent.trim().to_string(),
                timestamp: turn.turn_start,
            });
        }

        if let Some(model_turn) = &content.model_turn {
            for part in &model_turn.parts {
                let Some(inline) = &part.inline_data else { continue };
                match base64::engine::general_purpose::STANDARD.decode(&inline.data) {
                    Ok(bytes) => (callbacks.on_audio)(decode_pcm16_le(&bytes)),
                    Err(err) => warn!(error = %err, "discarding undecodable audio part"),
                }
            }
        }

        if content.turn_complete {
            self.commit_turn(turn, callbacks, analyzer);
        }
    }

    /// Promote accumulated turn text to transcript segments, user first.
    fn commit_turn(
        &self,
        turn: &mut TurnBuffer,
        callbacks: &Arc<HandlerCallbacks>,
        analyzer: &Arc<dyn SentimentAnalyzer>,
    ) {
        let user_text = turn.pending_user.trim().to_string();
        let agent_text = turn.pending_agent.trim().to_string();
        let turn_start = turn.turn_start;

        {
            let mut transcript = self.transcript.lock().expect("transcript lock");
            if !user_text.is_empty() {
                transcript.push(TranscriptSegment {
                    role: SpeakerRole::User,
                    name: self.names.user.clone(),
                    content: user_text.clone(),
                    timestamp: turn_start,
                });
            }
            if !agent_text.is_empty() {
                transcript.push(TranscriptSegment {
                    role: SpeakerRole::Ai,
                    name: self.names.agent.clone(),
                    content: agent_text,
                    timestamp: Utc::now(),
                });
            }
        }

        turn.reset();

        // Fire-and-forget: the analyzer's reply comes back through the
        // sentiment callback; failures are logged, never fatal.
        if !user_text.is_empty() {
            let analyzer = analyzer.clone();
            let callbacks = callbacks.clone();
            let cancel = self.cancel.clone();
            let source = self.names.user.clone();
            tokio::spawn(async move {
                match analyzer.analyze(&cancel, &user_text, &source).await {
                    Ok(record) => (callbacks.on_sentiment)(record),
                    Err(err) => debug!(error = %err, "sentiment analysis failed"),
                }
            });
        }
    }
}

async fn receive_loop(
    handler: Arc<ModelStreamHandler>,
    callbacks: Arc<HandlerCallbacks>,
    analyzer: Arc<dyn SentimentAnalyzer>,
) {
    let mut turn = TurnBuffer::new();

    loop {
        let message = tokio::select! {
            biased;
            _ = handler.cancel.cancelled() => {
                debug!("session scope cancelled, leaving receive loop");
                handler.state.advance(HandlerState::Closing);
                return;
            }
            message = handler.stream.next_message() => message,
        };

        match message {
            None => {
                debug!("model stream ended");
                handler.state.advance(HandlerState::Closing);
                return;
            }
            Some(Err(err)) => {
                if handler.cancel.is_cancelled() {
                    // Expected shutdown.
                    return;
                }
                error!(error = %err, "model receive failed");
                *handler.last_error.lock().expect("error lock") = Some(err);
                handler.state.advance(HandlerState::Closing);
                handler.cancel.cancel();
                return;
            }
            Some(Ok(message)) => {
                handler.handle_message(message, &mut turn, &callbacks, &analyzer);
            }
        }
    }
}

impl std::fmt::Debug for ModelStreamHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelStreamHandler")
            .field("state", &self.state.get())
            .field("segments", &self.transcript.lock().expect("transcript lock").len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_buffer_accumulates_with_leading_space() {
        let mut turn = TurnBuffer::new();
        turn.push_user("hel");
        turn.push_user("lo");
        assert_eq!(turn.pending_user, " hel lo");
        assert_eq!(turn.pending_user.trim(), "hel lo");
    }

    #[test]
    fn test_turn_buffer_ignores_empty_chunks() {
        let mut turn = TurnBuffer::new();
        turn.push_agent("");
        turn.push_agent("hi");
        turn.push_agent("");
        assert_eq!(turn.pending_agent, " hi");
    }

    #[test]
    fn test_turn_buffer_reset_advances_turn_start() {
        let mut turn = TurnBuffer::new();
        let before = turn.turn_start;
        turn.push_user("x");
        turn.reset();
        assert!(turn.pending_user.is_empty());
        assert!(turn.turn_start >= before);
    }

    #[test]
    fn test_state_cell_is_forward_only() {
        let state = StateCell::new(HandlerState::Streaming);
        state.advance(HandlerState::Closed);
        state.advance(HandlerState::Closing);
        assert_eq!(state.get(), HandlerState::Closed);
    }
}
