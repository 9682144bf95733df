//! Bidirectional streaming-model adapter for meeting sessions.
//!
//! The [`ModelStreamHandler`] pushes PCM16 audio into a realtime generative
//! model and pulls back audio, interleaved input/output transcription and
//! turn-completion events, accumulating per-turn transcript segments along
//! the way. The wire-level Gemini Live session lives in [`gemini`]; the
//! [`ModelStream`] trait is the seam between the two.

pub mod audio;
pub mod error;
pub mod gemini;
pub mod handler;
pub mod stream;

pub use audio::{PCM16_INPUT_MIME, Pcm16Frame, decode_pcm16_le, encode_pcm16_le};
pub use error::{RealtimeError, Result};
pub use gemini::{DEFAULT_REALTIME_MODEL, GeminiLiveConfig, GeminiLiveSession};
pub use handler::{HandlerCallbacks, HandlerState, ModelStreamHandler, SpeakerNames};
pub use stream::ModelStream;
