//! Gemini Live wire protocol and WebSocket session.

pub mod session;
pub mod wire;

pub use session::{GeminiLiveConfig, GeminiLiveSession};

/// Default realtime model (native-audio preview).
pub const DEFAULT_REALTIME_MODEL: &str = "models/gemini-2.5-flash-native-audio-preview-09-2025";

/// Gemini Live WebSocket endpoint.
pub const GEMINI_LIVE_URL: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
