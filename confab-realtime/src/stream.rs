//! Seam between the model stream handler and the wire-level session.

use crate::error::Result;
use crate::gemini::wire::ServerMessage;
use async_trait::async_trait;

/// A connected bidirectional model stream.
///
/// The production implementation is
/// [`GeminiLiveSession`](crate::gemini::GeminiLiveSession); tests drive the
/// handler through an in-memory stream.
#[async_trait]
pub trait ModelStream: Send + Sync {
    /// Push one frame of little-endian PCM16 bytes.
    async fn send_audio(&self, pcm_le: &[u8]) -> Result<()>;

    /// Block on the next server message. `None` means the stream ended.
    async fn next_message(&self) -> Option<Result<ServerMessage>>;

    /// Whether the underlying transport is still up.
    fn is_connected(&self) -> bool;

    /// Release the underlying transport.
    async fn close(&self) -> Result<()>;
}
