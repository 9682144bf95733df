//! Configuration snapshots consumed by a session.
//!
//! Loading happens once (typically at process start, `from_env`); the
//! resulting structs are immutable for the lifetime of a session.

use crate::error::{CoreError, Result};

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| CoreError::missing_config(name))
}

/// Connection settings for the LiveKit room service.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Server URL (e.g. `wss://my-project.livekit.cloud`).
    pub host: String,
    /// API key used to mint access tokens and call server APIs.
    pub api_key: String,
    /// API secret paired with the key.
    pub api_secret: String,
}

impl RoomConfig {
    pub fn new(
        host: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self { host: host.into(), api_key: api_key.into(), api_secret: api_secret.into() }
    }

    /// Load from `LIVEKIT_HOST`, `LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: require_env("LIVEKIT_HOST")?,
            api_key: require_env("LIVEKIT_API_KEY")?,
            api_secret: require_env("LIVEKIT_API_SECRET")?,
        })
    }
}

/// Settings for the generative streaming model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Google API key.
    pub api_key: String,
    /// Realtime model identifier. `None` selects the crate default.
    pub realtime_model: Option<String>,
}

impl ModelConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), realtime_model: None }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.realtime_model = Some(model.into());
        self
    }

    /// Load from `GEMINI_API_KEY` and optional `GEMINI_REALTIME_MODEL`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: require_env("GEMINI_API_KEY")?,
            realtime_model: std::env::var("GEMINI_REALTIME_MODEL").ok(),
        })
    }
}

/// Settings for the S3-compatible blob store holding session artifacts.
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
}

impl BlobStoreConfig {
    /// Load from `AWS_REGION`, `AWS_S3_BUCKET`, `AWS_ACCESS_KEY_ID`,
    /// `AWS_SECRET_ACCESS_KEY`.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            region: require_env("AWS_REGION")?,
            bucket: require_env("AWS_S3_BUCKET")?,
            access_key: require_env("AWS_ACCESS_KEY_ID")?,
            secret_key: require_env("AWS_SECRET_ACCESS_KEY")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_builder() {
        let config = ModelConfig::new("key").with_model("models/custom-live");
        assert_eq!(config.api_key, "key");
        assert_eq!(config.realtime_model.as_deref(), Some("models/custom-live"));
    }

    #[test]
    fn test_room_config_new() {
        let config = RoomConfig::new("wss://rooms.example", "api", "secret");
        assert_eq!(config.host, "wss://rooms.example");
        assert_eq!(config.api_secret, "secret");
    }
}
