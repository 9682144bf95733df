//! Transcript persistence in the S3-compatible blob store.

use crate::error::{Result, SessionError};
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use confab_core::{BlobStoreConfig, Transcript};
use tracing::debug;

/// Parse an `s3://bucket/key` URL into its bucket and key.
pub fn parse_s3_url(url: &str) -> Result<(String, String)> {
    let path = url
        .strip_prefix("s3://")
        .ok_or_else(|| SessionError::Storage(format!("invalid S3 URL: {url}")))?;
    match path.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            Ok((bucket.to_string(), key.to_string()))
        }
        _ => Err(SessionError::Storage(format!("invalid S3 URL: {url}"))),
    }
}

/// Reads and writes transcript artifacts.
pub struct TranscriptStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl TranscriptStore {
    pub fn new(config: &BlobStoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "confab-static",
        );
        let s3_config = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .build();

        Self { client: aws_sdk_s3::Client::from_conf(s3_config), bucket: config.bucket.clone() }
    }

    /// The `s3://` URL an object under this store's bucket resolves to.
    pub fn object_url(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    /// Upload a transcript as indented JSON. Returns the artifact URL.
    pub async fn put_transcript(&self, key: &str, transcript: &Transcript) -> Result<String> {
        let bytes = transcript
            .to_json_pretty()
            .map_err(|e| SessionError::Storage(format!("transcript serialize failed: {e}")))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| SessionError::Storage(format!("transcript upload failed: {e}")))?;

        let url = self.object_url(key);
        debug!(url = %url, "transcript uploaded");
        Ok(url)
    }

    /// Fetch and decode a previously persisted transcript.
    pub async fn fetch_transcript(&self, s3_url: &str) -> Result<Transcript> {
        let (bucket, key) = parse_s3_url(s3_url)?;

        let object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| SessionError::Storage(format!("transcript fetch failed: {e}")))?;

        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| SessionError::Storage(format!("transcript read failed: {e}")))?
            .into_bytes();

        Transcript::from_json(&bytes)
            .map_err(|e| SessionError::Storage(format!("transcript decode failed: {e}")))
    }
}
