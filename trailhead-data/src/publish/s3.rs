//! S3-backed [`ArtifactStore`].

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;

use super::{Artifact, ArtifactStore, StoreError};

/// Default region when none is configured.
pub const DEFAULT_REGION: &str = "us-east-1";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for [`S3ArtifactStore`].
#[derive(Debug, Clone)]
pub struct S3StoreConfig {
    /// Destination bucket.
    pub bucket: String,
    /// Bucket region.
    pub region: String,
    /// Connect and read timeout.
    pub timeout: Duration,
}

impl S3StoreConfig {
    /// Settings for `bucket` in [`DEFAULT_REGION`].
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: DEFAULT_REGION.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the bucket region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set the connect and read timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Uploads artefacts to an S3 bucket.
///
/// Credentials come from the default AWS provider chain.
#[derive(Debug, Clone)]
pub struct S3ArtifactStore {
    client: Client,
    bucket: String,
}

impl S3ArtifactStore {
    /// Load shared AWS configuration and build a client for `config`.
    pub async fn new(config: &S3StoreConfig) -> Self {
        let timeouts = TimeoutConfig::builder()
            .connect_timeout(config.timeout)
            .read_timeout(config.timeout)
            .build();
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .timeout_config(timeouts)
            .load()
            .await;
        Self {
            client: Client::from_conf(aws_sdk_s3::Config::from(&shared)),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ArtifactStore for S3ArtifactStore {
    async fn put(&self, artifact: Artifact) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(artifact.key)
            .content_type(artifact.content_type)
            .content_encoding(artifact.content_encoding)
            .body(ByteStream::from(artifact.body))
            .send()
            .await
            .map_err(|err| StoreError::Backend {
                operation: "s3 put_object",
                message: DisplayErrorContext(&err).to_string(),
            })?;
        Ok(())
    }
}
