//! # S3 Blob Store Adapter
//!
//! Implements the [`BlobStore`] port against S3: enrollment and capture
//! images are stored with user-name/type/timestamp metadata, and downloads
//! go through presigned GET URLs so the bucket stays private.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, error};

use latch_coordinator::ports::outbound::{BlobMetadata, BlobStore};
use latch_coordinator::BlobStoreError;

/// S3-backed blob store.
pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    /// Create a store using the ambient AWS credential chain.
    pub async fn new(bucket: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self {
            client: Client::new(&config),
            bucket: bucket.into(),
        }
    }

    /// Create a store from an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.bucket, key)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put_image(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &BlobMetadata,
    ) -> Result<String, BlobStoreError> {
        if !content_type.starts_with("image/") {
            return Err(BlobStoreError::NotAnImage(content_type.to_string()));
        }

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .metadata("user-name", &metadata.user_name)
            .metadata("type", &metadata.kind)
            .metadata("timestamp", &metadata.timestamp)
            .send()
            .await
            .map_err(|e| {
                error!(bucket = %self.bucket, key, error = %e, "S3 upload failed");
                BlobStoreError::Service(e.to_string())
            })?;

        debug!(bucket = %self.bucket, key, "Image uploaded");
        Ok(self.object_url(key))
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, BlobStoreError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| BlobStoreError::Service(e.to_string()))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                error!(bucket = %self.bucket, key, error = %e, "Presigning failed");
                BlobStoreError::Service(e.to_string())
            })?;

        Ok(request.uri().to_string())
    }
}
