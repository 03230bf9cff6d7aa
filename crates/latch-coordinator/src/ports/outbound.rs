//! Outbound ports (SPI) for the coordinator.
//!
//! The transport, the datastore collections, the face-recognition service,
//! and the blob store are external collaborators; the coordinator depends on
//! these contracts only. Adapters live in [`crate::adapters`] (in-memory) and
//! in the runtime crate (cloud-backed).

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use shared_types::entities::{
    AccessLogRecord, AccessType, BoundingBox, Device, FaceRecord, FingerprintRecord,
    RfidCardRecord,
};
use shared_types::RepositoryError;

use crate::domain::errors::{BlobStoreError, FaceIndexError, TransportError};

/// Pub/sub device-messaging transport.
///
/// The transport preserves per-connection ordering and delivers one message
/// at a time; delivery itself is owned by the runtime's consumer loop, so the
/// port only covers the outbound half.
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    /// Publish a JSON payload to a topic.
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), TransportError>;

    /// Subscribe to a topic. Idempotence is the caller's concern (see
    /// [`crate::subscriptions::SubscriptionManager`]).
    async fn subscribe(&self, topic: &str) -> Result<(), TransportError>;
}

/// Device collection.
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn insert(&self, device: Device) -> Result<(), RepositoryError>;

    async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Device>, RepositoryError>;

    async fn find_by_mac(&self, mac_address: &str) -> Result<Option<Device>, RepositoryError>;

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Device>, RepositoryError>;

    async fn find_by_user_and_device(
        &self,
        user_id: &str,
        device_id: &str,
    ) -> Result<Option<Device>, RepositoryError>;

    /// Replace the stored record matching `device.device_id`.
    async fn update(&self, device: &Device) -> Result<(), RepositoryError>;

    /// Returns whether a record was removed.
    async fn delete(&self, user_id: &str, device_id: &str) -> Result<bool, RepositoryError>;

    async fn all(&self) -> Result<Vec<Device>, RepositoryError>;
}

/// Face enrollment collection.
#[async_trait]
pub trait FaceRepository: Send + Sync {
    async fn insert(&self, record: FaceRecord) -> Result<(), RepositoryError>;

    async fn find_by_face_id(&self, face_id: &str) -> Result<Option<FaceRecord>, RepositoryError>;

    async fn find_by_user(&self, user_id: &str) -> Result<Option<FaceRecord>, RepositoryError>;

    /// Returns whether a record was removed.
    async fn delete_by_face_id(&self, face_id: &str) -> Result<bool, RepositoryError>;
}

/// Fingerprint enrollment collection.
#[async_trait]
pub trait FingerprintRepository: Send + Sync {
    async fn insert(&self, record: FingerprintRecord) -> Result<(), RepositoryError>;

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<FingerprintRecord>, RepositoryError>;

    /// Remove one record; returns it when found.
    async fn delete(
        &self,
        user_id: &str,
        device_id: &str,
        fingerprint_id: &str,
    ) -> Result<Option<FingerprintRecord>, RepositoryError>;

    /// Number of records referencing `face_id`.
    async fn count_for_face(&self, face_id: &str) -> Result<usize, RepositoryError>;
}

/// RFID card enrollment collection.
#[async_trait]
pub trait RfidRepository: Send + Sync {
    async fn insert(&self, record: RfidCardRecord) -> Result<(), RepositoryError>;

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<RfidCardRecord>, RepositoryError>;

    /// Remove one record; returns it when found.
    async fn delete(
        &self,
        user_id: &str,
        device_id: &str,
        rfid_id: &str,
    ) -> Result<Option<RfidCardRecord>, RepositoryError>;

    /// Number of records referencing `face_id`.
    async fn count_for_face(&self, face_id: &str) -> Result<usize, RepositoryError>;
}

/// Access-log collection.
#[async_trait]
pub trait AccessLogRepository: Send + Sync {
    async fn insert(&self, record: AccessLogRecord) -> Result<(), RepositoryError>;

    /// Replace the stored record matching `record.id`.
    async fn update(&self, record: &AccessLogRecord) -> Result<(), RepositoryError>;

    /// Most recent open PENDING record for `(userId, deviceId, accessType)`.
    async fn latest_pending(
        &self,
        user_id: &str,
        device_id: &str,
        access_type: AccessType,
    ) -> Result<Option<AccessLogRecord>, RepositoryError>;

    /// All records, most recent first.
    async fn all(&self) -> Result<Vec<AccessLogRecord>, RepositoryError>;
}

/// A face successfully indexed by the recognition service.
#[derive(Debug, Clone)]
pub struct IndexedFace {
    pub face_id: String,
    pub image_id: String,
    /// Detection confidence, percent.
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    /// Service-specific detail blob, stored verbatim on the face record.
    pub detail: Value,
}

/// Cloud face-recognition service.
#[async_trait]
pub trait FaceIndexer: Send + Sync {
    /// Create the collection if it does not exist yet.
    async fn ensure_collection(&self, collection_id: &str) -> Result<(), FaceIndexError>;

    /// Index the face found in a previously uploaded image.
    async fn index_face(
        &self,
        collection_id: &str,
        image_key: &str,
        external_image_id: &str,
    ) -> Result<IndexedFace, FaceIndexError>;

    /// Remove a face from a collection.
    async fn delete_face(&self, collection_id: &str, face_id: &str)
        -> Result<(), FaceIndexError>;
}

/// Metadata attached to an uploaded image.
#[derive(Debug, Clone)]
pub struct BlobMetadata {
    pub user_name: String,
    /// Upload kind tag, e.g. `registered-face`.
    pub kind: String,
    /// Milliseconds since epoch, as a string.
    pub timestamp: String,
}

/// Object blob store for enrollment and capture images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store an image and return its public URL.
    async fn put_image(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        metadata: &BlobMetadata,
    ) -> Result<String, BlobStoreError>;

    /// Time-limited download URL for a stored object.
    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, BlobStoreError>;
}
