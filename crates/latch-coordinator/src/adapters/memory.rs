//! # In-Memory Repositories and Service Stubs
//!
//! `RwLock<Vec<_>>`-backed implementations of the datastore ports, plus
//! in-memory stand-ins for the face indexer and blob store.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::json;
use uuid::Uuid;

use shared_types::entities::{
    AccessLogRecord, AccessType, BoundingBox, Device, FaceRecord, FingerprintRecord,
    RfidCardRecord,
};
use shared_types::RepositoryError;

use crate::domain::errors::{BlobStoreError, FaceIndexError};
use crate::ports::outbound::{
    AccessLogRepository, BlobMetadata, BlobStore, DeviceRepository, FaceIndexer, FaceRepository,
    FingerprintRepository, IndexedFace, RfidRepository,
};

/// In-memory device collection.
#[derive(Default)]
pub struct MemoryDeviceRepository {
    devices: RwLock<Vec<Device>>,
}

impl MemoryDeviceRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceRepository for MemoryDeviceRepository {
    async fn insert(&self, device: Device) -> Result<(), RepositoryError> {
        let mut devices = self.devices.write();
        if devices.iter().any(|d| d.device_id == device.device_id) {
            return Err(RepositoryError::Duplicate {
                field: "deviceId".into(),
                value: device.device_id,
            });
        }
        if devices.iter().any(|d| d.mac_address == device.mac_address) {
            return Err(RepositoryError::Duplicate {
                field: "macAddress".into(),
                value: device.mac_address,
            });
        }
        devices.push(device);
        Ok(())
    }

    async fn find_by_device_id(&self, device_id: &str) -> Result<Option<Device>, RepositoryError> {
        Ok(self
            .devices
            .read()
            .iter()
            .find(|d| d.device_id == device_id)
            .cloned())
    }

    async fn find_by_mac(&self, mac_address: &str) -> Result<Option<Device>, RepositoryError> {
        Ok(self
            .devices
            .read()
            .iter()
            .find(|d| d.mac_address == mac_address)
            .cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Device>, RepositoryError> {
        Ok(self
            .devices
            .read()
            .iter()
            .filter(|d| d.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_user_and_device(
        &self,
        user_id: &str,
        device_id: &str,
    ) -> Result<Option<Device>, RepositoryError> {
        Ok(self
            .devices
            .read()
            .iter()
            .find(|d| d.user_id == user_id && d.device_id == device_id)
            .cloned())
    }

    async fn update(&self, device: &Device) -> Result<(), RepositoryError> {
        let mut devices = self.devices.write();
        match devices.iter_mut().find(|d| d.device_id == device.device_id) {
            Some(stored) => {
                *stored = device.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(device.device_id.clone())),
        }
    }

    async fn delete(&self, user_id: &str, device_id: &str) -> Result<bool, RepositoryError> {
        let mut devices = self.devices.write();
        let before = devices.len();
        devices.retain(|d| !(d.user_id == user_id && d.device_id == device_id));
        Ok(devices.len() < before)
    }

    async fn all(&self) -> Result<Vec<Device>, RepositoryError> {
        Ok(self.devices.read().clone())
    }
}

/// In-memory face collection.
#[derive(Default)]
pub struct MemoryFaceRepository {
    records: RwLock<Vec<FaceRecord>>,
}

impl MemoryFaceRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FaceRepository for MemoryFaceRepository {
    async fn insert(&self, record: FaceRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write();
        if records.iter().any(|r| r.face_id == record.face_id) {
            return Err(RepositoryError::Duplicate {
                field: "faceId".into(),
                value: record.face_id,
            });
        }
        records.push(record);
        Ok(())
    }

    async fn find_by_face_id(&self, face_id: &str) -> Result<Option<FaceRecord>, RepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| r.face_id == face_id)
            .cloned())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Option<FaceRecord>, RepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| r.user_id == user_id)
            .cloned())
    }

    async fn delete_by_face_id(&self, face_id: &str) -> Result<bool, RepositoryError> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.face_id != face_id);
        Ok(records.len() < before)
    }
}

/// In-memory fingerprint collection.
#[derive(Default)]
pub struct MemoryFingerprintRepository {
    records: RwLock<Vec<FingerprintRecord>>,
}

impl MemoryFingerprintRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FingerprintRepository for MemoryFingerprintRepository {
    async fn insert(&self, record: FingerprintRecord) -> Result<(), RepositoryError> {
        self.records.write().push(record);
        Ok(())
    }

    async fn find_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<FingerprintRecord>, RepositoryError> {
        let mut records: Vec<FingerprintRecord> = self
            .records
            .read()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn delete(
        &self,
        user_id: &str,
        device_id: &str,
        fingerprint_id: &str,
    ) -> Result<Option<FingerprintRecord>, RepositoryError> {
        let mut records = self.records.write();
        let position = records.iter().position(|r| {
            r.user_id == user_id && r.device_id == device_id && r.fingerprint_id == fingerprint_id
        });
        Ok(position.map(|i| records.remove(i)))
    }

    async fn count_for_face(&self, face_id: &str) -> Result<usize, RepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.face_id == face_id)
            .count())
    }
}

/// In-memory RFID card collection.
#[derive(Default)]
pub struct MemoryRfidRepository {
    records: RwLock<Vec<RfidCardRecord>>,
}

impl MemoryRfidRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RfidRepository for MemoryRfidRepository {
    async fn insert(&self, record: RfidCardRecord) -> Result<(), RepositoryError> {
        self.records.write().push(record);
        Ok(())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<RfidCardRecord>, RepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete(
        &self,
        user_id: &str,
        device_id: &str,
        rfid_id: &str,
    ) -> Result<Option<RfidCardRecord>, RepositoryError> {
        let mut records = self.records.write();
        let position = records
            .iter()
            .position(|r| r.user_id == user_id && r.device_id == device_id && r.rfid_id == rfid_id);
        Ok(position.map(|i| records.remove(i)))
    }

    async fn count_for_face(&self, face_id: &str) -> Result<usize, RepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| r.face_id == face_id)
            .count())
    }
}

/// In-memory access-log collection.
#[derive(Default)]
pub struct MemoryAccessLogRepository {
    records: RwLock<Vec<AccessLogRecord>>,
}

impl MemoryAccessLogRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, for assertions on dedup behavior.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl AccessLogRepository for MemoryAccessLogRepository {
    async fn insert(&self, record: AccessLogRecord) -> Result<(), RepositoryError> {
        self.records.write().push(record);
        Ok(())
    }

    async fn update(&self, record: &AccessLogRecord) -> Result<(), RepositoryError> {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(record.id.to_string())),
        }
    }

    async fn latest_pending(
        &self,
        user_id: &str,
        device_id: &str,
        access_type: AccessType,
    ) -> Result<Option<AccessLogRecord>, RepositoryError> {
        Ok(self
            .records
            .read()
            .iter()
            .filter(|r| {
                r.is_pending()
                    && r.user_id == user_id
                    && r.device_id == device_id
                    && r.access_type == access_type
            })
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn all(&self) -> Result<Vec<AccessLogRecord>, RepositoryError> {
        let mut records = self.records.read().clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

/// In-memory face indexer.
///
/// Collections are created implicitly on first index so tests do not have to
/// call `ensure_collection` first.
#[derive(Default)]
pub struct MemoryFaceIndexer {
    collections: RwLock<HashMap<String, Vec<String>>>,
}

impl MemoryFaceIndexer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Face ids indexed in a collection.
    #[must_use]
    pub fn faces_in(&self, collection_id: &str) -> Vec<String> {
        self.collections
            .read()
            .get(collection_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl FaceIndexer for MemoryFaceIndexer {
    async fn ensure_collection(&self, collection_id: &str) -> Result<(), FaceIndexError> {
        self.collections
            .write()
            .entry(collection_id.to_string())
            .or_default();
        Ok(())
    }

    async fn index_face(
        &self,
        collection_id: &str,
        image_key: &str,
        external_image_id: &str,
    ) -> Result<IndexedFace, FaceIndexError> {
        let face_id = Uuid::new_v4().to_string();
        self.collections
            .write()
            .entry(collection_id.to_string())
            .or_default()
            .push(face_id.clone());

        Ok(IndexedFace {
            face_id,
            image_id: Uuid::new_v4().to_string(),
            confidence: 99.9,
            bounding_box: BoundingBox {
                width: 0.5,
                height: 0.5,
                left: 0.25,
                top: 0.25,
            },
            detail: json!({
                "imageKey": image_key,
                "externalImageId": external_image_id,
            }),
        })
    }

    async fn delete_face(
        &self,
        collection_id: &str,
        face_id: &str,
    ) -> Result<(), FaceIndexError> {
        let mut collections = self.collections.write();
        if let Some(faces) = collections.get_mut(collection_id) {
            faces.retain(|f| f != face_id);
        }
        Ok(())
    }
}

/// In-memory blob store.
pub struct MemoryBlobStore {
    bucket: String,
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Whether an object exists under `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    fn object_url(&self, key: &str) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.bucket, key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_image(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        _metadata: &BlobMetadata,
    ) -> Result<String, BlobStoreError> {
        if !content_type.starts_with("image/") {
            return Err(BlobStoreError::NotAnImage(content_type.to_string()));
        }
        self.objects.write().insert(key.to_string(), bytes);
        Ok(self.object_url(key))
    }

    async fn presigned_get_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, BlobStoreError> {
        let expires_at = Utc::now() + chrono::Duration::seconds(expires_in.as_secs() as i64);
        Ok(format!(
            "{}?expires={}",
            self.object_url(key),
            expires_at.timestamp()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_device_uniqueness_enforced() {
        let repo = MemoryDeviceRepository::new();
        repo.insert(Device::new("u1", "d1", "mac1", "k")).await.unwrap();

        let dup_id = repo.insert(Device::new("u2", "d1", "mac2", "k")).await;
        assert!(matches!(dup_id, Err(RepositoryError::Duplicate { .. })));

        let dup_mac = repo.insert(Device::new("u2", "d2", "mac1", "k")).await;
        assert!(matches!(dup_mac, Err(RepositoryError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn test_latest_pending_picks_most_recent() {
        let repo = MemoryAccessLogRepository::new();
        let mut older = AccessLogRecord::pending_image("u1", "d1", "https://a", "a");
        older.created_at = Utc::now() - chrono::Duration::minutes(5);
        repo.insert(older).await.unwrap();

        let newer = AccessLogRecord::pending_image("u1", "d1", "https://b", "b");
        let newer_id = newer.id;
        repo.insert(newer).await.unwrap();

        let found = repo
            .latest_pending("u1", "d1", AccessType::FaceId)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, newer_id);
    }

    #[tokio::test]
    async fn test_blob_store_rejects_non_images() {
        let store = MemoryBlobStore::new("bucket");
        let meta = BlobMetadata {
            user_name: "Ada".into(),
            kind: "registered-face".into(),
            timestamp: "0".into(),
        };
        let result = store
            .put_image("k", vec![1, 2, 3], "application/pdf", &meta)
            .await;
        assert!(matches!(result, Err(BlobStoreError::NotAnImage(_))));
    }
}
