//! # Face Registry
//!
//! Face enrollment against the cloud face-recognition service: image upload,
//! collection management, indexing, and the dependency-gated deletion.
//!
//! Faces are the root of a user's enrollment artifacts; fingerprints and
//! RFID cards reference the authorizing `faceId`, so a face cannot be
//! deleted while any of them still exists.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::info;

use shared_types::entities::FaceRecord;

use crate::domain::errors::CoordinatorError;
use crate::ports::outbound::{
    BlobMetadata, BlobStore, FaceIndexer, FaceRepository, FingerprintRepository, RfidRepository,
};

/// An uploaded enrollment image.
#[derive(Debug, Clone)]
pub struct FaceEnrollmentImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Face registration request from the request layer.
#[derive(Debug, Clone)]
pub struct RegisterFace {
    pub user_id: String,
    pub device_id: String,
    pub user_name: String,
    /// Display name for the image; defaults to the upload file name.
    pub image_name: Option<String>,
    pub image: FaceEnrollmentImage,
}

/// Face enrollment service over the cloud-recognition and blob-store ports.
pub struct FaceRegistry {
    faces: Arc<dyn FaceRepository>,
    fingerprints: Arc<dyn FingerprintRepository>,
    rfid_cards: Arc<dyn RfidRepository>,
    indexer: Arc<dyn FaceIndexer>,
    blobs: Arc<dyn BlobStore>,
}

impl FaceRegistry {
    #[must_use]
    pub fn new(
        faces: Arc<dyn FaceRepository>,
        fingerprints: Arc<dyn FingerprintRepository>,
        rfid_cards: Arc<dyn RfidRepository>,
        indexer: Arc<dyn FaceIndexer>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            faces,
            fingerprints,
            rfid_cards,
            indexer,
            blobs,
        }
    }

    /// Per-device collection identifier.
    #[must_use]
    pub fn collection_id(user_id: &str, device_id: &str) -> String {
        format!("smartlock-{user_id}-{device_id}")
    }

    /// Create the per-device collection, tolerating an existing one.
    pub async fn ensure_collection(
        &self,
        user_id: &str,
        device_id: &str,
    ) -> Result<String, CoordinatorError> {
        let collection = Self::collection_id(user_id, device_id);
        self.indexer.ensure_collection(&collection).await?;
        Ok(collection)
    }

    /// Upload the enrollment image, index the face, and persist the record.
    pub async fn register_face(&self, request: RegisterFace) -> Result<FaceRecord, CoordinatorError> {
        let RegisterFace {
            user_id,
            device_id,
            user_name,
            image_name,
            image,
        } = request;

        let image_key = format!("users/{user_id}/faces/{device_id}/{}", image.file_name);
        let metadata = BlobMetadata {
            user_name: user_name.clone(),
            kind: "registered-face".into(),
            timestamp: Utc::now().timestamp_millis().to_string(),
        };
        let s3_url = self
            .blobs
            .put_image(&image_key, image.bytes, &image.content_type, &metadata)
            .await?;

        let collection = Self::collection_id(&user_id, &device_id);
        let external_id = sanitize_external_image_id(&user_name);
        let indexed = self
            .indexer
            .index_face(&collection, &image_key, &external_id)
            .await?;

        let now = Utc::now();
        let record = FaceRecord {
            image_key,
            user_name,
            user_id,
            device_id,
            image_name: image_name.unwrap_or(image.file_name),
            s3_url: Some(s3_url),
            face_id: indexed.face_id,
            image_id: indexed.image_id,
            confidence: indexed.confidence,
            bounding_box: indexed.bounding_box,
            face_detail: indexed.detail,
            created_at: now,
            updated_at: now,
        };
        self.faces.insert(record.clone()).await?;

        info!(
            face_id = %record.face_id,
            user_id = %record.user_id,
            collection = %collection,
            "Face indexed and saved"
        );
        Ok(record)
    }

    /// Delete a face from the collection and the datastore.
    ///
    /// # Errors
    ///
    /// Refused with [`CoordinatorError::FaceInUse`] while fingerprint or
    /// RFID records still reference the face.
    pub async fn delete_face(
        &self,
        user_id: &str,
        device_id: &str,
        face_id: &str,
    ) -> Result<(), CoordinatorError> {
        let fingerprints = self.fingerprints.count_for_face(face_id).await?;
        let cards = self.rfid_cards.count_for_face(face_id).await?;
        let dependents = fingerprints + cards;
        if dependents > 0 {
            return Err(CoordinatorError::FaceInUse {
                face_id: face_id.to_string(),
                dependents,
            });
        }

        self.indexer
            .delete_face(&Self::collection_id(user_id, device_id), face_id)
            .await?;

        if !self.faces.delete_by_face_id(face_id).await? {
            return Err(CoordinatorError::ArtifactNotFound {
                kind: "Face",
                id: face_id.to_string(),
            });
        }

        info!(face_id, user_id, "Face deleted");
        Ok(())
    }

    /// The enrolled face for a user, when one exists.
    pub async fn face_for_user(&self, user_id: &str) -> Result<Option<FaceRecord>, CoordinatorError> {
        Ok(self.faces.find_by_user(user_id).await?)
    }

    /// Time-limited download URL for a stored image.
    pub async fn presigned_image_url(
        &self,
        key: &str,
        expires_in: Duration,
    ) -> Result<String, CoordinatorError> {
        Ok(self.blobs.presigned_get_url(key, expires_in).await?)
    }
}

/// Reduce a display name to the character set the recognition service
/// accepts for external image ids: ASCII alphanumerics plus `_ . - :`,
/// whitespace removed.
fn sanitize_external_image_id(user_name: &str) -> String {
    user_name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | ':'))
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}
