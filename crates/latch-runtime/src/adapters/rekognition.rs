//! # Rekognition Face Indexer Adapter
//!
//! Implements the [`FaceIndexer`] port against Amazon Rekognition. Faces are
//! indexed from images already uploaded to the blob-store bucket, one
//! collection per `(userId, deviceId)` pair.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::types::{Attribute, Image, S3Object};
use aws_sdk_rekognition::Client;
use serde_json::json;
use tracing::{debug, error, info};

use latch_coordinator::ports::outbound::{FaceIndexer, IndexedFace};
use latch_coordinator::FaceIndexError;
use shared_types::entities::BoundingBox;

/// Rekognition-backed face indexer.
pub struct RekognitionFaceIndexer {
    client: Client,
    /// Bucket holding the source images.
    bucket: String,
}

impl RekognitionFaceIndexer {
    /// Create an indexer using the ambient AWS credential chain.
    pub async fn new(bucket: impl Into<String>) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self {
            client: Client::new(&config),
            bucket: bucket.into(),
        }
    }

    /// Create an indexer from an existing client.
    #[must_use]
    pub fn with_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl FaceIndexer for RekognitionFaceIndexer {
    async fn ensure_collection(&self, collection_id: &str) -> Result<(), FaceIndexError> {
        match self
            .client
            .create_collection()
            .collection_id(collection_id)
            .send()
            .await
        {
            Ok(_) => {
                info!(collection_id, "Collection created");
                Ok(())
            }
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_resource_already_exists_exception() {
                    debug!(collection_id, "Collection already exists");
                    Ok(())
                } else {
                    error!(collection_id, error = %service_error, "Collection creation failed");
                    Err(FaceIndexError::Service(service_error.to_string()))
                }
            }
        }
    }

    async fn index_face(
        &self,
        collection_id: &str,
        image_key: &str,
        external_image_id: &str,
    ) -> Result<IndexedFace, FaceIndexError> {
        let image = Image::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&self.bucket)
                    .name(image_key)
                    .build(),
            )
            .build();

        let response = self
            .client
            .index_faces()
            .collection_id(collection_id)
            .image(image)
            .external_image_id(external_image_id)
            .detection_attributes(Attribute::All)
            .send()
            .await
            .map_err(|e| {
                error!(collection_id, image_key, error = %e, "Face indexing failed");
                FaceIndexError::Service(e.to_string())
            })?;

        let record = response
            .face_records()
            .first()
            .ok_or(FaceIndexError::NoFaceDetected)?;
        let face = record.face().ok_or(FaceIndexError::NoFaceDetected)?;
        let face_id = face
            .face_id()
            .ok_or(FaceIndexError::NoFaceDetected)?
            .to_string();

        let bounding_box = face
            .bounding_box()
            .map(|bb| BoundingBox {
                width: f64::from(bb.width().unwrap_or_default()),
                height: f64::from(bb.height().unwrap_or_default()),
                left: f64::from(bb.left().unwrap_or_default()),
                top: f64::from(bb.top().unwrap_or_default()),
            })
            .unwrap_or_default();
        let confidence = face.confidence().map(f64::from).unwrap_or_default();

        // The detail blob keeps the fields the web client renders; the full
        // detection payload is not persisted.
        let detail = json!({
            "confidence": record
                .face_detail()
                .and_then(|d| d.confidence())
                .map(f64::from),
            "boundingBox": {
                "width": bounding_box.width,
                "height": bounding_box.height,
                "left": bounding_box.left,
                "top": bounding_box.top,
            },
        });

        info!(collection_id, face_id = %face_id, "Face indexed");
        Ok(IndexedFace {
            face_id,
            image_id: face.image_id().unwrap_or_default().to_string(),
            confidence,
            bounding_box,
            detail,
        })
    }

    async fn delete_face(
        &self,
        collection_id: &str,
        face_id: &str,
    ) -> Result<(), FaceIndexError> {
        self.client
            .delete_faces()
            .collection_id(collection_id)
            .face_ids(face_id)
            .send()
            .await
            .map_err(|e| {
                error!(collection_id, face_id, error = %e, "Face deletion failed");
                FaceIndexError::Service(e.to_string())
            })?;

        info!(collection_id, face_id, "Face removed from collection");
        Ok(())
    }
}
