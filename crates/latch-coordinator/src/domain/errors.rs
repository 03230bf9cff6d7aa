//! # Coordinator Error Types

use thiserror::Error;

use shared_types::RepositoryError;

/// Errors from the device transport port.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Transport publish failed: {0}")]
    Publish(String),

    #[error("Transport subscribe failed: {0}")]
    Subscribe(String),

    #[error("Transport connection lost")]
    Disconnected,
}

/// Errors from the face-recognition service port.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FaceIndexError {
    /// The service found no face in the submitted image.
    #[error("No face detected in the image")]
    NoFaceDetected,

    #[error("Face service error: {0}")]
    Service(String),
}

/// Errors from the blob store port.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlobStoreError {
    #[error("File must be an image, got {0}")]
    NotAnImage(String),

    #[error("Blob store error: {0}")]
    Service(String),
}

/// Coordinator failure taxonomy.
///
/// Every failure is terminal for its workflow instance; there are no retries
/// in the core. The router logs these at its supervisory boundary and the
/// delivery loop continues.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Message body did not deserialize for its topic family.
    #[error("Malformed payload on topic {topic}: {source}")]
    MalformedPayload {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    /// The `mode` literal is not part of the topic family's closed set.
    /// New firmware strings surface here instead of being silently ignored.
    #[error("Unknown mode {mode:?} on topic {topic}")]
    UnknownMode { topic: String, mode: String },

    /// A reply omitted a field the workflow cannot proceed without.
    #[error("Reply missing required field {field}")]
    MissingField { field: &'static str },

    /// A completion message arrived with no pending entry for its key.
    /// The workflow is abandoned; no notification is sent.
    #[error("No pending request for key {key}")]
    CorrelationMiss { key: String },

    /// The pending entry carries no face reference to resolve.
    #[error("Pending request {key} has no face reference")]
    MissingFaceReference { key: String },

    /// No face record exists for the reported `faceId`.
    #[error("Face record not found: {face_id}")]
    FaceNotFound { face_id: String },

    #[error("Device not found: {device_id}")]
    DeviceNotFound { device_id: String },

    /// Lock commands are refused while the device is offline.
    #[error("Device {device_id} is offline")]
    DeviceOffline { device_id: String },

    /// A face cannot be deleted while enrollment artifacts reference it.
    #[error("Face {face_id} is referenced by {dependents} enrollment artifact(s)")]
    FaceInUse { face_id: String, dependents: usize },

    #[error("{kind} not found: {id}")]
    ArtifactNotFound { kind: &'static str, id: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    FaceIndex(#[from] FaceIndexError),

    #[error(transparent)]
    BlobStore(#[from] BlobStoreError),
}
