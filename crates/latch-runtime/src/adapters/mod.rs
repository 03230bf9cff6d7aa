//! Cloud-backed implementations of the coordinator's outbound ports.

pub mod rekognition;
pub mod s3;

pub use rekognition::RekognitionFaceIndexer;
pub use s3::S3BlobStore;
