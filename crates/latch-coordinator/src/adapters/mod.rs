//! Adapters: in-memory implementations of the outbound ports.
//!
//! Suitable for single-node operation and tests. Cloud-backed adapters for
//! the blob store and the face indexer live in the runtime crate.

pub mod memory;
pub mod transport;

pub use memory::{
    MemoryAccessLogRepository, MemoryBlobStore, MemoryDeviceRepository, MemoryFaceIndexer,
    MemoryFaceRepository, MemoryFingerprintRepository, MemoryRfidRepository,
};
pub use transport::{ChannelTransport, PublishedMessage, TransportMessage};
