//! # Runtime Wiring and Consumer Loop
//!
//! Builds the coordinator over concrete adapters and owns the two background
//! tasks: the transport consumer loop and the pending-request sweep.
//!
//! ## Delivery Model
//!
//! The consumer loop pulls exactly one delivery at a time and awaits the
//! router before pulling the next, so handler executions are serialized per
//! connection. The router's dispatch is the supervisory boundary: a failed
//! delivery is logged and the loop continues.

use std::sync::Arc;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use latch_coordinator::adapters::memory::{
    MemoryAccessLogRepository, MemoryBlobStore, MemoryDeviceRepository, MemoryFaceIndexer,
    MemoryFaceRepository, MemoryFingerprintRepository, MemoryRfidRepository,
};
use latch_coordinator::adapters::transport::ChannelTransport;
use latch_coordinator::ports::outbound::{BlobStore, FaceIndexer};
use latch_coordinator::{Coordinator, FaceRegistry, MessageRouter, Repositories};
use shared_notify::BroadcastNotifyHub;

use crate::adapters::{RekognitionFaceIndexer, S3BlobStore};
use crate::config::LatchConfig;

/// Fallback bucket name used by the in-memory blob store.
const LOCAL_BUCKET: &str = "latch-local";

/// The assembled coordinator daemon.
pub struct LatchRuntime {
    config: LatchConfig,
    coordinator: Arc<Coordinator>,
    face_registry: Arc<FaceRegistry>,
    router: Arc<MessageRouter<Coordinator>>,
    transport: Arc<ChannelTransport>,
    hub: Arc<BroadcastNotifyHub>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl LatchRuntime {
    /// Wire the coordinator to its adapters. With `LATCH_S3_BUCKET` set, the
    /// blob store and face indexer talk to AWS; otherwise everything stays
    /// in-process.
    pub async fn new(config: LatchConfig) -> Self {
        let devices = Arc::new(MemoryDeviceRepository::new());
        let faces = Arc::new(MemoryFaceRepository::new());
        let fingerprints = Arc::new(MemoryFingerprintRepository::new());
        let rfid_cards = Arc::new(MemoryRfidRepository::new());
        let access_logs = Arc::new(MemoryAccessLogRepository::new());

        let transport = Arc::new(ChannelTransport::new());
        let hub = Arc::new(BroadcastNotifyHub::new());

        let (blobs, indexer): (Arc<dyn BlobStore>, Arc<dyn FaceIndexer>) =
            match &config.s3_bucket {
                Some(bucket) => {
                    info!(bucket, "Using AWS blob store and face indexer");
                    (
                        Arc::new(S3BlobStore::new(bucket.clone()).await),
                        Arc::new(RekognitionFaceIndexer::new(bucket.clone()).await),
                    )
                }
                None => {
                    info!("No bucket configured, using in-memory blob store and face indexer");
                    (
                        Arc::new(MemoryBlobStore::new(LOCAL_BUCKET)),
                        Arc::new(MemoryFaceIndexer::new()),
                    )
                }
            };

        let coordinator = Arc::new(Coordinator::new(
            Repositories {
                devices,
                faces: faces.clone(),
                fingerprints: fingerprints.clone(),
                rfid_cards: rfid_cards.clone(),
                access_logs,
            },
            transport.clone(),
            hub.clone(),
        ));
        let face_registry = Arc::new(FaceRegistry::new(
            faces,
            fingerprints,
            rfid_cards,
            indexer,
            blobs,
        ));
        let router = Arc::new(MessageRouter::new(coordinator.clone()));

        Self {
            config,
            coordinator,
            face_registry,
            router,
            transport,
            hub,
            tasks: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Resync subscriptions and start the background tasks.
    pub async fn start(&self) -> Result<()> {
        let resubscribed = self.coordinator.resync_subscriptions().await?;
        info!(resubscribed, "Transport session initialized");

        let router = self.router.clone();
        let transport = self.transport.clone();
        let consumer = tokio::spawn(async move {
            while let Some(delivery) = transport.next_delivery().await {
                router.dispatch(&delivery.topic, &delivery.payload).await;
            }
            warn!("Transport delivery channel closed");
        });
        self.tasks.lock().push(consumer);

        if let Some(ttl) = self.config.pending_ttl {
            let coordinator = self.coordinator.clone();
            let interval = self.config.sweep_interval;
            let sweeper = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    coordinator.expire_pending(ttl).await;
                }
            });
            self.tasks.lock().push(sweeper);
        }

        info!("Coordinator running");
        Ok(())
    }

    /// Stop the background tasks.
    pub async fn shutdown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        info!(
            pending = self.coordinator.pending_count(),
            "Coordinator stopped (in-flight correlation state dropped)"
        );
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn face_registry(&self) -> &Arc<FaceRegistry> {
        &self.face_registry
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<ChannelTransport> {
        &self.transport
    }

    #[must_use]
    pub fn notify_hub(&self) -> &Arc<BroadcastNotifyHub> {
        &self.hub
    }
}
