//! # Coordinator Service
//!
//! The main service implementation: enrollment workflow engines, lock-state
//! reconciliation, access-log recording, and the device directory, all driven
//! either by the request layer or by the [`crate::router::MessageRouter`].
//!
//! ## State
//!
//! The coordinator owns the two pending-request tables (fingerprint, RFID)
//! and the subscription manager explicitly; nothing is module-global, so
//! every test gets fresh state by constructing a fresh coordinator.
//!
//! ## Failure Semantics
//!
//! Every failure is terminal for its workflow instance; recovery requires
//! the client or device to re-initiate the request. Correlation misses and
//! referential misses abandon the workflow without notifying clients;
//! business rejections and persistence failures after correlation surface as
//! ERROR-status notifications.

pub mod access_log;
pub mod device;
pub mod face;
pub mod fingerprint;
pub mod rfid;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use shared_notify::ClientNotifier;
use shared_types::messages::{
    DeviceDeleteReply, FingerprintDeleteReply, FingerprintReply, ImageUploadResult,
    LockStateReport, RecentAccessReport, RfidDeleteReply, RfidReply, SystemLockReport,
};
use shared_types::notifications::{FingerprintDeleted, FingerprintSaved, RfidCardDeleted, RfidCardSaved};
use shared_types::{ClientEvent, EventStatus};

use crate::domain::errors::CoordinatorError;
use crate::domain::pending::{PendingEnrollment, PendingStore};
use crate::ports::inbound::{DeviceMessageHandler, TopicScope};
use crate::ports::outbound::{
    AccessLogRepository, DeviceRepository, DeviceTransport, FaceRepository,
    FingerprintRepository, RfidRepository,
};
use crate::subscriptions::SubscriptionManager;

pub use device::NewDevice;

/// The datastore collections the coordinator writes to.
pub struct Repositories {
    pub devices: Arc<dyn DeviceRepository>,
    pub faces: Arc<dyn FaceRepository>,
    pub fingerprints: Arc<dyn FingerprintRepository>,
    pub rfid_cards: Arc<dyn RfidRepository>,
    pub access_logs: Arc<dyn AccessLogRepository>,
}

/// The message-correlation and event-dispatch core.
pub struct Coordinator {
    pub(crate) devices: Arc<dyn DeviceRepository>,
    pub(crate) faces: Arc<dyn FaceRepository>,
    pub(crate) fingerprints: Arc<dyn FingerprintRepository>,
    pub(crate) rfid_cards: Arc<dyn RfidRepository>,
    pub(crate) access_logs: Arc<dyn AccessLogRepository>,
    pub(crate) transport: Arc<dyn DeviceTransport>,
    pub(crate) notifier: Arc<dyn ClientNotifier>,
    pub(crate) subscriptions: SubscriptionManager,
    pub(crate) fingerprint_requests: PendingStore<PendingEnrollment>,
    pub(crate) rfid_requests: PendingStore<PendingEnrollment>,
}

impl Coordinator {
    #[must_use]
    pub fn new(
        repositories: Repositories,
        transport: Arc<dyn DeviceTransport>,
        notifier: Arc<dyn ClientNotifier>,
    ) -> Self {
        Self {
            devices: repositories.devices,
            faces: repositories.faces,
            fingerprints: repositories.fingerprints,
            rfid_cards: repositories.rfid_cards,
            access_logs: repositories.access_logs,
            subscriptions: SubscriptionManager::new(transport.clone()),
            transport,
            notifier,
            fingerprint_requests: PendingStore::new(),
            rfid_requests: PendingStore::new(),
        }
    }

    /// The subscription manager owned by this coordinator.
    #[must_use]
    pub fn subscriptions(&self) -> &SubscriptionManager {
        &self.subscriptions
    }

    /// Connect-time resync: subscribe every persisted device's default
    /// topics. Required because transport subscriptions do not survive a
    /// reconnect.
    pub async fn resync_subscriptions(&self) -> Result<usize, CoordinatorError> {
        self.subscriptions
            .sync_device_defaults(self.devices.as_ref())
            .await
    }

    /// Open correlation entries across both workflow tables.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.fingerprint_requests.len() + self.rfid_requests.len()
    }

    /// Evict correlation entries older than `max_age` and notify clients
    /// that the workflows timed out. A device that accepted a request and
    /// never completed it otherwise leaks its entry forever.
    pub async fn expire_pending(&self, max_age: Duration) {
        for (key, entry) in self.fingerprint_requests.sweep_expired(max_age) {
            warn!(key = %key, "Expiring stale fingerprint request");
            let event = match entry.artifact_id {
                None => ClientEvent::FingerprintSaved(FingerprintSaved {
                    user_id: entry.user_id,
                    device_id: entry.device_id,
                    face_id: entry.face_id,
                    user_name: None,
                    fingerprint_id: None,
                    fingerprint_template: None,
                    status: EventStatus::Error,
                    error: Some("ENROLLMENT_TIMEOUT".into()),
                }),
                Some(fingerprint_id) => ClientEvent::FingerprintDeleted(FingerprintDeleted {
                    user_id: entry.user_id,
                    device_id: entry.device_id,
                    fingerprint_id: Some(fingerprint_id),
                    face_id: entry.face_id,
                    status: EventStatus::Error,
                    error: Some("DELETION_TIMEOUT".into()),
                }),
            };
            self.notifier.notify_all(event).await;
        }

        for (key, entry) in self.rfid_requests.sweep_expired(max_age) {
            warn!(key = %key, "Expiring stale RFID request");
            let event = match entry.artifact_id {
                None => ClientEvent::RfidCardSaved(RfidCardSaved {
                    user_id: entry.user_id,
                    device_id: entry.device_id,
                    face_id: entry.face_id,
                    user_name: None,
                    rfid_id: None,
                    rfid_id_length: None,
                    status: EventStatus::Error,
                    error: Some("ENROLLMENT_TIMEOUT".into()),
                }),
                Some(rfid_id) => ClientEvent::RfidCardDeleted(RfidCardDeleted {
                    user_id: entry.user_id,
                    device_id: entry.device_id,
                    rfid_id: Some(rfid_id),
                    face_id: entry.face_id,
                    status: EventStatus::Error,
                    error: Some("DELETION_TIMEOUT".into()),
                }),
            };
            self.notifier.notify_all(event).await;
        }
    }

    /// Serialize a command payload for publishing.
    pub(crate) fn encode<T: Serialize>(payload: &T) -> Value {
        serde_json::to_value(payload).unwrap_or(Value::Null)
    }
}

#[async_trait]
impl DeviceMessageHandler for Coordinator {
    async fn on_lock_state_report(&self, report: LockStateReport) -> Result<(), CoordinatorError> {
        self.handle_lock_state_report(report).await
    }

    async fn on_device_delete_reply(
        &self,
        scope: TopicScope,
        reply: DeviceDeleteReply,
    ) -> Result<(), CoordinatorError> {
        self.handle_device_delete_reply(scope, reply).await
    }

    async fn on_fingerprint_reply(
        &self,
        scope: TopicScope,
        reply: FingerprintReply,
    ) -> Result<(), CoordinatorError> {
        self.handle_fingerprint_reply(scope, reply).await
    }

    async fn on_fingerprint_delete_reply(
        &self,
        scope: TopicScope,
        reply: FingerprintDeleteReply,
    ) -> Result<(), CoordinatorError> {
        self.handle_fingerprint_delete_reply(scope, reply).await
    }

    async fn on_rfid_reply(
        &self,
        scope: TopicScope,
        reply: RfidReply,
    ) -> Result<(), CoordinatorError> {
        self.handle_rfid_reply(scope, reply).await
    }

    async fn on_rfid_delete_reply(
        &self,
        scope: TopicScope,
        reply: RfidDeleteReply,
    ) -> Result<(), CoordinatorError> {
        self.handle_rfid_delete_reply(scope, reply).await
    }

    async fn on_recent_access(
        &self,
        scope: TopicScope,
        report: RecentAccessReport,
    ) -> Result<(), CoordinatorError> {
        self.handle_recent_access(scope, report).await
    }

    async fn on_image_upload_result(
        &self,
        scope: TopicScope,
        result: ImageUploadResult,
    ) -> Result<(), CoordinatorError> {
        self.handle_image_upload_result(scope, result).await
    }

    async fn on_system_lock_report(
        &self,
        scope: TopicScope,
        report: SystemLockReport,
    ) -> Result<(), CoordinatorError> {
        self.handle_system_lock_report(scope, report).await
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::adapters::memory::{
        MemoryAccessLogRepository, MemoryDeviceRepository, MemoryFaceRepository,
        MemoryFingerprintRepository, MemoryRfidRepository,
    };
    use crate::adapters::transport::ChannelTransport;
    use shared_notify::BroadcastNotifyHub;

    /// Everything a coordinator test needs to observe side effects.
    pub struct Harness {
        pub coordinator: Coordinator,
        pub devices: Arc<MemoryDeviceRepository>,
        pub faces: Arc<MemoryFaceRepository>,
        pub fingerprints: Arc<MemoryFingerprintRepository>,
        pub rfid_cards: Arc<MemoryRfidRepository>,
        pub access_logs: Arc<MemoryAccessLogRepository>,
        pub transport: Arc<ChannelTransport>,
        pub hub: Arc<BroadcastNotifyHub>,
    }

    pub fn harness() -> Harness {
        let devices = Arc::new(MemoryDeviceRepository::new());
        let faces = Arc::new(MemoryFaceRepository::new());
        let fingerprints = Arc::new(MemoryFingerprintRepository::new());
        let rfid_cards = Arc::new(MemoryRfidRepository::new());
        let access_logs = Arc::new(MemoryAccessLogRepository::new());
        let transport = Arc::new(ChannelTransport::new());
        let hub = Arc::new(BroadcastNotifyHub::new());

        let coordinator = Coordinator::new(
            Repositories {
                devices: devices.clone(),
                faces: faces.clone(),
                fingerprints: fingerprints.clone(),
                rfid_cards: rfid_cards.clone(),
                access_logs: access_logs.clone(),
            },
            transport.clone(),
            hub.clone(),
        );

        Harness {
            coordinator,
            devices,
            faces,
            fingerprints,
            rfid_cards,
            access_logs,
            transport,
            hub,
        }
    }
}
