//! Shared test fixture: a coordinator wired to in-memory adapters with an
//! observable transport and notify hub.

use std::sync::Arc;

use latch_coordinator::adapters::memory::{
    MemoryAccessLogRepository, MemoryDeviceRepository, MemoryFaceRepository,
    MemoryFingerprintRepository, MemoryRfidRepository,
};
use latch_coordinator::adapters::transport::ChannelTransport;
use latch_coordinator::{Coordinator, MessageRouter, Repositories};
use shared_notify::BroadcastNotifyHub;
use shared_types::entities::{BoundingBox, FaceRecord};

pub struct Fixture {
    pub coordinator: Arc<Coordinator>,
    pub router: MessageRouter<Coordinator>,
    pub devices: Arc<MemoryDeviceRepository>,
    pub faces: Arc<MemoryFaceRepository>,
    pub fingerprints: Arc<MemoryFingerprintRepository>,
    pub rfid_cards: Arc<MemoryRfidRepository>,
    pub access_logs: Arc<MemoryAccessLogRepository>,
    pub transport: Arc<ChannelTransport>,
    pub hub: Arc<BroadcastNotifyHub>,
}

pub fn fixture() -> Fixture {
    let devices = Arc::new(MemoryDeviceRepository::new());
    let faces = Arc::new(MemoryFaceRepository::new());
    let fingerprints = Arc::new(MemoryFingerprintRepository::new());
    let rfid_cards = Arc::new(MemoryRfidRepository::new());
    let access_logs = Arc::new(MemoryAccessLogRepository::new());
    let transport = Arc::new(ChannelTransport::new());
    let hub = Arc::new(BroadcastNotifyHub::new());

    let coordinator = Arc::new(Coordinator::new(
        Repositories {
            devices: devices.clone(),
            faces: faces.clone(),
            fingerprints: fingerprints.clone(),
            rfid_cards: rfid_cards.clone(),
            access_logs: access_logs.clone(),
        },
        transport.clone(),
        hub.clone(),
    ));
    let router = MessageRouter::new(coordinator.clone());

    Fixture {
        coordinator,
        router,
        devices,
        faces,
        fingerprints,
        rfid_cards,
        access_logs,
        transport,
        hub,
    }
}

/// A face record as the registration path would have persisted it.
pub fn face_record(user_id: &str, device_id: &str, face_id: &str, user_name: &str) -> FaceRecord {
    let now = chrono::Utc::now();
    FaceRecord {
        image_key: format!("users/{user_id}/faces/{device_id}/{user_name}.jpg"),
        user_name: user_name.into(),
        user_id: user_id.into(),
        device_id: device_id.into(),
        image_name: format!("{user_name}.jpg"),
        s3_url: None,
        face_id: face_id.into(),
        image_id: "img-1".into(),
        confidence: 99.2,
        bounding_box: BoundingBox::default(),
        face_detail: serde_json::json!({}),
        created_at: now,
        updated_at: now,
    }
}
