//! End-to-end enrollment and device flows: raw JSON in, persisted records
//! and client events out.

use latch_coordinator::ports::outbound::{
    DeviceRepository, FaceRepository, FingerprintRepository, RfidRepository,
};
use shared_types::entities::LockState;

use super::fixture::{face_record, fixture};

#[tokio::test]
async fn fingerprint_enrollment_full_choreography() {
    let f = fixture();
    f.faces
        .insert(face_record("u1", "d1", "f1", "Ada"))
        .await
        .unwrap();

    // HTTP-initiated request: command published, reply channel subscribed.
    let reply_topic = f
        .coordinator
        .request_add_fingerprint("u1", "d1", "f1")
        .await
        .unwrap();
    assert_eq!(reply_topic, "addFingerprint-smartlock/u1/d1");
    let command = &f.transport.published()[0];
    assert_eq!(command.topic, "addFingerprint-server/u1/d1");
    assert_eq!(command.payload["mode"], "ADD FINGERPRINT REQUEST FROM SERVER");

    let mut stream = f.hub.attach();

    // Device accepts: pending entry created, acceptance relayed to clients.
    f.router
        .dispatch(
            "addFingerprint-smartlock/u1/d1",
            br#"{"mode":"ADD FINGERPRINT REQUEST ACCEPTED","faceId":"f1"}"#,
        )
        .await;
    assert_eq!(f.coordinator.pending_count(), 1);
    assert_eq!(
        stream.recv().await.unwrap().name(),
        "addFingerprintConfirmFromClient"
    );

    // Device reports success: one record, one SUCCESS event, entry removed.
    f.router
        .dispatch(
            "addFingerprint-smartlock/u1/d1",
            br#"{"mode":"ADD FINGERPRINT SUCCESS","fingerprintId":"fp1","fingerprintTemplate":"tmpl"}"#,
        )
        .await;

    let records = f.fingerprints.find_by_user("u1").await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_id, "u1");
    assert_eq!(records[0].device_id, "d1");
    assert_eq!(records[0].face_id, "f1");
    assert_eq!(records[0].fingerprint_id, "fp1");
    assert_eq!(records[0].user_name, "Ada");

    let event = stream.recv().await.unwrap();
    assert_eq!(event.name(), "fingerprintSaved");
    assert_eq!(event.payload()["status"], "SUCCESS");
    assert_eq!(f.coordinator.pending_count(), 0);
}

#[tokio::test]
async fn rfid_success_without_prior_accept_is_dropped() {
    let f = fixture();
    f.faces
        .insert(face_record("u1", "d1", "f1", "Ada"))
        .await
        .unwrap();
    let mut stream = f.hub.attach();

    f.router
        .dispatch(
            "addRFIDCard-smartlock/u1/d1",
            br#"{"mode":"ADD RFID CARD SUCCESS","cardUID":"04:A3","uidLength":4}"#,
        )
        .await;

    assert!(f.rfid_cards.find_by_user("u1").await.unwrap().is_empty());
    assert!(matches!(stream.try_recv(), Ok(None)));
}

#[tokio::test]
async fn rfid_enrollment_and_duplicate_rejection() {
    let f = fixture();
    f.faces
        .insert(face_record("u1", "d1", "f1", "Ada"))
        .await
        .unwrap();
    let mut stream = f.hub.attach();

    f.router
        .dispatch(
            "addRFIDCard-smartlock/u1/d1",
            br#"{"mode":"ADD RFID CARD REQUEST ACCEPTED","faceId":"f1"}"#,
        )
        .await;
    assert_eq!(
        stream.recv().await.unwrap().name(),
        "addRFIDCardConfirmFromClient"
    );

    f.router
        .dispatch(
            "addRFIDCard-smartlock/u1/d1",
            br#"{"mode":"ADD RFID CARD SUCCESS","cardUID":"04:A3:7F","uidLength":4}"#,
        )
        .await;
    let cards = f.rfid_cards.find_by_user("u1").await.unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].rfid_id, "04:A3:7F");
    assert_eq!(stream.recv().await.unwrap().name(), "rfidCardSaved");

    // A later duplicate-card rejection is terminal and surfaced as ERROR.
    f.router
        .dispatch(
            "addRFIDCard-smartlock/u1/d1",
            br#"{"mode":"ADD RFID CARD REQUEST ACCEPTED","faceId":"f1"}"#,
        )
        .await;
    let _ = stream.recv().await;
    f.router
        .dispatch(
            "addRFIDCard-smartlock/u1/d1",
            br#"{"mode":"ADD RFID CARD FAILED: CARD ALREADY EXISTS","cardUID":"04:A3:7F"}"#,
        )
        .await;

    let event = stream.recv().await.unwrap();
    assert_eq!(event.name(), "rfidCardSaved");
    assert_eq!(event.payload()["status"], "ERROR");
    assert_eq!(event.payload()["error"], "RFID_CARD_ALREADY_EXISTS");
    assert_eq!(f.coordinator.pending_count(), 0);
    assert_eq!(f.rfid_cards.find_by_user("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_topic_touches_nothing() {
    let f = fixture();
    let mut stream = f.hub.attach();

    f.router
        .dispatch("firmware-update/u1/d1", br#"{"mode":"WHATEVER"}"#)
        .await;

    assert!(f.devices.all().await.unwrap().is_empty());
    assert!(f.access_logs.is_empty());
    assert!(f.transport.published().is_empty());
    assert!(matches!(stream.try_recv(), Ok(None)));
}

#[tokio::test]
async fn unknown_mode_on_known_topic_touches_nothing() {
    let f = fixture();
    let mut stream = f.hub.attach();

    f.router
        .dispatch(
            "addFingerprint-smartlock/u1/d1",
            br#"{"mode":"ADD FINGERPRINT V2 HELLO"}"#,
        )
        .await;

    assert_eq!(f.coordinator.pending_count(), 0);
    assert!(f.fingerprints.find_by_user("u1").await.unwrap().is_empty());
    assert!(matches!(stream.try_recv(), Ok(None)));
}

#[tokio::test]
async fn lock_state_report_for_unknown_device_is_dropped() {
    let f = fixture();
    let mut stream = f.hub.attach();

    f.router
        .dispatch(
            "smartlock/u1/ghost",
            br#"{"deviceId":"ghost","userId":"u1","lockState":"UNLOCK","timestamp":"2026-01-01T00:00:00Z"}"#,
        )
        .await;

    assert!(f.devices.all().await.unwrap().is_empty());
    assert!(matches!(stream.try_recv(), Ok(None)));
}

#[tokio::test]
async fn device_registration_then_reported_state_change() {
    let f = fixture();
    f.coordinator
        .register_device(latch_coordinator::NewDevice {
            user_id: "u1".into(),
            device_id: "d1".into(),
            mac_address: "AA:BB:CC".into(),
            secret_key: "s3cret".into(),
            device_name: Some("Front Door".into()),
            location: Some("Hallway".into()),
            user_name: Some("Ada".into()),
        })
        .await
        .unwrap();

    let mut stream = f.hub.attach();
    f.router
        .dispatch(
            "smartlock/u1/d1",
            br#"{"deviceId":"d1","userId":"u1","lockState":"UNLOCK","timestamp":"2026-03-01T10:00:00Z"}"#,
        )
        .await;

    let device = f.devices.find_by_device_id("d1").await.unwrap().unwrap();
    assert_eq!(device.lock_state, LockState::Unlock);

    let event = stream.recv().await.unwrap();
    assert_eq!(event.name(), "deviceStateChange");
    assert_eq!(event.payload()["lockState"], "UNLOCK");
    assert_eq!(event.payload()["type"], "STATE_CHANGE");
}

#[tokio::test]
async fn device_delete_acceptance_is_relayed() {
    let f = fixture();
    f.coordinator
        .register_device(latch_coordinator::NewDevice {
            user_id: "u1".into(),
            device_id: "d1".into(),
            mac_address: "AA".into(),
            secret_key: "k".into(),
            device_name: None,
            location: None,
            user_name: None,
        })
        .await
        .unwrap();
    f.coordinator
        .request_delete_device("u1", "d1")
        .await
        .unwrap();

    let mut stream = f.hub.attach();
    // Wire literal carries the firmware misspelling.
    f.router
        .dispatch(
            "smartlock-delete/u1/d1",
            br#"{"userId":"u1","deviceId":"d1","mode":"DELETE REQUEST APPCEPT FROM CLIENT"}"#,
        )
        .await;

    let event = stream.recv().await.unwrap();
    assert_eq!(event.name(), "deviceDeleteConfirmFromClient");
    assert_eq!(event.payload()["status"], "DELETE ACCEPTED FROM CLIENT");
}

#[tokio::test]
async fn subscription_resync_is_idempotent_across_restart_paths() {
    let f = fixture();
    for (device, mac) in [("d1", "AA"), ("d2", "BB")] {
        f.coordinator
            .register_device(latch_coordinator::NewDevice {
                user_id: "u1".into(),
                device_id: device.into(),
                mac_address: mac.into(),
                secret_key: "k".into(),
                device_name: None,
                location: None,
                user_name: None,
            })
            .await
            .unwrap();
    }

    let calls_after_registration = f.transport.subscribe_calls();

    // Connect-time resync adds the default topics once.
    let added = f.coordinator.resync_subscriptions().await.unwrap();
    assert_eq!(added, 4);

    // Listing devices re-subscribes lock-state topics: all duplicates.
    f.coordinator.devices_for_user("u1").await.unwrap();
    let added = f.coordinator.resync_subscriptions().await.unwrap();
    assert_eq!(added, 0);

    assert_eq!(
        f.transport.subscribe_calls(),
        calls_after_registration + 4
    );
}
