//! # Device Wire Messages
//!
//! JSON payloads exchanged with devices over the pub/sub transport, plus the
//! closed `mode` enums that drive the workflow state machines.
//!
//! Every handled inbound message carries a `mode` discriminator string (the
//! lock-state report and the image-upload result are the two mode-less
//! families). The literals below are device firmware protocol constants and
//! must not be edited for spelling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::LockState;

// =============================================================================
// OUTBOUND COMMANDS (server -> device)
// =============================================================================

/// Command mode literals published by the server.
pub mod command_modes {
    pub const ADD_FINGERPRINT_REQUEST: &str = "ADD FINGERPRINT REQUEST FROM SERVER";
    pub const DELETE_FINGERPRINT_REQUEST: &str = "DELETE FINGERPRINT REQUEST FROM SERVER";
    pub const ADD_RFID_REQUEST: &str = "ADD RFID CARD REQUEST FROM SERVER";
    pub const DELETE_RFID_REQUEST: &str = "DELETE RFID CARD REQUEST FROM SERVER";
    pub const DELETE_DEVICE: &str = "DELETED DEVICE FROM SERVER";
}

/// Lock/unlock command published on `server/{userId}/{deviceId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockCommand {
    pub device_id: String,
    pub user_id: String,
    pub lock_state: LockState,
    pub timestamp: DateTime<Utc>,
}

/// Provisioning handshake published on `connect/{macAddress}/{deviceId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectCommand {
    pub device_id: String,
    pub user_id: String,
    pub mac_address: String,
    pub secret_key: String,
    pub timestamp: DateTime<Utc>,
}

/// Device removal command published on `server-delete/{userId}/{deviceId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDeleteCommand {
    pub user_id: String,
    pub device_id: String,
    pub mode: String,
    pub timestamp: DateTime<Utc>,
}

/// Enrollment or enrollment-deletion command published on the
/// `*-server/{userId}/{deviceId}` command topics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentCommand {
    pub user_id: String,
    pub device_id: String,
    /// Face record authorizing the enrollment; also echoed on deletions so
    /// the device can show whose artifact is being removed.
    pub face_id: String,
    /// Artifact identifier, present on deletion commands only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_id: Option<String>,
    pub mode: String,
}

// =============================================================================
// INBOUND REPORTS (device -> server)
// =============================================================================

/// Lock-state report on `smartlock/{userId}/{deviceId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockStateReport {
    pub device_id: String,
    pub user_id: String,
    pub lock_state: LockState,
    pub timestamp: DateTime<Utc>,
}

/// Deletion acceptance on `smartlock-delete/{userId}/{deviceId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDeleteReply {
    pub user_id: String,
    pub device_id: String,
    pub mode: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Fingerprint enrollment reply on `addFingerprint-smartlock/{u}/{d}`.
///
/// The accept and success phases share one shape; phase-specific fields are
/// optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintReply {
    pub mode: String,
    /// Some firmware revisions omit these; the topic segments are then
    /// authoritative.
    pub user_id: Option<String>,
    pub device_id: Option<String>,
    pub face_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Present on the success phase.
    pub fingerprint_id: Option<String>,
    /// Present on the success phase.
    pub fingerprint_template: Option<String>,
}

/// Fingerprint deletion reply on `deleteFingerprint-smartlock/{u}/{d}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintDeleteReply {
    pub mode: String,
    pub fingerprint_id: Option<String>,
    pub face_id: Option<String>,
}

/// RFID enrollment reply on `addRFIDCard-smartlock/{u}/{d}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidReply {
    pub mode: String,
    pub face_id: Option<String>,
    /// Present on the success phase.
    #[serde(rename = "cardUID")]
    pub card_uid: Option<String>,
    /// Present on the success phase.
    pub uid_length: Option<u32>,
}

/// RFID deletion reply on `deleteRFIDCard-smartlock/{u}/{d}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidDeleteReply {
    pub mode: String,
    pub rfid_id: Option<String>,
    pub face_id: Option<String>,
}

/// Access report on `recentAccess-smartlock/{u}/{d}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentAccessReport {
    pub user_id: String,
    pub device_id: String,
    /// `None` means the device could not attribute the attempt;
    /// the literal `ACCOUNT USER` means "the account holder".
    pub user_name: Option<String>,
    pub method: Option<String>,
    pub status: String,
    pub notes: Option<String>,
}

/// Asynchronous image-analysis result on `uploadImage-lambda/{u}/{d}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResult {
    pub user_id: String,
    pub device_id: String,
    pub file_url: String,
    /// Blob-store key, when the uploader reports it separately from the URL.
    pub file_path: Option<String>,
}

/// Emergency lock/unlock report on `unlockSystem-smartlock/{u}/{d}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemLockReport {
    pub mode: String,
    pub device_id: Option<String>,
    pub user_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// MODE ENUMS
// =============================================================================

/// Fingerprint enrollment phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintEnrollMode {
    RequestAccepted,
    Success,
}

impl FingerprintEnrollMode {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADD FINGERPRINT REQUEST ACCEPTED" => Some(Self::RequestAccepted),
            "ADD FINGERPRINT SUCCESS" => Some(Self::Success),
            _ => None,
        }
    }
}

/// Fingerprint deletion phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintDeleteMode {
    Accepted,
    Success,
}

impl FingerprintDeleteMode {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DELETE FINGERPRINT ACCEPTED" => Some(Self::Accepted),
            "DELETE FINGERPRINT SUCCESS" => Some(Self::Success),
            _ => None,
        }
    }
}

/// RFID enrollment phases, including the duplicate-card business rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfidEnrollMode {
    RequestAccepted,
    Success,
    CardAlreadyExists,
}

impl RfidEnrollMode {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ADD RFID CARD REQUEST ACCEPTED" => Some(Self::RequestAccepted),
            "ADD RFID CARD SUCCESS" => Some(Self::Success),
            "ADD RFID CARD FAILED: CARD ALREADY EXISTS" => Some(Self::CardAlreadyExists),
            _ => None,
        }
    }
}

/// RFID deletion phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RfidDeleteMode {
    Accepted,
    Success,
}

impl RfidDeleteMode {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DELETE RFID CARD ACCEPTED" => Some(Self::Accepted),
            "DELETE RFID CARD SUCCESS" => Some(Self::Success),
            _ => None,
        }
    }
}

/// Device deletion acceptance.
///
/// The literal carries a historical firmware misspelling; it is part of the
/// wire protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceDeleteMode {
    AcceptedFromClient,
}

impl DeviceDeleteMode {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DELETE REQUEST APPCEPT FROM CLIENT" => Some(Self::AcceptedFromClient),
            _ => None,
        }
    }
}

/// Emergency lock phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemLockMode {
    EmergencyLock,
    Unlock,
}

impl SystemLockMode {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EMERGENCY LOCK SYSTEM" => Some(Self::EmergencyLock),
            "UNLOCK SYSTEM" => Some(Self::Unlock),
            _ => None,
        }
    }
}
