//! # Client Notification Events
//!
//! Events broadcast to connected web clients. Each event is a named JSON
//! object; the names and payload shapes are part of the web-client contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::LockState;

/// Terminal status carried by workflow notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "ERROR")]
    Error,
}

/// `deviceStateChange` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStateChange {
    pub device_id: String,
    pub user_id: String,
    pub lock_state: LockState,
    pub timestamp: DateTime<Utc>,
    /// Fixed event-type tag, always `STATE_CHANGE`.
    #[serde(rename = "type")]
    pub event_type: String,
}

/// `deviceDeleteConfirmFromClient` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDeleteConfirm {
    pub user_id: String,
    pub device_id: String,
    pub status: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// `addFingerprintConfirmFromClient` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintAcceptConfirm {
    pub user_id: String,
    pub device_id: String,
    pub face_id: Option<String>,
    pub status: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// `fingerprintSaved` payload, emitted with SUCCESS or ERROR status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintSaved {
    pub user_id: String,
    pub device_id: String,
    pub face_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint_template: Option<String>,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `deleteFingerprintConfirmFromClient` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintDeleteConfirm {
    pub user_id: String,
    pub device_id: String,
    pub fingerprint_id: Option<String>,
    pub face_id: Option<String>,
    pub status: String,
}

/// `fingerprintDeleted` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintDeleted {
    pub user_id: String,
    pub device_id: String,
    pub fingerprint_id: Option<String>,
    pub face_id: Option<String>,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `addRFIDCardConfirmFromClient` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidAcceptConfirm {
    pub user_id: String,
    pub device_id: String,
    pub face_id: Option<String>,
    pub status: String,
}

/// `rfidCardSaved` payload, emitted with SUCCESS or ERROR status.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidCardSaved {
    pub user_id: String,
    pub device_id: String,
    pub face_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfid_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfid_id_length: Option<u32>,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `deleteRFIDCardConfirmFromClient` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidDeleteConfirm {
    pub user_id: String,
    pub device_id: String,
    pub rfid_id: Option<String>,
    pub face_id: Option<String>,
    pub status: String,
}

/// `rfidCardDeleted` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidCardDeleted {
    pub user_id: String,
    pub device_id: String,
    pub rfid_id: Option<String>,
    pub face_id: Option<String>,
    pub status: EventStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `systemLocked` / `systemUnlocked` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemLockChange {
    pub device_id: String,
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
}

/// An event broadcast to web clients.
///
/// The variant determines the event name on the push channel; the payload is
/// serialized as the event body.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    DeviceStateChange(DeviceStateChange),
    DeviceDeleteConfirm(DeviceDeleteConfirm),
    FingerprintAcceptConfirm(FingerprintAcceptConfirm),
    FingerprintSaved(FingerprintSaved),
    FingerprintDeleteConfirm(FingerprintDeleteConfirm),
    FingerprintDeleted(FingerprintDeleted),
    RfidAcceptConfirm(RfidAcceptConfirm),
    RfidCardSaved(RfidCardSaved),
    RfidDeleteConfirm(RfidDeleteConfirm),
    RfidCardDeleted(RfidCardDeleted),
    SystemLocked(SystemLockChange),
    SystemUnlocked(SystemLockChange),
}

impl ClientEvent {
    /// Event name on the push channel.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::DeviceStateChange(_) => "deviceStateChange",
            Self::DeviceDeleteConfirm(_) => "deviceDeleteConfirmFromClient",
            Self::FingerprintAcceptConfirm(_) => "addFingerprintConfirmFromClient",
            Self::FingerprintSaved(_) => "fingerprintSaved",
            Self::FingerprintDeleteConfirm(_) => "deleteFingerprintConfirmFromClient",
            Self::FingerprintDeleted(_) => "fingerprintDeleted",
            Self::RfidAcceptConfirm(_) => "addRFIDCardConfirmFromClient",
            Self::RfidCardSaved(_) => "rfidCardSaved",
            Self::RfidDeleteConfirm(_) => "deleteRFIDCardConfirmFromClient",
            Self::RfidCardDeleted(_) => "rfidCardDeleted",
            Self::SystemLocked(_) => "systemLocked",
            Self::SystemUnlocked(_) => "systemUnlocked",
        }
    }

    /// Serialized event body.
    #[must_use]
    pub fn payload(&self) -> serde_json::Value {
        let result = match self {
            Self::DeviceStateChange(p) => serde_json::to_value(p),
            Self::DeviceDeleteConfirm(p) => serde_json::to_value(p),
            Self::FingerprintAcceptConfirm(p) => serde_json::to_value(p),
            Self::FingerprintSaved(p) => serde_json::to_value(p),
            Self::FingerprintDeleteConfirm(p) => serde_json::to_value(p),
            Self::FingerprintDeleted(p) => serde_json::to_value(p),
            Self::RfidAcceptConfirm(p) => serde_json::to_value(p),
            Self::RfidCardSaved(p) => serde_json::to_value(p),
            Self::RfidDeleteConfirm(p) => serde_json::to_value(p),
            Self::RfidCardDeleted(p) => serde_json::to_value(p),
            Self::SystemLocked(p) | Self::SystemUnlocked(p) => serde_json::to_value(p),
        };
        result.unwrap_or(serde_json::Value::Null)
    }
}
