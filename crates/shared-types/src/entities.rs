//! # Domain Entities
//!
//! Persistent records of the smart-lock platform: devices, enrollment
//! artifacts (face, fingerprint, RFID card), and access-log entries.
//!
//! All records serialize with camelCase field names to match the collection
//! documents the web clients already consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Operational status of a device as last reported or assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    /// Device is reachable and has reported recently.
    #[serde(rename = "ONLINE")]
    Online,
    /// Device has not reported or was marked unreachable.
    #[serde(rename = "OFFLINE")]
    Offline,
}

/// Physical bolt state of a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockState {
    /// Bolt extended.
    #[serde(rename = "LOCK")]
    Lock,
    /// Bolt retracted.
    #[serde(rename = "UNLOCK")]
    Unlock,
}

impl LockState {
    /// Parse the wire literal used by devices and web clients.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "LOCK" => Some(Self::Lock),
            "UNLOCK" => Some(Self::Unlock),
            _ => None,
        }
    }

    /// The wire literal for this state.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lock => "LOCK",
            Self::Unlock => "UNLOCK",
        }
    }
}

/// A registered smart-lock device.
///
/// # Invariants
///
/// - `device_id` and `mac_address` are globally unique across the fleet
///   (enforced by the registration path before insert).
/// - `battery_level` is within `0..=100`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Owning user account.
    pub user_id: String,
    /// Fleet-unique device identifier.
    pub device_id: String,
    /// Fleet-unique hardware address.
    pub mac_address: String,
    /// Shared secret handed to the device during provisioning.
    pub secret_key: String,
    /// Display name shown in the web client.
    pub device_name: String,
    /// Display name of the account holder, used to resolve the
    /// `ACCOUNT USER` sentinel in access logs.
    pub user_name: String,
    /// Free-form installation location.
    pub location: String,
    pub status: DeviceStatus,
    pub lock_state: LockState,
    /// Last reported battery percentage, `0..=100`.
    pub battery_level: u8,
    /// Whether the emergency system lock is engaged.
    pub system_locked: bool,
    /// When the emergency lock was engaged; `None` while disengaged.
    pub system_locked_at: Option<DateTime<Utc>>,
    /// Timestamp of the last device-reported state change.
    pub last_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Device {
    /// Create a freshly registered device with the platform defaults:
    /// online, locked, full battery, emergency lock disengaged.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        device_id: impl Into<String>,
        mac_address: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            device_id: device_id.into(),
            mac_address: mac_address.into(),
            secret_key: secret_key.into(),
            device_name: "Smart Lock".to_string(),
            user_name: "N/A".to_string(),
            location: "Home".to_string(),
            status: DeviceStatus::Online,
            lock_state: LockState::Lock,
            battery_level: 100,
            system_locked: false,
            system_locked_at: None,
            last_update: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Face bounding box reported by the face-recognition service,
/// as fractions of the source image dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

/// An indexed face enrollment.
///
/// The face record is the root of a user's enrollment artifacts: fingerprint
/// and RFID records carry a back-reference to the `face_id` that authorized
/// their enrollment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRecord {
    /// Blob-store key of the enrollment image.
    pub image_key: String,
    pub user_name: String,
    pub user_id: String,
    pub device_id: String,
    /// Original upload file name.
    pub image_name: String,
    /// Public URL of the stored enrollment image, when the blob store
    /// exposes one.
    pub s3_url: Option<String>,
    /// Identifier assigned by the face-recognition service. Unique.
    pub face_id: String,
    /// Source-image identifier assigned by the face-recognition service.
    pub image_id: String,
    /// Detection confidence, percent.
    pub confidence: f64,
    pub bounding_box: BoundingBox,
    /// Raw detail blob returned by the face-recognition service.
    pub face_detail: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A fingerprint enrollment, created only after the device reports the
/// two-phase enrollment handshake as successful.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintRecord {
    pub user_id: String,
    pub device_id: String,
    /// Face record that authorized this enrollment.
    pub face_id: String,
    pub user_name: String,
    /// Slot identifier assigned by the device sensor.
    pub fingerprint_id: String,
    /// Opaque template blob captured by the device.
    pub fingerprint_template: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An RFID card enrollment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfidCardRecord {
    pub user_id: String,
    pub device_id: String,
    /// Face record that authorized this enrollment.
    pub face_id: String,
    pub user_name: String,
    /// Card UID as reported by the reader.
    pub rfid_id: String,
    /// UID length in bytes, when the reader reports it.
    pub rfid_id_length: Option<u32>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How an access attempt was authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessType {
    #[serde(rename = "FACE_ID")]
    FaceId,
    #[serde(rename = "FINGERPRINT")]
    Fingerprint,
    #[serde(rename = "RFID")]
    Rfid,
    #[serde(rename = "WEB_APP")]
    WebApp,
    /// Method literal the server did not recognize. Recorded explicitly,
    /// never silently dropped.
    #[serde(rename = "Unknown")]
    Unknown,
}

impl AccessType {
    /// Map a device-reported `method` literal onto the access type.
    /// Unmapped literals become [`AccessType::Unknown`].
    #[must_use]
    pub fn from_method(method: &str) -> Self {
        match method {
            "FACEID" => Self::FaceId,
            "FINGERPRINT" => Self::Fingerprint,
            "RFID" => Self::Rfid,
            "WEB_APP" => Self::WebApp,
            _ => Self::Unknown,
        }
    }
}

/// A recorded access attempt.
///
/// Statuses are free-form on the wire; [`AccessLogRecord::STATUS_PENDING`]
/// marks a placeholder row inserted from an asynchronous image-analysis
/// result, to be completed in place by a later access report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogRecord {
    /// Server-minted record identity, used for in-place completion.
    pub id: Uuid,
    pub user_id: String,
    pub device_id: String,
    pub user_name: String,
    pub access_type: AccessType,
    pub status: String,
    pub notes: String,
    /// Public URL of the capture image, when one exists.
    pub image_url: Option<String>,
    /// Blob-store path of the capture image, when one exists.
    pub file_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccessLogRecord {
    pub const STATUS_SUCCESS: &'static str = "SUCCESS";
    pub const STATUS_FAILED: &'static str = "FAILED";
    pub const STATUS_PENDING: &'static str = "PENDING";

    /// Create a completed access-log row.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        device_id: impl Into<String>,
        user_name: impl Into<String>,
        access_type: AccessType,
        status: impl Into<String>,
        notes: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            device_id: device_id.into(),
            user_name: user_name.into(),
            access_type,
            status: status.into(),
            notes: notes.into(),
            image_url: None,
            file_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a PENDING placeholder for an asynchronous image-analysis
    /// result, to be completed later by a matching access report.
    #[must_use]
    pub fn pending_image(
        user_id: impl Into<String>,
        device_id: impl Into<String>,
        image_url: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        let mut record = Self::new(
            user_id,
            device_id,
            "Unknown User",
            AccessType::FaceId,
            Self::STATUS_PENDING,
            "Awaiting recognition result",
        );
        record.image_url = Some(image_url.into());
        record.file_path = Some(file_path.into());
        record
    }

    /// Whether this row is an open placeholder awaiting completion.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == Self::STATUS_PENDING
    }
}
