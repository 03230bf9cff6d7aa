//! # Topic Classification
//!
//! Inbound topic parsing and outbound topic construction.
//!
//! Inbound topics follow `{family}/{userId}/{deviceId}` (the provisioning
//! handshake uses `connect/{macAddress}/{deviceId}`). Families are tested in
//! a fixed priority order; a topic matching no family is ignored by the
//! router.

/// A classified inbound topic.
///
/// The two trailing segments are carried as the topic scope; several firmware
/// revisions omit the ids from the message body, in which case these segments
/// are authoritative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// `smartlock/{u}/{d}` - lock-state report.
    LockState { user_id: String, device_id: String },
    /// `smartlock-delete/{u}/{d}` - deletion acceptance.
    DeviceDelete { user_id: String, device_id: String },
    /// `addFingerprint-smartlock/{u}/{d}` - fingerprint enroll replies.
    FingerprintEnroll { user_id: String, device_id: String },
    /// `deleteFingerprint-smartlock/{u}/{d}` - fingerprint delete replies.
    FingerprintDelete { user_id: String, device_id: String },
    /// `addRFIDCard-smartlock/{u}/{d}` - RFID enroll replies.
    RfidEnroll { user_id: String, device_id: String },
    /// `deleteRFIDCard-smartlock/{u}/{d}` - RFID delete replies.
    RfidDelete { user_id: String, device_id: String },
    /// `recentAccess-smartlock/{u}/{d}` - access-log event.
    RecentAccess { user_id: String, device_id: String },
    /// `uploadImage-lambda/{u}/{d}` - async image-analysis result.
    ImageUpload { user_id: String, device_id: String },
    /// `unlockSystem-smartlock/{u}/{d}` - emergency lock/unlock report.
    SystemLock { user_id: String, device_id: String },
}

impl Topic {
    /// Classify an inbound topic string.
    ///
    /// Returns `None` for topics outside the known families or without the
    /// expected `{family}/{userId}/{deviceId}` shape.
    #[must_use]
    pub fn parse(topic: &str) -> Option<Self> {
        let mut segments = topic.split('/');
        let family = segments.next()?;
        let user_id = segments.next()?.to_string();
        let device_id = segments.next()?.to_string();
        if user_id.is_empty() || device_id.is_empty() {
            return None;
        }

        // Priority order of the family table.
        match family {
            "smartlock" => Some(Self::LockState { user_id, device_id }),
            "smartlock-delete" => Some(Self::DeviceDelete { user_id, device_id }),
            "addFingerprint-smartlock" => Some(Self::FingerprintEnroll { user_id, device_id }),
            "deleteFingerprint-smartlock" => Some(Self::FingerprintDelete { user_id, device_id }),
            "addRFIDCard-smartlock" => Some(Self::RfidEnroll { user_id, device_id }),
            "deleteRFIDCard-smartlock" => Some(Self::RfidDelete { user_id, device_id }),
            "recentAccess-smartlock" => Some(Self::RecentAccess { user_id, device_id }),
            "uploadImage-lambda" => Some(Self::ImageUpload { user_id, device_id }),
            "unlockSystem-smartlock" => Some(Self::SystemLock { user_id, device_id }),
            _ => None,
        }
    }
}

// =============================================================================
// OUTBOUND TOPIC BUILDERS
// =============================================================================

/// `server/{u}/{d}` - lock command channel.
#[must_use]
pub fn lock_command(user_id: &str, device_id: &str) -> String {
    format!("server/{user_id}/{device_id}")
}

/// `connect/{mac}/{d}` - provisioning handshake channel.
#[must_use]
pub fn connect(mac_address: &str, device_id: &str) -> String {
    format!("connect/{mac_address}/{device_id}")
}

/// `server-delete/{u}/{d}` - device removal command channel.
#[must_use]
pub fn device_delete_command(user_id: &str, device_id: &str) -> String {
    format!("server-delete/{user_id}/{device_id}")
}

/// `smartlock/{u}/{d}` - lock-state report channel.
#[must_use]
pub fn lock_state(user_id: &str, device_id: &str) -> String {
    format!("smartlock/{user_id}/{device_id}")
}

/// `smartlock-delete/{u}/{d}` - deletion acceptance channel.
#[must_use]
pub fn device_delete_reply(user_id: &str, device_id: &str) -> String {
    format!("smartlock-delete/{user_id}/{device_id}")
}

/// `addFingerprint-server/{u}/{d}` - fingerprint enroll command channel.
#[must_use]
pub fn fingerprint_enroll_command(user_id: &str, device_id: &str) -> String {
    format!("addFingerprint-server/{user_id}/{device_id}")
}

/// `addFingerprint-smartlock/{u}/{d}` - fingerprint enroll reply channel.
#[must_use]
pub fn fingerprint_enroll_reply(user_id: &str, device_id: &str) -> String {
    format!("addFingerprint-smartlock/{user_id}/{device_id}")
}

/// `deleteFingerprint-server/{u}/{d}` - fingerprint delete command channel.
#[must_use]
pub fn fingerprint_delete_command(user_id: &str, device_id: &str) -> String {
    format!("deleteFingerprint-server/{user_id}/{device_id}")
}

/// `deleteFingerprint-smartlock/{u}/{d}` - fingerprint delete reply channel.
#[must_use]
pub fn fingerprint_delete_reply(user_id: &str, device_id: &str) -> String {
    format!("deleteFingerprint-smartlock/{user_id}/{device_id}")
}

/// `addRFIDCard-server/{u}/{d}` - RFID enroll command channel.
#[must_use]
pub fn rfid_enroll_command(user_id: &str, device_id: &str) -> String {
    format!("addRFIDCard-server/{user_id}/{device_id}")
}

/// `addRFIDCard-smartlock/{u}/{d}` - RFID enroll reply channel.
#[must_use]
pub fn rfid_enroll_reply(user_id: &str, device_id: &str) -> String {
    format!("addRFIDCard-smartlock/{user_id}/{device_id}")
}

/// `deleteRFIDCard-server/{u}/{d}` - RFID delete command channel.
#[must_use]
pub fn rfid_delete_command(user_id: &str, device_id: &str) -> String {
    format!("deleteRFIDCard-server/{user_id}/{device_id}")
}

/// `deleteRFIDCard-smartlock/{u}/{d}` - RFID delete reply channel.
#[must_use]
pub fn rfid_delete_reply(user_id: &str, device_id: &str) -> String {
    format!("deleteRFIDCard-smartlock/{user_id}/{device_id}")
}

/// `recentAccess-smartlock/{u}/{d}` - access-log channel.
#[must_use]
pub fn recent_access(user_id: &str, device_id: &str) -> String {
    format!("recentAccess-smartlock/{user_id}/{device_id}")
}

/// `uploadImage-lambda/{u}/{d}` - async image-analysis channel.
#[must_use]
pub fn image_upload(user_id: &str, device_id: &str) -> String {
    format!("uploadImage-lambda/{user_id}/{device_id}")
}

/// `unlockSystem-smartlock/{u}/{d}` - emergency lock/unlock channel.
#[must_use]
pub fn system_lock(user_id: &str, device_id: &str) -> String {
    format!("unlockSystem-smartlock/{user_id}/{device_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_families() {
        assert_eq!(
            Topic::parse("smartlock/u1/d1"),
            Some(Topic::LockState {
                user_id: "u1".into(),
                device_id: "d1".into()
            })
        );
        assert_eq!(
            Topic::parse("addRFIDCard-smartlock/u2/d9"),
            Some(Topic::RfidEnroll {
                user_id: "u2".into(),
                device_id: "d9".into()
            })
        );
        assert_eq!(
            Topic::parse("uploadImage-lambda/u1/d1"),
            Some(Topic::ImageUpload {
                user_id: "u1".into(),
                device_id: "d1".into()
            })
        );
    }

    #[test]
    fn test_delete_family_is_distinct_from_lock_state() {
        assert_eq!(
            Topic::parse("smartlock-delete/u1/d1"),
            Some(Topic::DeviceDelete {
                user_id: "u1".into(),
                device_id: "d1".into()
            })
        );
    }

    #[test]
    fn test_parse_rejects_unknown_and_malformed() {
        assert_eq!(Topic::parse("telemetry/u1/d1"), None);
        assert_eq!(Topic::parse("smartlock/u1"), None);
        assert_eq!(Topic::parse("smartlock//d1"), None);
        assert_eq!(Topic::parse(""), None);
    }

    #[test]
    fn test_builders_round_trip_through_parse() {
        assert_eq!(
            Topic::parse(&fingerprint_enroll_reply("u1", "d1")),
            Some(Topic::FingerprintEnroll {
                user_id: "u1".into(),
                device_id: "d1".into()
            })
        );
        assert_eq!(
            Topic::parse(&rfid_delete_reply("u1", "d1")),
            Some(Topic::RfidDelete {
                user_id: "u1".into(),
                device_id: "d1".into()
            })
        );
    }
}
