//! Inbound ports (API) for the coordinator.

use async_trait::async_trait;

use shared_types::messages::{
    DeviceDeleteReply, FingerprintDeleteReply, FingerprintReply, ImageUploadResult,
    LockStateReport, RecentAccessReport, RfidDeleteReply, RfidReply, SystemLockReport,
};

use crate::domain::errors::CoordinatorError;

/// The `{userId}/{deviceId}` segments of the topic a message arrived on.
///
/// Authoritative when the message body omits the ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScope {
    pub user_id: String,
    pub device_id: String,
}

impl TopicScope {
    #[must_use]
    pub fn new(user_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            device_id: device_id.into(),
        }
    }
}

/// Transport-driven inbound port: one method per inbound topic family.
///
/// The router decodes each delivery and invokes exactly one of these. Errors
/// are terminal for the delivery; the router logs them and the loop
/// continues.
#[async_trait]
pub trait DeviceMessageHandler: Send + Sync {
    /// `smartlock/{u}/{d}` - reconcile a device-reported lock state.
    async fn on_lock_state_report(&self, report: LockStateReport) -> Result<(), CoordinatorError>;

    /// `smartlock-delete/{u}/{d}` - device accepted a deletion request.
    async fn on_device_delete_reply(
        &self,
        scope: TopicScope,
        reply: DeviceDeleteReply,
    ) -> Result<(), CoordinatorError>;

    /// `addFingerprint-smartlock/{u}/{d}` - fingerprint enroll accept/success.
    async fn on_fingerprint_reply(
        &self,
        scope: TopicScope,
        reply: FingerprintReply,
    ) -> Result<(), CoordinatorError>;

    /// `deleteFingerprint-smartlock/{u}/{d}` - fingerprint delete accept/success.
    async fn on_fingerprint_delete_reply(
        &self,
        scope: TopicScope,
        reply: FingerprintDeleteReply,
    ) -> Result<(), CoordinatorError>;

    /// `addRFIDCard-smartlock/{u}/{d}` - RFID enroll accept/success/failure.
    async fn on_rfid_reply(&self, scope: TopicScope, reply: RfidReply)
        -> Result<(), CoordinatorError>;

    /// `deleteRFIDCard-smartlock/{u}/{d}` - RFID delete accept/success.
    async fn on_rfid_delete_reply(
        &self,
        scope: TopicScope,
        reply: RfidDeleteReply,
    ) -> Result<(), CoordinatorError>;

    /// `recentAccess-smartlock/{u}/{d}` - record or complete an access log.
    async fn on_recent_access(
        &self,
        scope: TopicScope,
        report: RecentAccessReport,
    ) -> Result<(), CoordinatorError>;

    /// `uploadImage-lambda/{u}/{d}` - insert a PENDING image placeholder.
    async fn on_image_upload_result(
        &self,
        scope: TopicScope,
        result: ImageUploadResult,
    ) -> Result<(), CoordinatorError>;

    /// `unlockSystem-smartlock/{u}/{d}` - emergency lock/unlock.
    async fn on_system_lock_report(
        &self,
        scope: TopicScope,
        report: SystemLockReport,
    ) -> Result<(), CoordinatorError>;
}
