//! # Access-Log Recorder
//!
//! Persists access attempts reported by devices and completes the PENDING
//! placeholders inserted from asynchronous image-analysis results.
//!
//! Deduplication invariant: at most one PENDING row per
//! `(userId, deviceId, accessType)` is open for completion. A later access
//! report for the same triple updates that row in place instead of inserting
//! a second one.

use chrono::Utc;
use tracing::info;

use shared_types::entities::{AccessLogRecord, AccessType};
use shared_types::messages::{ImageUploadResult, RecentAccessReport};

use crate::domain::errors::CoordinatorError;
use crate::ports::inbound::TopicScope;
use crate::ports::outbound::{AccessLogRepository, DeviceRepository};

use super::Coordinator;

/// Sentinel the firmware sends when the attempt was made by the account
/// holder rather than an enrolled guest.
const ACCOUNT_USER_SENTINEL: &str = "ACCOUNT USER";

impl Coordinator {
    /// All access logs, most recent first.
    pub async fn recent_access_logs(&self) -> Result<Vec<AccessLogRecord>, CoordinatorError> {
        Ok(self.access_logs.all().await?)
    }

    // =========================================================================
    // TRANSPORT-DRIVEN HANDLERS
    // =========================================================================

    pub(crate) async fn handle_recent_access(
        &self,
        _scope: TopicScope,
        report: RecentAccessReport,
    ) -> Result<(), CoordinatorError> {
        let access_type = report
            .method
            .as_deref()
            .map_or(AccessType::Unknown, AccessType::from_method);

        let user_name = self
            .resolve_user_name(report.user_name, &report.device_id)
            .await?;
        let notes = report
            .notes
            .unwrap_or_else(|| "No notes provided".to_string());

        if let Some(mut pending) = self
            .access_logs
            .latest_pending(&report.user_id, &report.device_id, access_type)
            .await?
        {
            // Completion of an earlier asynchronous placeholder.
            pending.user_name = user_name;
            pending.status = report.status;
            pending.notes = notes;
            pending.updated_at = Utc::now();
            self.access_logs.update(&pending).await?;
            info!(
                user_id = %report.user_id,
                device_id = %report.device_id,
                "Pending access log completed"
            );
        } else {
            let record = AccessLogRecord::new(
                report.user_id.clone(),
                report.device_id.clone(),
                user_name,
                access_type,
                report.status,
                notes,
            );
            self.access_logs.insert(record).await?;
            info!(
                user_id = %report.user_id,
                device_id = %report.device_id,
                "Access log saved"
            );
        }
        Ok(())
    }

    pub(crate) async fn handle_image_upload_result(
        &self,
        _scope: TopicScope,
        result: ImageUploadResult,
    ) -> Result<(), CoordinatorError> {
        let file_path = result.file_path.unwrap_or_else(|| result.file_url.clone());
        let record = AccessLogRecord::pending_image(
            result.user_id.clone(),
            result.device_id.clone(),
            result.file_url,
            file_path,
        );
        self.access_logs.insert(record).await?;
        info!(
            user_id = %result.user_id,
            device_id = %result.device_id,
            "Pending image placeholder inserted"
        );
        Ok(())
    }

    /// Normalize the reported user name: a missing name becomes
    /// "Unknown User"; the account-user sentinel resolves through the owning
    /// device record, falling back to "Account" when the device has no name
    /// stored.
    async fn resolve_user_name(
        &self,
        reported: Option<String>,
        device_id: &str,
    ) -> Result<String, CoordinatorError> {
        match reported {
            None => Ok("Unknown User".to_string()),
            Some(name) if name == ACCOUNT_USER_SENTINEL => {
                match self.devices.find_by_device_id(device_id).await? {
                    Some(device) if !device.user_name.is_empty() => Ok(device.user_name),
                    Some(_) => Ok("Account".to_string()),
                    None => Ok(name),
                }
            }
            Some(name) => Ok(name),
        }
    }
}
