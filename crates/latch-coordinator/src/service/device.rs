//! # Device Directory and Lock-State Reconciliation
//!
//! Request-layer operations on the device collection plus the handlers for
//! device-originated state reports: lock-state reconciliation, deletion
//! acceptance, and emergency lock/unlock.

use chrono::Utc;
use tracing::{info, warn};

use shared_types::entities::{Device, DeviceStatus, LockState};
use shared_types::messages::{
    command_modes, ConnectCommand, DeviceDeleteCommand, DeviceDeleteReply, LockCommand,
    LockStateReport, SystemLockReport,
};
use shared_types::notifications::{DeviceDeleteConfirm, DeviceStateChange, SystemLockChange};
use shared_types::messages::{DeviceDeleteMode, SystemLockMode};
use shared_types::{ClientEvent, RepositoryError};

use shared_notify::ClientNotifier;

use crate::domain::errors::CoordinatorError;
use crate::domain::topic;
use crate::ports::inbound::TopicScope;
use crate::ports::outbound::{DeviceRepository, DeviceTransport};

use super::Coordinator;

/// Registration payload from the request layer.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub user_id: String,
    pub device_id: String,
    pub mac_address: String,
    pub secret_key: String,
    pub device_name: Option<String>,
    pub location: Option<String>,
    pub user_name: Option<String>,
}

impl Coordinator {
    /// Register a device, subscribe its report topics, and run the
    /// provisioning handshake.
    ///
    /// # Errors
    ///
    /// Returns a duplicate error when `device_id` or `mac_address` is
    /// already registered.
    pub async fn register_device(&self, new: NewDevice) -> Result<Device, CoordinatorError> {
        if self.devices.find_by_device_id(&new.device_id).await?.is_some() {
            return Err(RepositoryError::Duplicate {
                field: "deviceId".into(),
                value: new.device_id,
            }
            .into());
        }
        if self.devices.find_by_mac(&new.mac_address).await?.is_some() {
            return Err(RepositoryError::Duplicate {
                field: "macAddress".into(),
                value: new.mac_address,
            }
            .into());
        }

        let mut device = Device::new(new.user_id, new.device_id, new.mac_address, new.secret_key);
        if let Some(name) = new.device_name {
            device.device_name = name;
        }
        if let Some(location) = new.location {
            device.location = location;
        }
        if let Some(user_name) = new.user_name {
            device.user_name = user_name;
        }

        self.devices.insert(device.clone()).await?;

        self.subscriptions
            .subscribe(&topic::lock_state(&device.user_id, &device.device_id))
            .await?;
        self.subscriptions
            .subscribe(&topic::system_lock(&device.user_id, &device.device_id))
            .await?;

        self.send_connect_command(&device).await?;

        info!(
            device_id = %device.device_id,
            user_id = %device.user_id,
            "Device registered"
        );
        Ok(device)
    }

    /// Provisioning handshake: subscribe and publish on the connect channel.
    async fn send_connect_command(&self, device: &Device) -> Result<(), CoordinatorError> {
        let connect_topic = topic::connect(&device.mac_address, &device.device_id);
        self.subscriptions.subscribe(&connect_topic).await?;

        let command = ConnectCommand {
            device_id: device.device_id.clone(),
            user_id: device.user_id.clone(),
            mac_address: device.mac_address.clone(),
            secret_key: device.secret_key.clone(),
            timestamp: Utc::now(),
        };
        self.transport
            .publish(&connect_topic, Self::encode(&command))
            .await?;
        Ok(())
    }

    /// Devices owned by a user. Re-subscribes each device's lock-state topic
    /// as a session resync side effect.
    pub async fn devices_for_user(&self, user_id: &str) -> Result<Vec<Device>, CoordinatorError> {
        let devices = self.devices.find_by_user(user_id).await?;
        for device in &devices {
            self.subscriptions
                .subscribe(&topic::lock_state(user_id, &device.device_id))
                .await?;
        }
        Ok(devices)
    }

    /// Publish a lock command and persist the commanded state.
    ///
    /// # Errors
    ///
    /// Refused when the device is unknown or not ONLINE.
    pub async fn change_lock_state(
        &self,
        device_id: &str,
        lock_state: LockState,
    ) -> Result<Device, CoordinatorError> {
        let mut device = self
            .devices
            .find_by_device_id(device_id)
            .await?
            .ok_or_else(|| CoordinatorError::DeviceNotFound {
                device_id: device_id.to_string(),
            })?;

        if device.status != DeviceStatus::Online {
            return Err(CoordinatorError::DeviceOffline {
                device_id: device_id.to_string(),
            });
        }

        let command = LockCommand {
            device_id: device.device_id.clone(),
            user_id: device.user_id.clone(),
            lock_state,
            timestamp: Utc::now(),
        };
        self.transport
            .publish(
                &topic::lock_command(&device.user_id, &device.device_id),
                Self::encode(&command),
            )
            .await?;

        device.lock_state = lock_state;
        device.updated_at = Utc::now();
        self.devices.update(&device).await?;

        info!(device_id, state = lock_state.as_str(), "Lock command sent");
        Ok(device)
    }

    /// Update display metadata.
    pub async fn update_device(
        &self,
        user_id: &str,
        device_id: &str,
        device_name: String,
        location: String,
    ) -> Result<Device, CoordinatorError> {
        let mut device = self
            .devices
            .find_by_user_and_device(user_id, device_id)
            .await?
            .ok_or_else(|| CoordinatorError::DeviceNotFound {
                device_id: device_id.to_string(),
            })?;

        device.device_name = device_name;
        device.location = location;
        device.updated_at = Utc::now();
        self.devices.update(&device).await?;
        Ok(device)
    }

    /// Arm the deletion workflow: subscribe the acceptance channel so the
    /// device's confirmation can be correlated.
    pub async fn request_delete_device(
        &self,
        user_id: &str,
        device_id: &str,
    ) -> Result<(), CoordinatorError> {
        self.devices
            .find_by_user_and_device(user_id, device_id)
            .await?
            .ok_or_else(|| CoordinatorError::DeviceNotFound {
                device_id: device_id.to_string(),
            })?;

        self.subscriptions
            .subscribe(&topic::device_delete_reply(user_id, device_id))
            .await?;
        Ok(())
    }

    /// Publish the removal command and delete the record.
    pub async fn delete_device(
        &self,
        user_id: &str,
        device_id: &str,
    ) -> Result<(), CoordinatorError> {
        self.devices
            .find_by_user_and_device(user_id, device_id)
            .await?
            .ok_or_else(|| CoordinatorError::DeviceNotFound {
                device_id: device_id.to_string(),
            })?;

        let command = DeviceDeleteCommand {
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            mode: command_modes::DELETE_DEVICE.to_string(),
            timestamp: Utc::now(),
        };
        self.transport
            .publish(
                &topic::device_delete_command(user_id, device_id),
                Self::encode(&command),
            )
            .await?;

        self.devices.delete(user_id, device_id).await?;
        info!(device_id, user_id, "Device deleted");
        Ok(())
    }

    // =========================================================================
    // TRANSPORT-DRIVEN HANDLERS
    // =========================================================================

    /// Reconcile a device-reported lock state. Unknown devices are dropped
    /// with no persistence write and no notification.
    pub(crate) async fn handle_lock_state_report(
        &self,
        report: LockStateReport,
    ) -> Result<(), CoordinatorError> {
        let Some(mut device) = self.devices.find_by_device_id(&report.device_id).await? else {
            warn!(device_id = %report.device_id, "Lock-state report for unknown device");
            return Err(CoordinatorError::DeviceNotFound {
                device_id: report.device_id,
            });
        };

        device.lock_state = report.lock_state;
        device.status = DeviceStatus::Online;
        device.last_update = Some(report.timestamp);
        device.updated_at = Utc::now();
        self.devices.update(&device).await?;

        self.notifier
            .notify_all(ClientEvent::DeviceStateChange(DeviceStateChange {
                device_id: report.device_id.clone(),
                user_id: report.user_id,
                lock_state: report.lock_state,
                timestamp: report.timestamp,
                event_type: "STATE_CHANGE".into(),
            }))
            .await;

        info!(
            device_id = %report.device_id,
            state = report.lock_state.as_str(),
            "Device state reconciled"
        );
        Ok(())
    }

    /// Device accepted a deletion request: relay the confirmation.
    pub(crate) async fn handle_device_delete_reply(
        &self,
        scope: TopicScope,
        reply: DeviceDeleteReply,
    ) -> Result<(), CoordinatorError> {
        let mode = DeviceDeleteMode::parse(&reply.mode).ok_or_else(|| {
            CoordinatorError::UnknownMode {
                topic: topic::device_delete_reply(&scope.user_id, &scope.device_id),
                mode: reply.mode.clone(),
            }
        })?;

        match mode {
            DeviceDeleteMode::AcceptedFromClient => {
                info!(
                    device_id = %reply.device_id,
                    user_id = %reply.user_id,
                    "Device accepted deletion request"
                );
                self.notifier
                    .notify_all(ClientEvent::DeviceDeleteConfirm(DeviceDeleteConfirm {
                        user_id: reply.user_id,
                        device_id: reply.device_id,
                        status: "DELETE ACCEPTED FROM CLIENT".into(),
                        timestamp: reply.timestamp,
                    }))
                    .await;
                Ok(())
            }
        }
    }

    /// Emergency lock/unlock: toggle the system-lock flag and broadcast.
    pub(crate) async fn handle_system_lock_report(
        &self,
        scope: TopicScope,
        report: SystemLockReport,
    ) -> Result<(), CoordinatorError> {
        let mode = SystemLockMode::parse(&report.mode).ok_or_else(|| {
            CoordinatorError::UnknownMode {
                topic: topic::system_lock(&scope.user_id, &scope.device_id),
                mode: report.mode.clone(),
            }
        })?;

        let device_id = report.device_id.unwrap_or(scope.device_id);
        let user_id = report.user_id.unwrap_or(scope.user_id);

        let Some(mut device) = self.devices.find_by_device_id(&device_id).await? else {
            warn!(device_id = %device_id, "System-lock report for unknown device");
            return Err(CoordinatorError::DeviceNotFound { device_id });
        };

        let timestamp = report.timestamp.unwrap_or_else(Utc::now);
        let change = SystemLockChange {
            device_id: device_id.clone(),
            user_id,
            timestamp,
        };

        match mode {
            SystemLockMode::EmergencyLock => {
                device.system_locked = true;
                device.system_locked_at = Some(timestamp);
                device.updated_at = Utc::now();
                self.devices.update(&device).await?;
                warn!(device_id = %device_id, "Emergency lock engaged");
                self.notifier
                    .notify_all(ClientEvent::SystemLocked(change))
                    .await;
            }
            SystemLockMode::Unlock => {
                device.system_locked = false;
                device.system_locked_at = None;
                device.updated_at = Utc::now();
                self.devices.update(&device).await?;
                info!(device_id = %device_id, "Emergency lock disengaged");
                self.notifier
                    .notify_all(ClientEvent::SystemUnlocked(change))
                    .await;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::harness;
    use chrono::Utc;

    fn new_device() -> NewDevice {
        NewDevice {
            user_id: "u1".into(),
            device_id: "d1".into(),
            mac_address: "AA:BB".into(),
            secret_key: "k1".into(),
            device_name: Some("Front Door".into()),
            location: None,
            user_name: Some("Ada".into()),
        }
    }

    #[tokio::test]
    async fn test_register_device_provisions_and_subscribes() {
        let h = harness();
        let device = h.coordinator.register_device(new_device()).await.unwrap();
        assert_eq!(device.device_name, "Front Door");
        assert_eq!(device.battery_level, 100);

        assert!(h.coordinator.subscriptions().is_subscribed("smartlock/u1/d1"));
        assert!(h
            .coordinator
            .subscriptions()
            .is_subscribed("unlockSystem-smartlock/u1/d1"));

        let published = h.transport.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "connect/AA:BB/d1");
        assert_eq!(published[0].payload["secretKey"], "k1");
    }

    #[tokio::test]
    async fn test_register_device_rejects_duplicates() {
        let h = harness();
        h.coordinator.register_device(new_device()).await.unwrap();

        let mut dup_id = new_device();
        dup_id.mac_address = "CC:DD".into();
        assert!(h.coordinator.register_device(dup_id).await.is_err());

        let mut dup_mac = new_device();
        dup_mac.device_id = "d2".into();
        assert!(h.coordinator.register_device(dup_mac).await.is_err());
    }

    #[tokio::test]
    async fn test_change_lock_state_requires_online_device() {
        let h = harness();
        let device = h.coordinator.register_device(new_device()).await.unwrap();

        let mut offline = device.clone();
        offline.status = DeviceStatus::Offline;
        h.devices.update(&offline).await.unwrap();

        let result = h.coordinator.change_lock_state("d1", LockState::Unlock).await;
        assert!(matches!(result, Err(CoordinatorError::DeviceOffline { .. })));

        // Only the provisioning handshake was published.
        assert_eq!(h.transport.published().len(), 1);
    }

    #[tokio::test]
    async fn test_change_lock_state_publishes_and_persists() {
        let h = harness();
        h.coordinator.register_device(new_device()).await.unwrap();

        let updated = h
            .coordinator
            .change_lock_state("d1", LockState::Unlock)
            .await
            .unwrap();
        assert_eq!(updated.lock_state, LockState::Unlock);

        let published = h.transport.published();
        assert_eq!(published.last().map(|p| p.topic.as_str()), Some("server/u1/d1"));
        assert_eq!(published.last().map(|p| p.payload["lockState"].clone()).unwrap(), "UNLOCK");

        let stored = h.devices.find_by_device_id("d1").await.unwrap().unwrap();
        assert_eq!(stored.lock_state, LockState::Unlock);
    }

    #[tokio::test]
    async fn test_lock_state_report_for_unknown_device_mutates_nothing() {
        let h = harness();
        let mut stream = h.hub.attach();

        let report = LockStateReport {
            device_id: "ghost".into(),
            user_id: "u1".into(),
            lock_state: LockState::Unlock,
            timestamp: Utc::now(),
        };
        let result = h.coordinator.handle_lock_state_report(report).await;
        assert!(matches!(result, Err(CoordinatorError::DeviceNotFound { .. })));
        assert!(matches!(stream.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_lock_state_report_reconciles_and_notifies() {
        let h = harness();
        h.coordinator.register_device(new_device()).await.unwrap();
        let mut stream = h.hub.attach();

        let reported_at = Utc::now();
        let report = LockStateReport {
            device_id: "d1".into(),
            user_id: "u1".into(),
            lock_state: LockState::Unlock,
            timestamp: reported_at,
        };
        h.coordinator.handle_lock_state_report(report).await.unwrap();

        let stored = h.devices.find_by_device_id("d1").await.unwrap().unwrap();
        assert_eq!(stored.lock_state, LockState::Unlock);
        assert_eq!(stored.status, DeviceStatus::Online);
        assert_eq!(stored.last_update, Some(reported_at));

        let event = stream.recv().await.unwrap();
        assert_eq!(event.name(), "deviceStateChange");
        assert_eq!(event.payload()["type"], "STATE_CHANGE");
    }

    #[tokio::test]
    async fn test_emergency_lock_toggles_system_flag() {
        let h = harness();
        h.coordinator.register_device(new_device()).await.unwrap();
        let mut stream = h.hub.attach();

        let scope = TopicScope::new("u1", "d1");
        let report = SystemLockReport {
            mode: "EMERGENCY LOCK SYSTEM".into(),
            device_id: None,
            user_id: None,
            timestamp: None,
        };
        h.coordinator
            .handle_system_lock_report(scope.clone(), report)
            .await
            .unwrap();

        let stored = h.devices.find_by_device_id("d1").await.unwrap().unwrap();
        assert!(stored.system_locked);
        assert!(stored.system_locked_at.is_some());
        assert_eq!(stream.recv().await.unwrap().name(), "systemLocked");

        let unlock = SystemLockReport {
            mode: "UNLOCK SYSTEM".into(),
            device_id: None,
            user_id: None,
            timestamp: None,
        };
        h.coordinator
            .handle_system_lock_report(scope, unlock)
            .await
            .unwrap();

        let stored = h.devices.find_by_device_id("d1").await.unwrap().unwrap();
        assert!(!stored.system_locked);
        assert!(stored.system_locked_at.is_none());
        assert_eq!(stream.recv().await.unwrap().name(), "systemUnlocked");
    }

    #[tokio::test]
    async fn test_delete_device_publishes_removal_command() {
        let h = harness();
        h.coordinator.register_device(new_device()).await.unwrap();

        h.coordinator.request_delete_device("u1", "d1").await.unwrap();
        assert!(h
            .coordinator
            .subscriptions()
            .is_subscribed("smartlock-delete/u1/d1"));

        h.coordinator.delete_device("u1", "d1").await.unwrap();
        assert!(h.devices.find_by_device_id("d1").await.unwrap().is_none());

        let published = h.transport.published();
        let removal = published.last().unwrap();
        assert_eq!(removal.topic, "server-delete/u1/d1");
        assert_eq!(removal.payload["mode"], "DELETED DEVICE FROM SERVER");
    }

    #[tokio::test]
    async fn test_device_delete_reply_unknown_mode_fails_loudly() {
        let h = harness();
        let reply = DeviceDeleteReply {
            user_id: "u1".into(),
            device_id: "d1".into(),
            mode: "DELETE REQUEST GRANTED".into(),
            timestamp: None,
        };
        let result = h
            .coordinator
            .handle_device_delete_reply(TopicScope::new("u1", "d1"), reply)
            .await;
        assert!(matches!(result, Err(CoordinatorError::UnknownMode { .. })));
    }
}
