//! # Subscription Manager
//!
//! Tracks which topics the transport session is subscribed to so that the
//! same topic is never subscribed twice, and re-establishes the per-device
//! default subscriptions after a (re)connect.
//!
//! The subscribed set is process-local: the transport session and its
//! subscriptions do not survive a reconnect, which is why
//! [`SubscriptionManager::sync_device_defaults`] exists as an explicit
//! resync step.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::domain::errors::{CoordinatorError, TransportError};
use crate::domain::topic;
use crate::ports::outbound::{DeviceRepository, DeviceTransport};

/// Idempotent subscription front for a [`DeviceTransport`].
pub struct SubscriptionManager {
    transport: Arc<dyn DeviceTransport>,
    subscribed: RwLock<HashSet<String>>,
}

impl SubscriptionManager {
    #[must_use]
    pub fn new(transport: Arc<dyn DeviceTransport>) -> Self {
        Self {
            transport,
            subscribed: RwLock::new(HashSet::new()),
        }
    }

    /// Subscribe to a topic unless it is already subscribed.
    ///
    /// Returns `true` when an underlying subscription call was made.
    pub async fn subscribe(&self, topic: &str) -> Result<bool, TransportError> {
        if self.subscribed.read().contains(topic) {
            debug!(topic, "Topic already subscribed");
            return Ok(false);
        }

        self.transport.subscribe(topic).await?;
        self.subscribed.write().insert(topic.to_string());
        debug!(topic, "Subscribed to new topic");
        Ok(true)
    }

    /// Whether a topic is in the subscribed set.
    #[must_use]
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscribed.read().contains(topic)
    }

    /// Number of subscribed topics.
    #[must_use]
    pub fn subscribed_count(&self) -> usize {
        self.subscribed.read().len()
    }

    /// Subscribe every persisted device's default topics: the access-log
    /// channel and the image-upload channel.
    ///
    /// Returns the number of new subscriptions made.
    pub async fn sync_device_defaults(
        &self,
        devices: &dyn DeviceRepository,
    ) -> Result<usize, CoordinatorError> {
        let mut added = 0;
        for device in devices.all().await? {
            let defaults = [
                topic::recent_access(&device.user_id, &device.device_id),
                topic::image_upload(&device.user_id, &device.device_id),
            ];
            for t in defaults {
                if self.subscribe(&t).await? {
                    added += 1;
                }
            }
            debug!(
                device_id = %device.device_id,
                user_id = %device.user_id,
                "Default topics subscribed for device"
            );
        }
        info!(added, "Device default subscriptions synced");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::transport::ChannelTransport;
    use crate::adapters::memory::MemoryDeviceRepository;
    use crate::ports::outbound::DeviceRepository;
    use shared_types::entities::Device;

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let transport = Arc::new(ChannelTransport::new());
        let manager = SubscriptionManager::new(transport.clone());

        assert!(manager.subscribe("smartlock/u1/d1").await.unwrap());
        assert!(!manager.subscribe("smartlock/u1/d1").await.unwrap());

        // Exactly one underlying subscription call.
        assert_eq!(transport.subscribe_calls(), 1);
        assert_eq!(manager.subscribed_count(), 1);
    }

    #[tokio::test]
    async fn test_sync_device_defaults_covers_all_devices() {
        let transport = Arc::new(ChannelTransport::new());
        let manager = SubscriptionManager::new(transport.clone());
        let devices = MemoryDeviceRepository::new();
        devices.insert(Device::new("u1", "d1", "mac1", "k1")).await.unwrap();
        devices.insert(Device::new("u2", "d2", "mac2", "k2")).await.unwrap();

        let added = manager.sync_device_defaults(&devices).await.unwrap();
        assert_eq!(added, 4);
        assert!(manager.is_subscribed("recentAccess-smartlock/u1/d1"));
        assert!(manager.is_subscribed("uploadImage-lambda/u2/d2"));

        // A second sync is a no-op.
        let added = manager.sync_device_defaults(&devices).await.unwrap();
        assert_eq!(added, 0);
        assert_eq!(transport.subscribe_calls(), 4);
    }
}
