//! # Topic Router
//!
//! Classifies each transport delivery by topic family and dispatches it to
//! exactly one handler method. Stateless.
//!
//! ## Supervisory Boundary
//!
//! [`MessageRouter::dispatch`] never propagates an error: malformed bodies,
//! unknown modes, and handler failures are logged and the delivery loop
//! continues. Topics outside the known families are ignored with a debug log
//! and cause no persistence write and no notification.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::domain::errors::CoordinatorError;
use crate::domain::topic::Topic;
use crate::ports::inbound::{DeviceMessageHandler, TopicScope};

/// Routes inbound transport messages to a [`DeviceMessageHandler`].
pub struct MessageRouter<H: DeviceMessageHandler> {
    handler: Arc<H>,
}

impl<H: DeviceMessageHandler> MessageRouter<H> {
    #[must_use]
    pub fn new(handler: Arc<H>) -> Self {
        Self { handler }
    }

    /// Dispatch one delivery, absorbing all failures.
    ///
    /// This is the outermost handler boundary: errors are logged here and
    /// never reach the transport's delivery loop.
    pub async fn dispatch(&self, topic: &str, payload: &[u8]) {
        if let Err(error) = self.route(topic, payload).await {
            warn!(topic, %error, "Message handling failed");
        }
    }

    /// Classify and handle one delivery.
    ///
    /// Split from [`Self::dispatch`] so tests can observe the error.
    pub async fn route(&self, topic: &str, payload: &[u8]) -> Result<(), CoordinatorError> {
        let Some(parsed) = Topic::parse(topic) else {
            debug!(topic, "Ignoring message on unrecognized topic");
            return Ok(());
        };

        match parsed {
            Topic::LockState { .. } => {
                self.handler
                    .on_lock_state_report(decode(topic, payload)?)
                    .await
            }
            Topic::DeviceDelete { user_id, device_id } => {
                self.handler
                    .on_device_delete_reply(
                        TopicScope::new(user_id, device_id),
                        decode(topic, payload)?,
                    )
                    .await
            }
            Topic::FingerprintEnroll { user_id, device_id } => {
                self.handler
                    .on_fingerprint_reply(
                        TopicScope::new(user_id, device_id),
                        decode(topic, payload)?,
                    )
                    .await
            }
            Topic::FingerprintDelete { user_id, device_id } => {
                self.handler
                    .on_fingerprint_delete_reply(
                        TopicScope::new(user_id, device_id),
                        decode(topic, payload)?,
                    )
                    .await
            }
            Topic::RfidEnroll { user_id, device_id } => {
                self.handler
                    .on_rfid_reply(TopicScope::new(user_id, device_id), decode(topic, payload)?)
                    .await
            }
            Topic::RfidDelete { user_id, device_id } => {
                self.handler
                    .on_rfid_delete_reply(
                        TopicScope::new(user_id, device_id),
                        decode(topic, payload)?,
                    )
                    .await
            }
            Topic::RecentAccess { user_id, device_id } => {
                self.handler
                    .on_recent_access(TopicScope::new(user_id, device_id), decode(topic, payload)?)
                    .await
            }
            Topic::ImageUpload { user_id, device_id } => {
                self.handler
                    .on_image_upload_result(
                        TopicScope::new(user_id, device_id),
                        decode(topic, payload)?,
                    )
                    .await
            }
            Topic::SystemLock { user_id, device_id } => {
                self.handler
                    .on_system_lock_report(
                        TopicScope::new(user_id, device_id),
                        decode(topic, payload)?,
                    )
                    .await
            }
        }
    }
}

fn decode<T: DeserializeOwned>(topic: &str, payload: &[u8]) -> Result<T, CoordinatorError> {
    serde_json::from_slice(payload).map_err(|source| CoordinatorError::MalformedPayload {
        topic: topic.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use shared_types::messages::{
        DeviceDeleteReply, FingerprintDeleteReply, FingerprintReply, ImageUploadResult,
        LockStateReport, RecentAccessReport, RfidDeleteReply, RfidReply, SystemLockReport,
    };

    #[derive(Default)]
    struct RecordingHandler {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingHandler {
        fn record(&self, call: &str) {
            self.calls.lock().push(call.to_string());
        }
    }

    #[async_trait]
    impl DeviceMessageHandler for RecordingHandler {
        async fn on_lock_state_report(
            &self,
            _report: LockStateReport,
        ) -> Result<(), CoordinatorError> {
            self.record("lock_state");
            Ok(())
        }

        async fn on_device_delete_reply(
            &self,
            scope: TopicScope,
            _reply: DeviceDeleteReply,
        ) -> Result<(), CoordinatorError> {
            self.record(&format!("device_delete:{}:{}", scope.user_id, scope.device_id));
            Ok(())
        }

        async fn on_fingerprint_reply(
            &self,
            _scope: TopicScope,
            _reply: FingerprintReply,
        ) -> Result<(), CoordinatorError> {
            self.record("fingerprint");
            Ok(())
        }

        async fn on_fingerprint_delete_reply(
            &self,
            _scope: TopicScope,
            _reply: FingerprintDeleteReply,
        ) -> Result<(), CoordinatorError> {
            self.record("fingerprint_delete");
            Ok(())
        }

        async fn on_rfid_reply(
            &self,
            _scope: TopicScope,
            _reply: RfidReply,
        ) -> Result<(), CoordinatorError> {
            self.record("rfid");
            Ok(())
        }

        async fn on_rfid_delete_reply(
            &self,
            _scope: TopicScope,
            _reply: RfidDeleteReply,
        ) -> Result<(), CoordinatorError> {
            self.record("rfid_delete");
            Ok(())
        }

        async fn on_recent_access(
            &self,
            _scope: TopicScope,
            _report: RecentAccessReport,
        ) -> Result<(), CoordinatorError> {
            self.record("recent_access");
            Ok(())
        }

        async fn on_image_upload_result(
            &self,
            _scope: TopicScope,
            _result: ImageUploadResult,
        ) -> Result<(), CoordinatorError> {
            self.record("image_upload");
            Ok(())
        }

        async fn on_system_lock_report(
            &self,
            _scope: TopicScope,
            _report: SystemLockReport,
        ) -> Result<(), CoordinatorError> {
            self.record("system_lock");
            Ok(())
        }
    }

    fn router() -> (Arc<RecordingHandler>, MessageRouter<RecordingHandler>) {
        let handler = Arc::new(RecordingHandler::default());
        (handler.clone(), MessageRouter::new(handler))
    }

    #[tokio::test]
    async fn test_unknown_topic_is_ignored() {
        let (handler, router) = router();
        router.dispatch("telemetry/u1/d1", b"{}").await;
        assert!(handler.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_does_not_reach_handler() {
        let (handler, router) = router();
        let result = router.route("smartlock/u1/d1", b"{not json").await;
        assert!(matches!(
            result,
            Err(CoordinatorError::MalformedPayload { .. })
        ));
        assert!(handler.calls.lock().is_empty());

        // The supervisory entry point absorbs the same failure.
        router.dispatch("smartlock/u1/d1", b"{not json").await;
        assert!(handler.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_each_family_routes_to_its_handler() {
        let (handler, router) = router();
        let lock_report = br#"{"deviceId":"d1","userId":"u1","lockState":"LOCK","timestamp":"2026-01-01T00:00:00Z"}"#;
        router.dispatch("smartlock/u1/d1", lock_report).await;
        router
            .dispatch(
                "smartlock-delete/u1/d1",
                br#"{"userId":"u1","deviceId":"d1","mode":"DELETE REQUEST APPCEPT FROM CLIENT"}"#,
            )
            .await;
        router
            .dispatch(
                "addFingerprint-smartlock/u1/d1",
                br#"{"mode":"ADD FINGERPRINT REQUEST ACCEPTED"}"#,
            )
            .await;
        router
            .dispatch(
                "recentAccess-smartlock/u1/d1",
                br#"{"userId":"u1","deviceId":"d1","userName":null,"method":"RFID","status":"SUCCESS"}"#,
            )
            .await;
        router
            .dispatch(
                "uploadImage-lambda/u1/d1",
                br#"{"userId":"u1","deviceId":"d1","fileUrl":"https://x/y.jpg"}"#,
            )
            .await;

        let calls = handler.calls.lock().clone();
        assert_eq!(
            calls,
            vec![
                "lock_state",
                "device_delete:u1:d1",
                "fingerprint",
                "recent_access",
                "image_upload"
            ]
        );
    }
}
