//! # RFID Card Enrollment Workflow
//!
//! Same three-phase shape as fingerprints, with one extra terminal state:
//! the reader rejects a card that is already enrolled
//! (`ADD RFID CARD FAILED: CARD ALREADY EXISTS`), surfaced to clients as an
//! ERROR notification with a machine-readable code.

use chrono::Utc;
use tracing::{error, info, warn};

use shared_types::entities::RfidCardRecord;
use shared_types::messages::{
    command_modes, EnrollmentCommand, RfidDeleteMode, RfidDeleteReply, RfidEnrollMode, RfidReply,
};
use shared_types::notifications::{
    RfidAcceptConfirm, RfidCardDeleted, RfidCardSaved, RfidDeleteConfirm,
};
use shared_types::{ClientEvent, EventStatus};

use shared_notify::ClientNotifier;

use crate::domain::correlation::CorrelationKey;
use crate::domain::errors::CoordinatorError;
use crate::domain::pending::PendingEnrollment;
use crate::domain::topic;
use crate::ports::inbound::TopicScope;
use crate::ports::outbound::{DeviceTransport, FaceRepository, RfidRepository};

use super::Coordinator;

impl Coordinator {
    /// REQUESTED phase: subscribe the reply channel and publish the command.
    pub async fn request_add_rfid(
        &self,
        user_id: &str,
        device_id: &str,
        face_id: &str,
    ) -> Result<String, CoordinatorError> {
        let reply_topic = topic::rfid_enroll_reply(user_id, device_id);
        self.subscriptions.subscribe(&reply_topic).await?;

        let command = EnrollmentCommand {
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            face_id: face_id.to_string(),
            artifact_id: None,
            mode: command_modes::ADD_RFID_REQUEST.to_string(),
        };
        self.transport
            .publish(
                &topic::rfid_enroll_command(user_id, device_id),
                Self::encode(&command),
            )
            .await?;

        info!(user_id, device_id, face_id, "RFID enrollment requested");
        Ok(reply_topic)
    }

    /// REQUESTED phase of the deletion workflow.
    pub async fn request_delete_rfid(
        &self,
        user_id: &str,
        device_id: &str,
        rfid_id: &str,
        face_id: &str,
    ) -> Result<String, CoordinatorError> {
        let reply_topic = topic::rfid_delete_reply(user_id, device_id);
        self.subscriptions.subscribe(&reply_topic).await?;

        let command = EnrollmentCommand {
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            face_id: face_id.to_string(),
            artifact_id: Some(rfid_id.to_string()),
            mode: command_modes::DELETE_RFID_REQUEST.to_string(),
        };
        self.transport
            .publish(
                &topic::rfid_delete_command(user_id, device_id),
                Self::encode(&command),
            )
            .await?;

        info!(user_id, device_id, rfid_id, "RFID deletion requested");
        Ok(reply_topic)
    }

    /// RFID cards enrolled for a user.
    pub async fn rfid_cards_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<RfidCardRecord>, CoordinatorError> {
        Ok(self.rfid_cards.find_by_user(user_id).await?)
    }

    // =========================================================================
    // TRANSPORT-DRIVEN HANDLERS
    // =========================================================================

    pub(crate) async fn handle_rfid_reply(
        &self,
        scope: TopicScope,
        reply: RfidReply,
    ) -> Result<(), CoordinatorError> {
        let mode =
            RfidEnrollMode::parse(&reply.mode).ok_or_else(|| CoordinatorError::UnknownMode {
                topic: topic::rfid_enroll_reply(&scope.user_id, &scope.device_id),
                mode: reply.mode.clone(),
            })?;

        // RFID firmware never echoes the ids; the topic segments are
        // authoritative.
        let key = CorrelationKey::enrollment(&scope.user_id, &scope.device_id);

        match mode {
            RfidEnrollMode::RequestAccepted => {
                self.rfid_requests.put(
                    key.clone(),
                    PendingEnrollment {
                        user_id: scope.user_id.clone(),
                        device_id: scope.device_id.clone(),
                        face_id: reply.face_id.clone(),
                        artifact_id: None,
                    },
                );
                info!(key = %key, "RFID request accepted by device");

                self.notifier
                    .notify_all(ClientEvent::RfidAcceptConfirm(RfidAcceptConfirm {
                        user_id: scope.user_id,
                        device_id: scope.device_id,
                        face_id: reply.face_id,
                        status: "ADD RFID CARD ACCEPTED FROM CLIENT".into(),
                    }))
                    .await;
                Ok(())
            }
            RfidEnrollMode::Success => {
                let card_uid = reply
                    .card_uid
                    .clone()
                    .ok_or(CoordinatorError::MissingField { field: "cardUID" })?;

                let Some(pending) = self.rfid_requests.get(&key) else {
                    warn!(key = %key, "RFID success with no pending request");
                    return Err(CoordinatorError::CorrelationMiss {
                        key: key.to_string(),
                    });
                };

                let Some(face_id) = pending.face_id.clone() else {
                    warn!(key = %key, "Pending RFID request has no face reference");
                    return Err(CoordinatorError::MissingFaceReference {
                        key: key.to_string(),
                    });
                };

                let Some(face) = self.faces.find_by_face_id(&face_id).await? else {
                    warn!(face_id = %face_id, "Face record not found for RFID card");
                    return Err(CoordinatorError::FaceNotFound { face_id });
                };

                let now = Utc::now();
                let record = RfidCardRecord {
                    user_id: pending.user_id.clone(),
                    device_id: pending.device_id.clone(),
                    face_id: face.face_id.clone(),
                    user_name: face.user_name.clone(),
                    rfid_id: card_uid.clone(),
                    rfid_id_length: reply.uid_length,
                    notes: String::new(),
                    created_at: now,
                    updated_at: now,
                };

                if let Err(e) = self.rfid_cards.insert(record.clone()).await {
                    error!(key = %key, error = %e, "Failed to persist RFID card");
                    self.notifier
                        .notify_all(ClientEvent::RfidCardSaved(RfidCardSaved {
                            user_id: pending.user_id,
                            device_id: pending.device_id,
                            face_id: Some(face.face_id),
                            user_name: None,
                            rfid_id: None,
                            rfid_id_length: None,
                            status: EventStatus::Error,
                            error: Some(e.to_string()),
                        }))
                        .await;
                    return Err(e.into());
                }

                info!(
                    key = %key,
                    rfid_id = %card_uid,
                    user_name = %face.user_name,
                    "RFID card saved"
                );
                self.notifier
                    .notify_all(ClientEvent::RfidCardSaved(RfidCardSaved {
                        user_id: record.user_id,
                        device_id: record.device_id,
                        face_id: Some(record.face_id),
                        user_name: Some(record.user_name),
                        rfid_id: Some(record.rfid_id),
                        rfid_id_length: record.rfid_id_length,
                        status: EventStatus::Success,
                        error: None,
                    }))
                    .await;

                self.rfid_requests.delete(&key);
                Ok(())
            }
            RfidEnrollMode::CardAlreadyExists => {
                // Business rejection from the device: terminal, surfaced
                // with a machine-readable code.
                let pending = self.rfid_requests.get(&key);
                warn!(key = %key, "RFID card already exists on device");

                self.notifier
                    .notify_all(ClientEvent::RfidCardSaved(RfidCardSaved {
                        user_id: scope.user_id,
                        device_id: scope.device_id,
                        face_id: pending.and_then(|p| p.face_id),
                        user_name: None,
                        rfid_id: Some("N/A".into()),
                        rfid_id_length: None,
                        status: EventStatus::Error,
                        error: Some("RFID_CARD_ALREADY_EXISTS".into()),
                    }))
                    .await;

                self.rfid_requests.delete(&key);
                Ok(())
            }
        }
    }

    pub(crate) async fn handle_rfid_delete_reply(
        &self,
        scope: TopicScope,
        reply: RfidDeleteReply,
    ) -> Result<(), CoordinatorError> {
        let mode =
            RfidDeleteMode::parse(&reply.mode).ok_or_else(|| CoordinatorError::UnknownMode {
                topic: topic::rfid_delete_reply(&scope.user_id, &scope.device_id),
                mode: reply.mode.clone(),
            })?;

        let rfid_id = reply
            .rfid_id
            .clone()
            .ok_or(CoordinatorError::MissingField { field: "rfidId" })?;
        let key = CorrelationKey::deletion(&scope.user_id, &scope.device_id, &rfid_id);

        match mode {
            RfidDeleteMode::Accepted => {
                self.rfid_requests.put(
                    key.clone(),
                    PendingEnrollment {
                        user_id: scope.user_id.clone(),
                        device_id: scope.device_id.clone(),
                        face_id: reply.face_id.clone(),
                        artifact_id: Some(rfid_id.clone()),
                    },
                );
                info!(key = %key, "RFID deletion accepted by device");

                self.notifier
                    .notify_all(ClientEvent::RfidDeleteConfirm(RfidDeleteConfirm {
                        user_id: scope.user_id,
                        device_id: scope.device_id,
                        rfid_id: Some(rfid_id),
                        face_id: reply.face_id,
                        status: "DELETE RFID CARD ACCEPTED FROM CLIENT".into(),
                    }))
                    .await;
                Ok(())
            }
            RfidDeleteMode::Success => {
                let Some(pending) = self.rfid_requests.get(&key) else {
                    warn!(key = %key, "RFID deletion success with no pending request");
                    return Err(CoordinatorError::CorrelationMiss {
                        key: key.to_string(),
                    });
                };

                let deleted = self
                    .rfid_cards
                    .delete(&pending.user_id, &pending.device_id, &rfid_id)
                    .await?;

                let event = match deleted {
                    Some(record) => {
                        info!(key = %key, "RFID card deleted");
                        RfidCardDeleted {
                            user_id: record.user_id,
                            device_id: record.device_id,
                            rfid_id: Some(record.rfid_id),
                            face_id: Some(record.face_id),
                            status: EventStatus::Success,
                            error: None,
                        }
                    }
                    None => {
                        warn!(key = %key, "No stored RFID card matched the deletion");
                        RfidCardDeleted {
                            user_id: pending.user_id,
                            device_id: pending.device_id,
                            rfid_id: Some(rfid_id),
                            face_id: pending.face_id,
                            status: EventStatus::Error,
                            error: Some("RFID_CARD_NOT_FOUND".into()),
                        }
                    }
                };

                self.notifier
                    .notify_all(ClientEvent::RfidCardDeleted(event))
                    .await;
                self.rfid_requests.delete(&key);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::test_support::harness;
    use shared_types::entities::{BoundingBox, FaceRecord};

    fn face_record(face_id: &str) -> FaceRecord {
        let now = Utc::now();
        FaceRecord {
            image_key: "users/u1/faces/d1/ada.jpg".into(),
            user_name: "Ada".into(),
            user_id: "u1".into(),
            device_id: "d1".into(),
            image_name: "ada.jpg".into(),
            s3_url: None,
            face_id: face_id.into(),
            image_id: "img1".into(),
            confidence: 99.5,
            bounding_box: BoundingBox::default(),
            face_detail: serde_json::json!({}),
            created_at: now,
            updated_at: now,
        }
    }

    fn accept_reply(face_id: &str) -> RfidReply {
        RfidReply {
            mode: "ADD RFID CARD REQUEST ACCEPTED".into(),
            face_id: Some(face_id.into()),
            card_uid: None,
            uid_length: None,
        }
    }

    fn success_reply(card_uid: &str) -> RfidReply {
        RfidReply {
            mode: "ADD RFID CARD SUCCESS".into(),
            face_id: None,
            card_uid: Some(card_uid.into()),
            uid_length: Some(4),
        }
    }

    #[tokio::test]
    async fn test_accept_then_success_saves_card() {
        let h = harness();
        h.faces.insert(face_record("f1")).await.unwrap();
        let mut stream = h.hub.attach();
        let scope = TopicScope::new("u1", "d1");

        h.coordinator
            .handle_rfid_reply(scope.clone(), accept_reply("f1"))
            .await
            .unwrap();
        assert_eq!(
            stream.recv().await.unwrap().name(),
            "addRFIDCardConfirmFromClient"
        );

        h.coordinator
            .handle_rfid_reply(scope, success_reply("04:A3:7F"))
            .await
            .unwrap();

        let cards = h.rfid_cards.find_by_user("u1").await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].rfid_id, "04:A3:7F");
        assert_eq!(cards[0].rfid_id_length, Some(4));
        assert_eq!(cards[0].user_name, "Ada");

        let event = stream.recv().await.unwrap();
        assert_eq!(event.name(), "rfidCardSaved");
        assert_eq!(event.payload()["status"], "SUCCESS");
        assert_eq!(h.coordinator.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_success_without_accept_creates_nothing() {
        let h = harness();
        h.faces.insert(face_record("f1")).await.unwrap();
        let mut stream = h.hub.attach();

        let result = h
            .coordinator
            .handle_rfid_reply(TopicScope::new("u1", "d1"), success_reply("04:A3"))
            .await;
        assert!(matches!(result, Err(CoordinatorError::CorrelationMiss { .. })));

        assert!(h.rfid_cards.find_by_user("u1").await.unwrap().is_empty());
        assert!(matches!(stream.try_recv(), Ok(None)));
    }

    #[tokio::test]
    async fn test_success_without_card_uid_is_rejected() {
        let h = harness();
        let scope = TopicScope::new("u1", "d1");
        h.coordinator
            .handle_rfid_reply(scope.clone(), accept_reply("f1"))
            .await
            .unwrap();

        let reply = RfidReply {
            mode: "ADD RFID CARD SUCCESS".into(),
            face_id: None,
            card_uid: None,
            uid_length: None,
        };
        let result = h.coordinator.handle_rfid_reply(scope, reply).await;
        assert!(matches!(result, Err(CoordinatorError::MissingField { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_card_rejection_notifies_error() {
        let h = harness();
        let scope = TopicScope::new("u1", "d1");
        h.coordinator
            .handle_rfid_reply(scope.clone(), accept_reply("f1"))
            .await
            .unwrap();
        let mut stream = h.hub.attach();

        let reply = RfidReply {
            mode: "ADD RFID CARD FAILED: CARD ALREADY EXISTS".into(),
            face_id: None,
            card_uid: Some("04:A3".into()),
            uid_length: Some(4),
        };
        h.coordinator.handle_rfid_reply(scope, reply).await.unwrap();

        let event = stream.recv().await.unwrap();
        assert_eq!(event.name(), "rfidCardSaved");
        assert_eq!(event.payload()["status"], "ERROR");
        assert_eq!(event.payload()["error"], "RFID_CARD_ALREADY_EXISTS");
        assert_eq!(event.payload()["faceId"], "f1");

        // The rejection is terminal.
        assert_eq!(h.coordinator.pending_count(), 0);
        assert!(h.rfid_cards.find_by_user("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_workflow_removes_card() {
        let h = harness();
        h.faces.insert(face_record("f1")).await.unwrap();
        let scope = TopicScope::new("u1", "d1");

        h.coordinator
            .handle_rfid_reply(scope.clone(), accept_reply("f1"))
            .await
            .unwrap();
        h.coordinator
            .handle_rfid_reply(scope.clone(), success_reply("04:A3"))
            .await
            .unwrap();

        let mut stream = h.hub.attach();
        let accept = RfidDeleteReply {
            mode: "DELETE RFID CARD ACCEPTED".into(),
            rfid_id: Some("04:A3".into()),
            face_id: Some("f1".into()),
        };
        h.coordinator
            .handle_rfid_delete_reply(scope.clone(), accept)
            .await
            .unwrap();
        assert_eq!(
            stream.recv().await.unwrap().name(),
            "deleteRFIDCardConfirmFromClient"
        );

        let success = RfidDeleteReply {
            mode: "DELETE RFID CARD SUCCESS".into(),
            rfid_id: Some("04:A3".into()),
            face_id: None,
        };
        h.coordinator
            .handle_rfid_delete_reply(scope, success)
            .await
            .unwrap();

        assert!(h.rfid_cards.find_by_user("u1").await.unwrap().is_empty());
        let event = stream.recv().await.unwrap();
        assert_eq!(event.name(), "rfidCardDeleted");
        assert_eq!(event.payload()["status"], "SUCCESS");
    }

    #[tokio::test]
    async fn test_request_add_rfid_publishes_command() {
        let h = harness();
        let reply_topic = h
            .coordinator
            .request_add_rfid("u1", "d1", "f1")
            .await
            .unwrap();
        assert_eq!(reply_topic, "addRFIDCard-smartlock/u1/d1");

        let published = h.transport.published();
        assert_eq!(published[0].topic, "addRFIDCard-server/u1/d1");
        assert_eq!(published[0].payload["mode"], "ADD RFID CARD REQUEST FROM SERVER");
    }
}
