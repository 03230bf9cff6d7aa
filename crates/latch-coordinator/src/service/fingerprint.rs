//! # Fingerprint Enrollment Workflow
//!
//! Two-phase handshake per artifact:
//!
//! ```text
//! REQUESTED ──accept──► ACCEPTED ──success──► SUCCEEDED
//!     │                     │
//!     │                     └──(no terminal message: entry leaks until
//!     │                         swept; see Coordinator::expire_pending)
//!     └── no local state retained
//! ```
//!
//! The device performs user-facing capture between request and completion,
//! so nothing is persisted until the device explicitly reports success.

use chrono::Utc;
use tracing::{error, info, warn};

use shared_types::entities::FingerprintRecord;
use shared_types::messages::{
    command_modes, EnrollmentCommand, FingerprintDeleteMode, FingerprintDeleteReply,
    FingerprintEnrollMode, FingerprintReply,
};
use shared_types::notifications::{
    FingerprintAcceptConfirm, FingerprintDeleteConfirm, FingerprintDeleted, FingerprintSaved,
};
use shared_types::{ClientEvent, EventStatus};

use shared_notify::ClientNotifier;

use crate::domain::correlation::CorrelationKey;
use crate::domain::errors::CoordinatorError;
use crate::domain::pending::PendingEnrollment;
use crate::domain::topic;
use crate::ports::inbound::TopicScope;
use crate::ports::outbound::{DeviceTransport, FaceRepository, FingerprintRepository};

use super::Coordinator;

impl Coordinator {
    /// REQUESTED phase: subscribe the reply channel and publish the command.
    /// No local state is retained until the device accepts.
    ///
    /// Returns the reply topic the caller can surface to its client.
    pub async fn request_add_fingerprint(
        &self,
        user_id: &str,
        device_id: &str,
        face_id: &str,
    ) -> Result<String, CoordinatorError> {
        let reply_topic = topic::fingerprint_enroll_reply(user_id, device_id);
        self.subscriptions.subscribe(&reply_topic).await?;

        let command = EnrollmentCommand {
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            face_id: face_id.to_string(),
            artifact_id: None,
            mode: command_modes::ADD_FINGERPRINT_REQUEST.to_string(),
        };
        self.transport
            .publish(
                &topic::fingerprint_enroll_command(user_id, device_id),
                Self::encode(&command),
            )
            .await?;

        info!(user_id, device_id, face_id, "Fingerprint enrollment requested");
        Ok(reply_topic)
    }

    /// REQUESTED phase of the deletion workflow.
    pub async fn request_delete_fingerprint(
        &self,
        user_id: &str,
        device_id: &str,
        fingerprint_id: &str,
        face_id: &str,
    ) -> Result<String, CoordinatorError> {
        let reply_topic = topic::fingerprint_delete_reply(user_id, device_id);
        self.subscriptions.subscribe(&reply_topic).await?;

        let command = EnrollmentCommand {
            user_id: user_id.to_string(),
            device_id: device_id.to_string(),
            face_id: face_id.to_string(),
            artifact_id: Some(fingerprint_id.to_string()),
            mode: command_modes::DELETE_FINGERPRINT_REQUEST.to_string(),
        };
        self.transport
            .publish(
                &topic::fingerprint_delete_command(user_id, device_id),
                Self::encode(&command),
            )
            .await?;

        info!(user_id, device_id, fingerprint_id, "Fingerprint deletion requested");
        Ok(reply_topic)
    }

    /// Fingerprints enrolled for a user, most recent first.
    pub async fn fingerprints_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<FingerprintRecord>, CoordinatorError> {
        Ok(self.fingerprints.find_by_user(user_id).await?)
    }

    // =========================================================================
    // TRANSPORT-DRIVEN HANDLERS
    // =========================================================================

    pub(crate) async fn handle_fingerprint_reply(
        &self,
        scope: TopicScope,
        reply: FingerprintReply,
    ) -> Result<(), CoordinatorError> {
        let mode = FingerprintEnrollMode::parse(&reply.mode).ok_or_else(|| {
            CoordinatorError::UnknownMode {
                topic: topic::fingerprint_enroll_reply(&scope.user_id, &scope.device_id),
                mode: reply.mode.clone(),
            }
        })?;

        // The body's ids win when present; the topic segments back them up.
        let user_id = reply.user_id.clone().unwrap_or(scope.user_id);
        let device_id = reply.device_id.clone().unwrap_or(scope.device_id);
        let key = CorrelationKey::enrollment(&user_id, &device_id);

        match mode {
            FingerprintEnrollMode::RequestAccepted => {
                self.fingerprint_requests.put(
                    key.clone(),
                    PendingEnrollment {
                        user_id: user_id.clone(),
                        device_id: device_id.clone(),
                        face_id: reply.face_id.clone(),
                        artifact_id: None,
                    },
                );
                info!(key = %key, "Fingerprint request accepted by device");

                self.notifier
                    .notify_all(ClientEvent::FingerprintAcceptConfirm(
                        FingerprintAcceptConfirm {
                            user_id,
                            device_id,
                            face_id: reply.face_id,
                            status: "ADD FINGERPRINT ACCEPTED FROM CLIENT".into(),
                            timestamp: reply.timestamp,
                        },
                    ))
                    .await;
                Ok(())
            }
            FingerprintEnrollMode::Success => {
                let Some(pending) = self.fingerprint_requests.get(&key) else {
                    // Correlation miss: abandon silently (no notification).
                    warn!(key = %key, "Fingerprint success with no pending request");
                    return Err(CoordinatorError::CorrelationMiss {
                        key: key.to_string(),
                    });
                };

                let Some(face_id) = pending.face_id.clone() else {
                    warn!(key = %key, "Pending fingerprint request has no face reference");
                    return Err(CoordinatorError::MissingFaceReference {
                        key: key.to_string(),
                    });
                };

                let Some(face) = self.faces.find_by_face_id(&face_id).await? else {
                    // Referential miss: abandon, persist nothing.
                    warn!(face_id = %face_id, "Face record not found for fingerprint");
                    return Err(CoordinatorError::FaceNotFound { face_id });
                };

                let fingerprint_id = reply
                    .fingerprint_id
                    .clone()
                    .ok_or(CoordinatorError::MissingField {
                        field: "fingerprintId",
                    })?;

                let now = Utc::now();
                let record = FingerprintRecord {
                    user_id: pending.user_id.clone(),
                    device_id: pending.device_id.clone(),
                    face_id: face.face_id.clone(),
                    user_name: face.user_name.clone(),
                    fingerprint_id: fingerprint_id.clone(),
                    fingerprint_template: reply.fingerprint_template.clone().unwrap_or_default(),
                    created_at: now,
                    updated_at: now,
                };

                if let Err(e) = self.fingerprints.insert(record.clone()).await {
                    // Persistence failure after correlation: surface to clients.
                    error!(key = %key, error = %e, "Failed to persist fingerprint");
                    self.notifier
                        .notify_all(ClientEvent::FingerprintSaved(FingerprintSaved {
                            user_id: pending.user_id,
                            device_id: pending.device_id,
                            face_id: Some(face.face_id),
                            user_name: None,
                            fingerprint_id: None,
                            fingerprint_template: None,
                            status: EventStatus::Error,
                            error: Some(e.to_string()),
                        }))
                        .await;
                    return Err(e.into());
                }

                info!(
                    key = %key,
                    user_name = %face.user_name,
                    fingerprint_id = %fingerprint_id,
                    "Fingerprint saved"
                );
                self.notifier
                    .notify_all(ClientEvent::FingerprintSaved(FingerprintSaved {
                        user_id: record.user_id,
                        device_id: record.device_id,
                        face_id: Some(record.face_id),
                        user_name: Some(record.user_name),
                        fingerprint_id: Some(record.fingerprint_id),
                        fingerprint_template: Some(record.fingerprint_template),
                        status: EventStatus::Success,
                        error: None,
                    }))
                    .await;

                self.fingerprint_requests.delete(&key);
                Ok(())
            }
        }
    }

    pub(crate) async fn handle_fingerprint_delete_reply(
        &self,
        scope: TopicScope,
        reply: FingerprintDeleteReply,
    ) -> Result<(), CoordinatorError> {
        let mode = FingerprintDeleteMode::parse(&reply.mode).ok_or_else(|| {
            CoordinatorError::UnknownMode {
                topic: topic::fingerprint_delete_reply(&scope.user_id, &scope.device_id),
                mode: reply.mode.clone(),
            }
        })?;

        let fingerprint_id =
            reply
                .fingerprint_id
                .clone()
                .ok_or(CoordinatorError::MissingField {
                    field: "fingerprintId",
                })?;
        let key = CorrelationKey::deletion(&scope.user_id, &scope.device_id, &fingerprint_id);

        match mode {
            FingerprintDeleteMode::Accepted => {
                self.fingerprint_requests.put(
                    key.clone(),
                    PendingEnrollment {
                        user_id: scope.user_id.clone(),
                        device_id: scope.device_id.clone(),
                        face_id: reply.face_id.clone(),
                        artifact_id: Some(fingerprint_id.clone()),
                    },
                );
                info!(key = %key, "Fingerprint deletion accepted by device");

                self.notifier
                    .notify_all(ClientEvent::FingerprintDeleteConfirm(
                        FingerprintDeleteConfirm {
                            user_id: scope.user_id,
                            device_id: scope.device_id,
                            fingerprint_id: Some(fingerprint_id),
                            face_id: reply.face_id,
                            status: "DELETE FINGERPRINT ACCEPTED FROM CLIENT".into(),
                        },
                    ))
                    .await;
                Ok(())
            }
            FingerprintDeleteMode::Success => {
                let Some(pending) = self.fingerprint_requests.get(&key) else {
                    warn!(key = %key, "Fingerprint deletion success with no pending request");
                    return Err(CoordinatorError::CorrelationMiss {
                        key: key.to_string(),
                    });
                };

                let deleted = self
                    .fingerprints
                    .delete(&pending.user_id, &pending.device_id, &fingerprint_id)
                    .await?;

                let event = match deleted {
                    Some(record) => {
                        info!(key = %key, "Fingerprint deleted");
                        FingerprintDeleted {
                            user_id: record.user_id,
                            device_id: record.device_id,
                            fingerprint_id: Some(record.fingerprint_id),
                            face_id: Some(record.face_id),
                            status: EventStatus::Success,
                            error: None,
                        }
                    }
                    None => {
                        warn!(key = %key, "No stored fingerprint matched the deletion");
                        FingerprintDeleted {
                            user_id: pending.user_id,
                            device_id: pending.device_id,
                            fingerprint_id: Some(fingerprint_id),
                            face_id: pending.face_id,
                            status: EventStatus::Error,
                            error: Some("FINGERPRINT_NOT_FOUND".into()),
                        }
                    }
                };

                self.notifier
                    .notify_all(ClientEvent::FingerprintDeleted(event))
                    .await;
                self.fingerprint_requests.delete(&key);
                Ok(())
            }
        }
    }
}
