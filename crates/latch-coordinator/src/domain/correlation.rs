//! # Correlation Keys
//!
//! A correlation key identifies which in-flight workflow a device reply
//! belongs to. Enrollment keys are scoped to `(userId, deviceId)`; deletion
//! keys additionally carry the artifact identifier so that deleting one
//! artifact does not collide with enrolling another on the same device.

use std::fmt;

/// Key into a [`crate::domain::pending::PendingStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Key for an enrollment workflow: `{userId}-{deviceId}`.
    #[must_use]
    pub fn enrollment(user_id: &str, device_id: &str) -> Self {
        Self(format!("{user_id}-{device_id}"))
    }

    /// Key for a deletion workflow:
    /// `delete-{userId}-{deviceId}-{artifactId}`.
    #[must_use]
    pub fn deletion(user_id: &str, device_id: &str, artifact_id: &str) -> Self {
        Self(format!("delete-{user_id}-{device_id}-{artifact_id}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
