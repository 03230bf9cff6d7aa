//! # Pending-Request Store
//!
//! In-memory correlation table for accepted-but-not-yet-completed workflows.
//!
//! ## Lifecycle
//!
//! - **insert** when a device reports a request as accepted (last-write-wins:
//!   a second acceptance for the same key overwrites the first; there is no
//!   queueing).
//! - **delete** when the workflow reaches a terminal state (success or
//!   failure).
//!
//! Entries never expire on their own: a device that accepts a request and
//! then goes silent leaves its entry behind. Every entry is stamped with its
//! insertion time and [`PendingStore::sweep_expired`] evicts entries older
//! than a caller-chosen age, returning them so the owner can emit timeout
//! notifications. The store holds no timer of its own.
//!
//! Process restart drops the whole table; in-flight workflows are then
//! silently abandoned.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use super::correlation::CorrelationKey;

/// The original request context retained between the accept and the terminal
/// phase of a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEnrollment {
    pub user_id: String,
    pub device_id: String,
    /// Face record that authorized the request. Absent when the accepting
    /// firmware did not echo it; the terminal phase then aborts.
    pub face_id: Option<String>,
    /// Artifact being deleted; `None` for enrollment workflows.
    pub artifact_id: Option<String>,
}

struct Entry<V> {
    value: V,
    inserted_at: Instant,
}

/// In-memory correlation table keyed by [`CorrelationKey`].
///
/// Thread-safe; reads and writes take a short lock and never suspend.
pub struct PendingStore<V> {
    entries: RwLock<HashMap<CorrelationKey, Entry<V>>>,
}

impl<V: Clone> PendingStore<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or overwrite the entry for `key`.
    pub fn put(&self, key: CorrelationKey, value: V) {
        self.entries.write().insert(
            key,
            Entry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Look up the entry for `key`.
    #[must_use]
    pub fn get(&self, key: &CorrelationKey) -> Option<V> {
        self.entries.read().get(key).map(|e| e.value.clone())
    }

    /// Remove and return the entry for `key`.
    pub fn delete(&self, key: &CorrelationKey) -> Option<V> {
        self.entries.write().remove(key).map(|e| e.value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Evict every entry older than `max_age`, returning the evicted pairs.
    pub fn sweep_expired(&self, max_age: Duration) -> Vec<(CorrelationKey, V)> {
        let mut entries = self.entries.write();
        let expired: Vec<CorrelationKey> = entries
            .iter()
            .filter(|(_, e)| e.inserted_at.elapsed() > max_age)
            .map(|(k, _)| k.clone())
            .collect();

        expired
            .into_iter()
            .filter_map(|key| entries.remove(&key).map(|e| (key, e.value)))
            .collect()
    }
}

impl<V: Clone> Default for PendingStore<V> {
    fn default() -> Self {
        Self::new()
    }
}
