//! # In-Process Channel Transport
//!
//! A loopback implementation of the [`DeviceTransport`] port plus the
//! delivery side the runtime's consumer loop drains.
//!
//! Behaves like a broker session: published messages are recorded on an
//! observable outbound log (devices would receive them), and injected
//! device messages are delivered only when their topic is subscribed.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::errors::TransportError;
use crate::ports::outbound::DeviceTransport;

/// A message published by the server (server -> device direction).
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: Value,
}

/// A message delivered to the server (device -> server direction).
#[derive(Debug, Clone)]
pub struct TransportMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// In-process pub/sub session.
pub struct ChannelTransport {
    subscriptions: RwLock<HashSet<String>>,
    published: Mutex<Vec<PublishedMessage>>,
    subscribe_calls: AtomicUsize,
    delivery_tx: mpsc::UnboundedSender<TransportMessage>,
    delivery_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TransportMessage>>,
}

impl ChannelTransport {
    #[must_use]
    pub fn new() -> Self {
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        Self {
            subscriptions: RwLock::new(HashSet::new()),
            published: Mutex::new(Vec::new()),
            subscribe_calls: AtomicUsize::new(0),
            delivery_tx,
            delivery_rx: tokio::sync::Mutex::new(delivery_rx),
        }
    }

    /// Inject a device-originated message.
    ///
    /// Returns `false` when the topic is not subscribed and the broker would
    /// therefore not deliver it.
    pub fn deliver(&self, topic: &str, payload: &Value) -> bool {
        if !self.subscriptions.read().contains(topic) {
            debug!(topic, "Dropping delivery for unsubscribed topic");
            return false;
        }
        let message = TransportMessage {
            topic: topic.to_string(),
            payload: payload.to_string().into_bytes(),
        };
        self.delivery_tx.send(message).is_ok()
    }

    /// Next delivery, in publish order. `None` after the transport closes.
    pub async fn next_delivery(&self) -> Option<TransportMessage> {
        self.delivery_rx.lock().await.recv().await
    }

    /// Messages published by the server so far.
    #[must_use]
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().clone()
    }

    /// Number of underlying subscribe calls made.
    #[must_use]
    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::Relaxed)
    }

    /// Whether the session holds a subscription for `topic`.
    #[must_use]
    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.read().contains(topic)
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceTransport for ChannelTransport {
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), TransportError> {
        debug!(topic, "Publishing message");
        self.published.lock().push(PublishedMessage {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.subscribe_calls.fetch_add(1, Ordering::Relaxed);
        self.subscriptions.write().insert(topic.to_string());
        Ok(())
    }
}
