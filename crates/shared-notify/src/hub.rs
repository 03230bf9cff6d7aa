//! # Broadcast Notify Hub
//!
//! In-process implementation of the client notification channel.
//!
//! Uses `tokio::sync::broadcast` for multi-producer, multi-consumer
//! semantics. Suitable for single-node operation; a distributed deployment
//! would put a socket gateway behind the same trait.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use shared_types::ClientEvent;

/// Errors from notification operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The hub was dropped while a stream was still receiving.
    #[error("Notify hub closed")]
    Closed,
}

/// A delivery scope for an event.
///
/// `All` reaches every connected client; the room variants reach only the
/// clients that joined the matching room.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Room {
    All,
    User(String),
    Device(String),
}

/// Trait for pushing events to connected web clients.
///
/// The coordinator core only exercises [`ClientNotifier::notify_all`]; the
/// room-scoped sends exist for gateways that target a single account.
#[async_trait]
pub trait ClientNotifier: Send + Sync {
    /// Broadcast an event to every connected client.
    ///
    /// Returns the number of client streams that received the event.
    async fn notify_all(&self, event: ClientEvent) -> usize;

    /// Send an event to the clients in a user's room.
    async fn notify_user(&self, user_id: &str, event: ClientEvent) -> usize;

    /// Send an event to the clients in a device's room.
    async fn notify_device(&self, device_id: &str, event: ClientEvent) -> usize;
}

/// An event tagged with its delivery scope.
#[derive(Debug, Clone)]
struct ScopedEvent {
    room: Room,
    event: ClientEvent,
}

/// In-process notification hub.
pub struct BroadcastNotifyHub {
    sender: broadcast::Sender<ScopedEvent>,
    events_sent: AtomicU64,
    capacity: usize,
}

impl BroadcastNotifyHub {
    /// Create a hub with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(crate::DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a hub with a specific channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            events_sent: AtomicU64::new(0),
            capacity,
        }
    }

    /// Attach a new client stream. The stream starts with no room
    /// memberships and receives broadcast (`All`) events only.
    #[must_use]
    pub fn attach(&self) -> ClientStream {
        debug!("New client stream attached");
        ClientStream {
            receiver: self.sender.subscribe(),
            rooms: HashSet::new(),
        }
    }

    /// Number of currently attached client streams.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Total events pushed through the hub.
    #[must_use]
    pub fn events_sent(&self) -> u64 {
        self.events_sent.load(Ordering::Relaxed)
    }

    /// Channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn send(&self, room: Room, event: ClientEvent) -> usize {
        let name = event.name();
        self.events_sent.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(ScopedEvent { room, event }) {
            Ok(receiver_count) => {
                debug!(event = name, receivers = receiver_count, "Client event sent");
                receiver_count
            }
            Err(_) => {
                // No clients connected - event is dropped.
                warn!(event = name, "Client event dropped (no receivers)");
                0
            }
        }
    }
}

impl Default for BroadcastNotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientNotifier for BroadcastNotifyHub {
    async fn notify_all(&self, event: ClientEvent) -> usize {
        self.send(Room::All, event)
    }

    async fn notify_user(&self, user_id: &str, event: ClientEvent) -> usize {
        self.send(Room::User(user_id.to_string()), event)
    }

    async fn notify_device(&self, device_id: &str, event: ClientEvent) -> usize {
        self.send(Room::Device(device_id.to_string()), event)
    }
}

/// A client's view of the hub.
///
/// Room filtering happens on the receiving side: every stream sees the full
/// broadcast feed and skips events scoped to rooms it has not joined.
pub struct ClientStream {
    receiver: broadcast::Receiver<ScopedEvent>,
    rooms: HashSet<Room>,
}

impl ClientStream {
    /// Join a user's room.
    pub fn join_user(&mut self, user_id: impl Into<String>) {
        self.rooms.insert(Room::User(user_id.into()));
    }

    /// Join a device's room.
    pub fn join_device(&mut self, device_id: impl Into<String>) {
        self.rooms.insert(Room::Device(device_id.into()));
    }

    /// Receive the next event visible to this stream.
    ///
    /// Returns `None` when the hub is dropped. Lagged streams skip the
    /// overwritten events and keep receiving.
    pub async fn recv(&mut self) -> Option<ClientEvent> {
        loop {
            let scoped = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    debug!(lagged = count, "Client stream lagged, events dropped");
                    continue;
                }
            };

            if self.visible(&scoped.room) {
                return Some(scoped.event);
            }
        }
    }

    /// Try to receive without blocking.
    pub fn try_recv(&mut self) -> Result<Option<ClientEvent>, NotifyError> {
        loop {
            let scoped = match self.receiver.try_recv() {
                Ok(e) => e,
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(NotifyError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            };

            if self.visible(&scoped.room) {
                return Ok(Some(scoped.event));
            }
        }
    }

    fn visible(&self, room: &Room) -> bool {
        matches!(room, Room::All) || self.rooms.contains(room)
    }
}
