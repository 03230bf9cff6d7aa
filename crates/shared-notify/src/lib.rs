//! # Shared Notify - Client Notification Fan-out
//!
//! Wraps the push-notification channel to web clients behind a single
//! trait with one required primitive: broadcast to every connected client.
//! Room-scoped variants (per user, per device) are supported by the hub but
//! not required by the coordinator core.
//!
//! ```text
//! ┌──────────────┐                     ┌──────────────┐
//! │ Coordinator  │                     │ Web client   │
//! │              │   notify_all()      │   stream     │
//! │              │ ──────┐             │              │
//! └──────────────┘       │             └──────────────┘
//!                        ▼                     ↑
//!                  ┌──────────────┐            │
//!                  │  Notify Hub  │ ───────────┘
//!                  │              │   attach()
//!                  └──────────────┘
//! ```
//!
//! The in-process [`BroadcastNotifyHub`] fans events out over
//! `tokio::sync::broadcast`; a websocket gateway would hold one
//! [`ClientStream`] per connection and forward received events.

pub mod hub;

pub use hub::{BroadcastNotifyHub, ClientNotifier, ClientStream, NotifyError, Room};

/// Maximum events buffered per client stream before lagging clients skip.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
