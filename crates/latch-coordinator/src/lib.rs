//! # Latch Coordinator
//!
//! The asynchronous message-correlation and stateful event-dispatch core of
//! the smart-lock platform.
//!
//! ## Architecture
//!
//! Hexagonal: the [`Coordinator`] service implements the inbound
//! [`DeviceMessageHandler`] port (driven by the [`MessageRouter`]) and the
//! request-layer operations, against outbound ports for the device transport,
//! the document datastore collections, the face-recognition service, the
//! blob store, and the client notification channel.
//!
//! ```text
//! transport delivery ──► MessageRouter ──► Coordinator ──► repositories
//!                                             │    │
//!                              PendingStore ◄─┘    └──► ClientNotifier
//! ```
//!
//! ## Correlation Model
//!
//! Device replies are unsolicited and arrive out of order with respect to the
//! requests that caused them. The coordinator correlates a reply with its
//! originating request through the [`domain::pending::PendingStore`], keyed
//! by [`domain::correlation::CorrelationKey`]. Entries are created when a
//! device accepts a request and removed when the workflow reaches a terminal
//! state; process restart drops all in-flight correlation state.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod router;
pub mod service;
pub mod subscriptions;

// Re-export main types
pub use domain::correlation::CorrelationKey;
pub use domain::errors::{BlobStoreError, CoordinatorError, FaceIndexError, TransportError};
pub use domain::pending::{PendingEnrollment, PendingStore};
pub use domain::topic::Topic;
pub use ports::inbound::{DeviceMessageHandler, TopicScope};
pub use router::MessageRouter;
pub use service::face::{FaceEnrollmentImage, FaceRegistry, RegisterFace};
pub use service::{Coordinator, NewDevice, Repositories};
pub use subscriptions::SubscriptionManager;
