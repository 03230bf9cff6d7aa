//! # Shared Types Crate
//!
//! This crate contains all domain entities, device wire message payloads, and
//! client notification events shared across the coordinator crates.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Closed Mode Sets**: Every device message `mode` literal is a variant of
//!   a per-workflow enum; unknown firmware strings fail loudly at parse time
//!   instead of being silently ignored.
//! - **Wire Fidelity**: Serialized field names and mode literals match the
//!   device firmware protocol exactly, including its historical spellings.

pub mod entities;
pub mod errors;
pub mod messages;
pub mod notifications;

pub use entities::*;
pub use errors::RepositoryError;
pub use messages::*;
pub use notifications::{ClientEvent, EventStatus};
