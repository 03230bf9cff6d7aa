//! # Latch Runtime Library
//!
//! This library exposes the internal modules of the coordinator daemon for
//! testing. The main entry point is the `main.rs` binary.
//!
//! ## Responsibilities
//!
//! - **Configuration**: environment-driven [`config::LatchConfig`]
//! - **Adapters**: AWS-backed blob store and face indexer implementing the
//!   coordinator's outbound ports
//! - **Consumer loop**: one delivery at a time from the transport into the
//!   router, inside a log-and-continue supervisory boundary
//! - **Housekeeping**: periodic sweep of stale pending-request entries

pub mod adapters;
pub mod config;
pub mod runtime;

pub use config::LatchConfig;
pub use runtime::LatchRuntime;
