//! # Latch Test Suite
//!
//! Cross-crate flows exercising the full choreography: raw JSON device
//! messages through the router into the coordinator, observed through the
//! in-memory repositories, the transport publish log, and the notify hub.

#[cfg(test)]
mod integration;
