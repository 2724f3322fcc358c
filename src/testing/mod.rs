//! Test doubles for the protocol engine boundary
//!
//! Used by this crate's own test suite and available to downstream crates
//! that want to exercise connector-driven code without a live server.

pub mod mocks;

pub use mocks::{MockEngine, ResourceCounters};
