//! `mediabus-core` — identifiers and error model shared by the bus crates.
//!
//! This crate holds **pure data** (no threads, no locks).

pub mod error;
pub mod id;

pub use error::{BusError, BusResult};
pub use id::{EventType, ServerId};
