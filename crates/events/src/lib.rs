//! Event system for tribunal runs
//!
//! This crate provides the event bus and the lifecycle events an orchestrator
//! publishes while a debate or code review is running.

mod bus;
mod types;

pub use bus::{EventBus, Listener};
pub use types::*;
