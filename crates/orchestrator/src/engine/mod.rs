//! Shared plumbing for both workflows.
//!
//! - [`RunEmitter`] - Publishes lifecycle events tagged with one run id
//! - [`invoke`] - Runs a single executor step and turns its output into a [`Message`]
//! - [`ensure_available`] - Pre-flight probe of every bound executor
//!
//! [`Message`]: tribunal_core::Message

mod events;
mod execution;

pub use events::RunEmitter;
pub use execution::{ensure_available, invoke, record, RoleExecutors, Step};
