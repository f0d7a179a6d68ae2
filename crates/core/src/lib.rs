//! Domain model shared by the tribunal crates.
//!
//! Everything here is plain data: roles and backends, transcript messages,
//! issues and fix tasks, and the run results handed back to callers.

pub mod domain;
pub mod error;

pub use domain::*;
pub use error::CoreError;
