//! Code-review phases with more than one executor call or no role.
//!
//! - [`build_check`] - Advisory build command run before analysis
//! - [`fix`] - Concurrent remediation of confirmed issues

pub mod build_check;
pub mod fix;

pub use build_check::{BuildCheck, BuildCheckOutcome};
pub use fix::{run_fix_tasks, FixPool};
