//! Advisory build check.
//!
//! The configured command runs through `sh -c` in the review target. A
//! failure never aborts the review; its output becomes context for the
//! analysis prompt.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tribunal_core::Backend;

use crate::executor::{AgentExecutor, CliExecutor, CommandTemplate, ExecutionRequest};

/// Lines of build output kept for the analysis prompt.
const OUTPUT_TAIL_LINES: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCheckOutcome {
    pub success: bool,
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

pub struct BuildCheck {
    command: String,
    executor: Arc<dyn AgentExecutor>,
}

impl BuildCheck {
    pub fn new(command: impl Into<String>, working_dir: &Path, timeout: Duration) -> Self {
        let executor = CliExecutor::new(Backend::DEFAULT)
            .with_template(CommandTemplate::custom("sh", ["-c"]))
            .with_working_dir(working_dir)
            .with_timeout(timeout);
        Self::with_executor(command, Arc::new(executor))
    }

    pub fn with_executor(command: impl Into<String>, executor: Arc<dyn AgentExecutor>) -> Self {
        Self {
            command: command.into(),
            executor,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub async fn run(&self) -> BuildCheckOutcome {
        info!(command = %self.command, "Running build check");
        let result = self.executor.execute(ExecutionRequest::new(&self.command)).await;

        if result.success {
            info!(duration_ms = result.duration_ms, "Build check passed");
            return BuildCheckOutcome {
                success: true,
                errors: Vec::new(),
                duration_ms: result.duration_ms,
            };
        }

        let mut errors = vec![result.error_message()];
        let tail = output_tail(&result.output);
        if !tail.is_empty() {
            errors.push(tail);
        }
        warn!(
            command = %self.command,
            error = %errors[0],
            timed_out = result.timed_out(),
            "Build check failed; continuing review"
        );

        BuildCheckOutcome {
            success: false,
            errors,
            duration_ms: result.duration_ms,
        }
    }
}

fn output_tail(output: &str) -> String {
    let lines: Vec<&str> = output.trim_end().lines().collect();
    let start = lines.len().saturating_sub(OUTPUT_TAIL_LINES);
    lines[start..].join("\n")
}
