use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::agent::{Backend, ExecutorRole};

/// Prefix of the error string carried by a timed-out execution.
pub const TIMEOUT_SENTINEL: &str = "timeout";

/// Named stage of either workflow.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    // Debate
    Opening,
    Round,
    Final,
    // Code review
    BuildCheck,
    Analysis,
    Defense,
    Verdict,
    ParallelFix,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Round => "round",
            Self::Final => "final",
            Self::BuildCheck => "build_check",
            Self::Analysis => "analysis",
            Self::Defense => "defense",
            Self::Verdict => "verdict",
            Self::ParallelFix => "parallel_fix",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "opening" => Some(Self::Opening),
            "round" => Some(Self::Round),
            "final" => Some(Self::Final),
            "build_check" => Some(Self::BuildCheck),
            "analysis" => Some(Self::Analysis),
            "defense" => Some(Self::Defense),
            "verdict" => Some(Self::Verdict),
            "parallel_fix" => Some(Self::ParallelFix),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One transcript entry, created once per usable executor response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub role: ExecutorRole,
    pub backend: Backend,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
}

impl Message {
    pub fn new(
        role: ExecutorRole,
        backend: Backend,
        content: impl Into<String>,
        phase: Phase,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            backend,
            content: content.into(),
            timestamp: Utc::now(),
            phase,
            round: None,
        }
    }

    pub fn with_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }
}

/// Outcome of a single executor invocation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn success(output: String, duration_ms: u64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            duration_ms,
        }
    }

    pub fn failure(output: String, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output,
            error: Some(error.into()),
            duration_ms,
        }
    }

    pub fn timeout(partial_output: String, duration_ms: u64) -> Self {
        Self::failure(
            partial_output,
            format!("{} after {}ms", TIMEOUT_SENTINEL, duration_ms),
            duration_ms,
        )
    }

    pub fn timed_out(&self) -> bool {
        !self.success
            && self
                .error
                .as_deref()
                .is_some_and(|e| e.starts_with(TIMEOUT_SENTINEL))
    }

    /// Error text for reporting, never empty on failure.
    pub fn error_message(&self) -> String {
        match &self.error {
            Some(e) if !e.trim().is_empty() => e.trim().to_string(),
            _ if self.success => String::new(),
            _ => "execution failed without error output".to_string(),
        }
    }
}
