use thiserror::Error;
use tribunal_core::{CoreError, ExecutorRole, Phase};

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Pre-flight failure; `roles` lists every unavailable role with its backend.
    #[error("Executors unavailable: {roles}")]
    ExecutorUnavailable { roles: String },

    #[error("{role} failed during {phase} phase: {reason}")]
    ExecutionFailed {
        phase: Phase,
        role: ExecutorRole,
        reason: String,
    },

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl OrchestratorError {
    /// Create an execution failed error.
    pub fn execution_failed(phase: Phase, role: ExecutorRole, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            phase,
            role,
            reason: reason.into(),
        }
    }

    /// Phase the error was raised in, when it belongs to one.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::ExecutionFailed { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
