//! Event types for the tribunal event system

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tribunal_core::{Backend, ExecutorRole, FixStatus, Message, Phase, RunStatus};
use uuid::Uuid;

/// Envelope wrapping all events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// Position in the bus's publish order, starting at 0
    pub sequence: u64,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: Event,
}

impl EventEnvelope {
    /// Create a new event envelope with auto-generated ID and timestamp
    pub fn new(sequence: u64, event: Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Which workflow a run executes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    Debate,
    CodeReview,
}

/// All lifecycle events published during a run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A run started. Published for both workflows.
    #[serde(rename = "debate:start")]
    DebateStart {
        run_id: Uuid,
        kind: RunKind,
        /// Debate topic or code-review path
        subject: String,
    },

    /// A run reached a terminal status
    #[serde(rename = "debate:end")]
    DebateEnd {
        run_id: Uuid,
        status: RunStatus,
        error: Option<String>,
    },

    #[serde(rename = "phase:start")]
    PhaseStart { run_id: Uuid, phase: Phase },

    #[serde(rename = "phase:end")]
    PhaseEnd {
        run_id: Uuid,
        phase: Phase,
        success: bool,
    },

    #[serde(rename = "round:start")]
    RoundStart { run_id: Uuid, round: u32, total: u32 },

    #[serde(rename = "round:end")]
    RoundEnd {
        run_id: Uuid,
        round: u32,
        duration_ms: u64,
    },

    /// An executor invocation began
    #[serde(rename = "message:start")]
    MessageStart {
        run_id: Uuid,
        role: ExecutorRole,
        backend: Backend,
        phase: Phase,
        round: Option<u32>,
    },

    /// Streamed output increment from a running executor
    #[serde(rename = "message:chunk")]
    MessageChunk {
        run_id: Uuid,
        role: ExecutorRole,
        backend: Backend,
        chunk: String,
    },

    /// An executor invocation produced a transcript message
    #[serde(rename = "message:end")]
    MessageEnd { run_id: Uuid, message: Message },

    #[serde(rename = "fix:start")]
    FixStart {
        run_id: Uuid,
        task_id: Uuid,
        issue_id: String,
        backend: Backend,
    },

    #[serde(rename = "fix:end")]
    FixEnd {
        run_id: Uuid,
        task_id: Uuid,
        issue_id: String,
        backend: Backend,
        status: FixStatus,
        duration_ms: u64,
    },

    /// Fatal run errors and recovered ones (parse failures, build check)
    #[serde(rename = "error")]
    Error {
        run_id: Option<Uuid>,
        message: String,
        phase: Option<Phase>,
        fatal: bool,
    },
}

impl Event {
    /// Wire name of the event, e.g. `phase:start`
    pub fn name(&self) -> &'static str {
        match self {
            Event::DebateStart { .. } => "debate:start",
            Event::DebateEnd { .. } => "debate:end",
            Event::PhaseStart { .. } => "phase:start",
            Event::PhaseEnd { .. } => "phase:end",
            Event::RoundStart { .. } => "round:start",
            Event::RoundEnd { .. } => "round:end",
            Event::MessageStart { .. } => "message:start",
            Event::MessageChunk { .. } => "message:chunk",
            Event::MessageEnd { .. } => "message:end",
            Event::FixStart { .. } => "fix:start",
            Event::FixEnd { .. } => "fix:end",
            Event::Error { .. } => "error",
        }
    }

    /// Get the run ID associated with this event, if any
    pub fn run_id(&self) -> Option<Uuid> {
        match self {
            Event::DebateStart { run_id, .. }
            | Event::DebateEnd { run_id, .. }
            | Event::PhaseStart { run_id, .. }
            | Event::PhaseEnd { run_id, .. }
            | Event::RoundStart { run_id, .. }
            | Event::RoundEnd { run_id, .. }
            | Event::MessageStart { run_id, .. }
            | Event::MessageChunk { run_id, .. }
            | Event::MessageEnd { run_id, .. }
            | Event::FixStart { run_id, .. }
            | Event::FixEnd { run_id, .. } => Some(*run_id),
            Event::Error { run_id, .. } => *run_id,
        }
    }
}
