use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::issue::{FixTask, Issue};
use super::message::Message;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Timeout,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout)
    }
}

/// One challenge, defense and evaluation cycle of a debate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundResult {
    pub round: u32,
    pub challenge: Message,
    pub defense: Message,
    pub evaluation: Message,
    pub duration_ms: u64,
}

/// Result of one orchestration run.
///
/// The transcript in `messages` is append-only. Partial progress is kept when
/// the run fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult<D> {
    pub id: Uuid,
    pub status: RunStatus,
    pub messages: Vec<Message>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub detail: D,
}

impl<D> RunResult<D> {
    pub fn new(detail: D) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: RunStatus::Pending,
            messages: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
            error: None,
            detail,
        }
    }

    pub fn start(&mut self) {
        self.status = RunStatus::InProgress;
        self.started_at = Utc::now();
    }

    /// Appends to the transcript and returns the stored message.
    pub fn push_message(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn complete(&mut self) {
        self.finish(RunStatus::Completed, None);
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.finish(RunStatus::Failed, Some(error.into()));
    }

    fn finish(&mut self, status: RunStatus, error: Option<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        self.error = error;
        self.ended_at = Some(Utc::now());
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.ended_at
            .map(|end| (end - self.started_at).num_milliseconds())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebateDetail {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening: Option<Message>,
    pub rounds: Vec<RoundResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_verdict: Option<Message>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeReviewDetail {
    pub path: String,
    /// Every issue found during analysis, in discovery order.
    pub issues: Vec<Issue>,
    /// Ids of the issues the moderator upheld.
    pub confirmed_issues: Vec<String>,
    pub fix_tasks: Vec<FixTask>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict_summary: Option<String>,
    /// Advisory build failures, never fatal.
    pub build_errors: Vec<String>,
    /// Recovered structured-output failures, never fatal.
    pub parse_errors: Vec<String>,
}

pub type DebateResult = RunResult<DebateDetail>;
pub type CodeReviewResult = RunResult<CodeReviewDetail>;
