mod agent;
mod issue;
mod message;
mod run;

pub use agent::{serde_secs, AgentConfig, Backend, ExecutorRole, DEFAULT_TIMEOUT};
pub use issue::{FixStatus, FixTask, Issue, IssueType, Severity};
pub use message::{ExecutionResult, Message, Phase, TIMEOUT_SENTINEL};
pub use run::{
    CodeReviewDetail, CodeReviewResult, DebateDetail, DebateResult, RoundResult, RunResult,
    RunStatus,
};
