//! Multi-agent orchestration over external LLM command-line tools.
//!
//! Two workflows drive three role-bound executors: [`DebateOrchestrator`]
//! and [`CodeReviewOrchestrator`]. Progress is published on an
//! [`events::EventBus`]; each run returns a serializable result.

pub mod code_review;
pub mod config;
pub mod debate;
pub mod engine;
pub mod error;
pub mod executor;
pub mod output_parser;
pub mod phases;
pub mod prompts;
pub mod state_machine;

pub use code_review::CodeReviewOrchestrator;
pub use config::{CodeReviewConfig, DebateConfig, RoleAgents};
pub use debate::DebateOrchestrator;
pub use engine::{RoleExecutors, RunEmitter};
pub use error::{OrchestratorError, Result};
pub use executor::{AgentExecutor, CliExecutor, CommandTemplate, ExecutionRequest, PromptStyle};
pub use output_parser::{ParseOutcome, StructuredOutputParser, Verdict, VerdictEntry};
pub use phases::{BuildCheck, FixPool};
pub use state_machine::{PhaseStateMachine, Workflow};
