//! Single executor step and pre-flight checks.

use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use tribunal_core::{ExecutorRole, Message, Phase, RunResult};

use events::Event;

use crate::config::RoleAgents;
use crate::error::{OrchestratorError, Result};
use crate::executor::{AgentExecutor, CliExecutor, ExecutionRequest};

use super::events::RunEmitter;

/// The executor bound to each role for one run.
#[derive(Clone)]
pub struct RoleExecutors {
    pub moderator: Arc<dyn AgentExecutor>,
    pub challenger: Arc<dyn AgentExecutor>,
    pub defender: Arc<dyn AgentExecutor>,
}

impl RoleExecutors {
    pub fn new(
        moderator: Arc<dyn AgentExecutor>,
        challenger: Arc<dyn AgentExecutor>,
        defender: Arc<dyn AgentExecutor>,
    ) -> Self {
        Self {
            moderator,
            challenger,
            defender,
        }
    }

    /// Builds one [`CliExecutor`] per role, optionally rooted in `working_dir`.
    pub fn from_agents(agents: &RoleAgents, working_dir: Option<&Path>) -> Self {
        let build = |role: ExecutorRole| -> Arc<dyn AgentExecutor> {
            let mut executor = CliExecutor::from_agent(agents.get(role));
            if let Some(dir) = working_dir {
                executor = executor.with_working_dir(dir);
            }
            Arc::new(executor)
        };

        Self::new(
            build(ExecutorRole::Moderator),
            build(ExecutorRole::Challenger),
            build(ExecutorRole::Defender),
        )
    }

    pub fn get(&self, role: ExecutorRole) -> &dyn AgentExecutor {
        match role {
            ExecutorRole::Moderator => self.moderator.as_ref(),
            ExecutorRole::Challenger => self.challenger.as_ref(),
            ExecutorRole::Defender => self.defender.as_ref(),
        }
    }

    pub fn all(&self) -> [(ExecutorRole, &dyn AgentExecutor); 3] {
        ExecutorRole::ALL.map(|role| (role, self.get(role)))
    }
}

/// One prompt sent to one role.
#[derive(Debug, Clone, Copy)]
pub struct Step<'a> {
    pub role: ExecutorRole,
    pub phase: Phase,
    pub round: Option<u32>,
    pub prompt: &'a str,
    pub context: Option<&'a str>,
}

impl<'a> Step<'a> {
    pub fn new(role: ExecutorRole, phase: Phase, prompt: &'a str) -> Self {
        Self {
            role,
            phase,
            round: None,
            prompt,
            context: None,
        }
    }

    pub fn in_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }

    pub fn with_context(mut self, context: &'a str) -> Self {
        self.context = Some(context);
        self
    }
}

/// Runs `step` on `executor`.
///
/// Publishes `message:start` and, when `streaming` is set, one
/// `message:chunk` per output increment. A failed execution becomes
/// [`OrchestratorError::ExecutionFailed`]; the caller decides whether that
/// aborts the run.
pub async fn invoke(
    emitter: &RunEmitter,
    executor: &dyn AgentExecutor,
    step: Step<'_>,
    streaming: bool,
) -> Result<Message> {
    let run_id = emitter.run_id();
    let backend = executor.backend();
    let role = step.role;

    emitter.emit(Event::MessageStart {
        run_id,
        role,
        backend,
        phase: step.phase,
        round: step.round,
    });
    debug!(
        role = %role,
        backend = %backend,
        phase = %step.phase,
        prompt_length = step.prompt.len(),
        "Invoking executor"
    );

    let forward = |chunk: &str| {
        emitter.emit(Event::MessageChunk {
            run_id,
            role,
            backend,
            chunk: chunk.to_string(),
        })
    };

    let mut request = ExecutionRequest::new(step.prompt);
    if let Some(context) = step.context {
        request = request.with_context(context);
    }
    if streaming {
        request = request.with_chunk_sink(&forward);
    }

    let result = executor.execute(request).await;
    if !result.success {
        let reason = result.error_message();
        warn!(
            role = %role,
            backend = %backend,
            phase = %step.phase,
            timed_out = result.timed_out(),
            error = %reason,
            "Executor step failed"
        );
        return Err(OrchestratorError::execution_failed(step.phase, role, reason));
    }

    debug!(
        role = %role,
        duration_ms = result.duration_ms,
        output_length = result.output.len(),
        "Executor step completed"
    );

    let mut message = Message::new(role, backend, result.output, step.phase);
    if let Some(round) = step.round {
        message = message.with_round(round);
    }
    Ok(message)
}

/// Appends `message` to the transcript and publishes `message:end`.
pub fn record<D>(result: &mut RunResult<D>, emitter: &RunEmitter, message: Message) -> Message {
    let stored = result.push_message(message).clone();
    emitter.emit(Event::MessageEnd {
        run_id: emitter.run_id(),
        message: stored.clone(),
    });
    stored
}

/// Probes every executor concurrently.
///
/// Fails with one error naming every unavailable role and its backend.
pub async fn ensure_available(executors: &[(ExecutorRole, &dyn AgentExecutor)]) -> Result<()> {
    let probes = executors.iter().map(|(role, executor)| async move {
        (*role, executor.backend(), executor.is_available().await)
    });

    let unavailable: Vec<String> = join_all(probes)
        .await
        .into_iter()
        .filter(|(_, _, available)| !available)
        .map(|(role, backend, _)| format!("{} ({})", role, backend))
        .collect();

    if unavailable.is_empty() {
        Ok(())
    } else {
        Err(OrchestratorError::ExecutorUnavailable {
            roles: unavailable.join(", "),
        })
    }
}
