//! Debate workflow: `Opening → Round(1..N) → Final`.

use std::time::Instant;
use tracing::{error, info};
use tribunal_core::{DebateDetail, DebateResult, ExecutorRole, Message, Phase, RoundResult};

use events::{EventBus, RunKind};

use crate::config::DebateConfig;
use crate::engine::{ensure_available, invoke, record, RoleExecutors, RunEmitter, Step};
use crate::error::Result;
use crate::prompts::{format_transcript, DebatePrompts};
use crate::state_machine::{PhaseStateMachine, Workflow};

pub struct DebateOrchestrator {
    config: DebateConfig,
    executors: RoleExecutors,
    bus: EventBus,
}

impl DebateOrchestrator {
    /// Validates `config` and binds a CLI executor to each role.
    pub fn new(config: DebateConfig, bus: EventBus) -> Result<Self> {
        let agents = config.validate()?;
        let executors = RoleExecutors::from_agents(&agents, None);
        Ok(Self::with_executors(config, executors, bus))
    }

    pub fn with_executors(config: DebateConfig, executors: RoleExecutors, bus: EventBus) -> Self {
        Self {
            config,
            executors,
            bus,
        }
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Runs the debate to a terminal status. Never errors: failures end up in
    /// `status` and `error`, with the transcript so far preserved.
    pub async fn run(&self) -> DebateResult {
        let mut result = DebateResult::new(DebateDetail {
            topic: self.config.topic.clone(),
            ..Default::default()
        });
        let emitter = RunEmitter::new(self.bus.clone(), result.id);

        result.start();
        info!(
            run_id = %result.id,
            topic = %self.config.topic,
            rounds = self.config.rounds,
            "Starting debate"
        );
        emitter.run_start(RunKind::Debate, self.config.topic.as_str());

        match self.drive(&emitter, &mut result).await {
            Ok(()) => {
                result.complete();
                info!(
                    run_id = %result.id,
                    messages = result.messages.len(),
                    duration_ms = result.duration_ms().unwrap_or_default(),
                    "Debate completed"
                );
            }
            Err(e) => {
                error!(run_id = %result.id, error = %e, "Debate failed");
                emitter.error(e.to_string(), e.phase(), true);
                result.fail(e.to_string());
            }
        }

        emitter.run_end(result.status, result.error.clone());
        result
    }

    async fn drive(&self, emitter: &RunEmitter, result: &mut DebateResult) -> Result<()> {
        ensure_available(&self.executors.all()).await?;

        let topic = self.config.topic.as_str();
        let total = self.config.rounds;
        let mut machine = PhaseStateMachine::new(Workflow::Debate);

        machine.enter(Phase::Opening)?;
        emitter.phase_start(Phase::Opening);
        let prompt = DebatePrompts::opening(topic, total);
        let opening = self
            .step(emitter, result, ExecutorRole::Moderator, Phase::Opening, None, &prompt)
            .await;
        result.detail.opening = Some(emitter.end_phase(Phase::Opening, opening)?);

        for round in 1..=total {
            machine.enter(Phase::Round)?;
            emitter.phase_start(Phase::Round);
            emitter.round_start(round, total);

            let outcome = self.round(emitter, result, round).await;
            let round_result = emitter.end_phase(Phase::Round, outcome)?;
            emitter.round_end(round, round_result.duration_ms);
            info!(round, total, duration_ms = round_result.duration_ms, "Round completed");
            result.detail.rounds.push(round_result);
        }

        machine.enter(Phase::Final)?;
        emitter.phase_start(Phase::Final);
        let prompt = DebatePrompts::final_verdict(topic);
        let verdict = self
            .step(emitter, result, ExecutorRole::Moderator, Phase::Final, None, &prompt)
            .await;
        result.detail.final_verdict = Some(emitter.end_phase(Phase::Final, verdict)?);

        Ok(())
    }

    /// Challenger, then defender, then moderator; each sees the transcript
    /// including the previous step.
    async fn round(
        &self,
        emitter: &RunEmitter,
        result: &mut DebateResult,
        round: u32,
    ) -> Result<RoundResult> {
        let started = Instant::now();
        let topic = self.config.topic.as_str();

        let prompt = DebatePrompts::challenge(topic, round);
        let challenge = self
            .step(emitter, result, ExecutorRole::Challenger, Phase::Round, Some(round), &prompt)
            .await?;

        let prompt = DebatePrompts::defend(topic, round);
        let defense = self
            .step(emitter, result, ExecutorRole::Defender, Phase::Round, Some(round), &prompt)
            .await?;

        let prompt = DebatePrompts::evaluate(topic, round);
        let evaluation = self
            .step(emitter, result, ExecutorRole::Moderator, Phase::Round, Some(round), &prompt)
            .await?;

        Ok(RoundResult {
            round,
            challenge,
            defense,
            evaluation,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn step(
        &self,
        emitter: &RunEmitter,
        result: &mut DebateResult,
        role: ExecutorRole,
        phase: Phase,
        round: Option<u32>,
        prompt: &str,
    ) -> Result<Message> {
        let context = format_transcript(&result.messages);
        let mut step = Step::new(role, phase, prompt).with_context(&context);
        if let Some(round) = round {
            step = step.in_round(round);
        }

        let message = invoke(emitter, self.executors.get(role), step, self.config.streaming).await?;
        Ok(record(result, emitter, message))
    }
}
