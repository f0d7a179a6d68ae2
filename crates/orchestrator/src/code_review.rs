//! Code-review workflow:
//! `BuildCheck? → Analysis → Defense → Verdict → ParallelFix?`.

use std::collections::HashSet;
use tracing::{error, info, warn};
use tribunal_core::{
    CodeReviewDetail, CodeReviewResult, ExecutorRole, FixStatus, Issue, Message, Phase,
};

use events::{EventBus, RunKind};

use crate::config::CodeReviewConfig;
use crate::engine::{ensure_available, invoke, record, RoleExecutors, RunEmitter, Step};
use crate::error::Result;
use crate::output_parser::StructuredOutputParser;
use crate::phases::{run_fix_tasks, BuildCheck, FixPool};
use crate::prompts::ReviewPrompts;
use crate::state_machine::{PhaseStateMachine, Workflow};

pub struct CodeReviewOrchestrator {
    config: CodeReviewConfig,
    executors: RoleExecutors,
    fixers: FixPool,
    build_check: Option<BuildCheck>,
    bus: EventBus,
}

impl CodeReviewOrchestrator {
    /// Validates `config` and binds CLI executors rooted in the review path:
    /// one per role plus one auto-approving fixer per fixer backend.
    pub fn new(config: CodeReviewConfig, bus: EventBus) -> Result<Self> {
        let agents = config.validate()?;
        let executors = RoleExecutors::from_agents(&agents, Some(config.path.as_path()));
        let fixers = FixPool::from_backends(&config.fixer_backends(), &config.path, config.fix_timeout);
        Ok(Self::with_executors(config, executors, fixers, bus))
    }

    pub fn with_executors(
        config: CodeReviewConfig,
        executors: RoleExecutors,
        fixers: FixPool,
        bus: EventBus,
    ) -> Self {
        let build_check = config
            .build_command
            .as_deref()
            .map(|command| BuildCheck::new(command, &config.path, config.build_timeout));
        Self {
            config,
            executors,
            fixers,
            build_check,
            bus,
        }
    }

    /// Replaces the build check, e.g. to run it through a different executor.
    pub fn with_build_check(mut self, build_check: BuildCheck) -> Self {
        self.build_check = Some(build_check);
        self
    }

    pub fn config(&self) -> &CodeReviewConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Runs the review to a terminal status. Never errors: failures end up in
    /// `status` and `error`, with issues and transcript so far preserved.
    pub async fn run(&self) -> CodeReviewResult {
        let path = self.config.path.display().to_string();
        let mut result = CodeReviewResult::new(CodeReviewDetail {
            path: path.clone(),
            ..Default::default()
        });
        let emitter = RunEmitter::new(self.bus.clone(), result.id);

        result.start();
        info!(
            run_id = %result.id,
            path = %path,
            auto_fix = self.config.auto_fix,
            "Starting code review"
        );
        emitter.run_start(RunKind::CodeReview, path.as_str());

        match self.drive(&emitter, &mut result, &path).await {
            Ok(()) => {
                result.complete();
                info!(
                    run_id = %result.id,
                    issues = result.detail.issues.len(),
                    confirmed = result.detail.confirmed_issues.len(),
                    fix_tasks = result.detail.fix_tasks.len(),
                    "Code review completed"
                );
            }
            Err(e) => {
                error!(run_id = %result.id, error = %e, "Code review failed");
                emitter.error(e.to_string(), e.phase(), true);
                result.fail(e.to_string());
            }
        }

        emitter.run_end(result.status, result.error.clone());
        result
    }

    async fn drive(
        &self,
        emitter: &RunEmitter,
        result: &mut CodeReviewResult,
        path: &str,
    ) -> Result<()> {
        ensure_available(&self.executors.all()).await?;
        let mut machine = PhaseStateMachine::new(Workflow::CodeReview);

        if let Some(build_check) = &self.build_check {
            machine.enter(Phase::BuildCheck)?;
            emitter.phase_start(Phase::BuildCheck);
            let outcome = build_check.run().await;
            if !outcome.success {
                let reason = outcome.errors.first().map(String::as_str).unwrap_or("no output");
                emitter.error(
                    format!("build check `{}` failed: {}", build_check.command(), reason),
                    Some(Phase::BuildCheck),
                    false,
                );
                result.detail.build_errors = outcome.errors;
            }
            emitter.phase_end(Phase::BuildCheck, outcome.success);
        }

        machine.enter(Phase::Analysis)?;
        emitter.phase_start(Phase::Analysis);
        let issues = self.analyze(emitter, result, path).await;
        result.detail.issues = emitter.end_phase(Phase::Analysis, issues)?;

        if result.detail.issues.is_empty() {
            info!("No issues found; skipping defense, verdict and fixes");
            return Ok(());
        }

        machine.enter(Phase::Defense)?;
        emitter.phase_start(Phase::Defense);
        let prompt = ReviewPrompts::defense(path, &result.detail.issues);
        let defense = self
            .step(emitter, result, ExecutorRole::Defender, Phase::Defense, &prompt)
            .await;
        let defense = emitter.end_phase(Phase::Defense, defense)?;

        machine.enter(Phase::Verdict)?;
        emitter.phase_start(Phase::Verdict);
        let verdict = self.verdict(emitter, result, path, &defense.content).await;
        result.detail.confirmed_issues = emitter.end_phase(Phase::Verdict, verdict)?;

        if !self.config.auto_fix || result.detail.confirmed_issues.is_empty() {
            return Ok(());
        }

        machine.enter(Phase::ParallelFix)?;
        emitter.phase_start(Phase::ParallelFix);
        self.fix(emitter, result, path).await;
        let all_fixed = result
            .detail
            .fix_tasks
            .iter()
            .all(|task| task.status == FixStatus::Completed);
        emitter.phase_end(Phase::ParallelFix, all_fixed);

        Ok(())
    }

    async fn analyze(
        &self,
        emitter: &RunEmitter,
        result: &mut CodeReviewResult,
        path: &str,
    ) -> Result<Vec<Issue>> {
        let focus = &self.config.focus;
        let prompt = ReviewPrompts::analysis(path, focus, &result.detail.build_errors);
        let message = self
            .step(emitter, result, ExecutorRole::Challenger, Phase::Analysis, &prompt)
            .await?;

        let parsed = StructuredOutputParser::parse_issues(&message.content);
        note_parse_error(emitter, result, Phase::Analysis, parsed.error);

        let mut issues = parsed.value;
        if !focus.is_empty() {
            let before = issues.len();
            issues.retain(|issue| focus.contains(&issue.issue_type));
            if issues.len() < before {
                info!(dropped = before - issues.len(), "Dropped issues outside the focus filter");
            }
        }

        info!(issues = issues.len(), "Analysis completed");
        Ok(issues)
    }

    /// Returns the ids of confirmed issues. An unusable verdict confirms
    /// every issue without reassigning any.
    async fn verdict(
        &self,
        emitter: &RunEmitter,
        result: &mut CodeReviewResult,
        path: &str,
        defense: &str,
    ) -> Result<Vec<String>> {
        let prompt = ReviewPrompts::verdict(path, &result.detail.issues, defense);
        let message = self
            .step(emitter, result, ExecutorRole::Moderator, Phase::Verdict, &prompt)
            .await?;

        let parsed = StructuredOutputParser::parse_verdict(&message.content);
        note_parse_error(emitter, result, Phase::Verdict, parsed.error);

        let confirmed = match parsed.value {
            Some(verdict) => {
                if !verdict.summary.trim().is_empty() {
                    result.detail.verdict_summary = Some(verdict.summary.trim().to_string());
                }
                verdict.apply(&mut result.detail.issues)
            }
            None => result.detail.issues.iter().map(|i| i.id.clone()).collect(),
        };

        info!(
            confirmed = confirmed.len(),
            reported = result.detail.issues.len(),
            "Verdict reached"
        );
        Ok(confirmed)
    }

    async fn fix(&self, emitter: &RunEmitter, result: &mut CodeReviewResult, path: &str) {
        let confirmed: HashSet<&str> = result
            .detail
            .confirmed_issues
            .iter()
            .map(String::as_str)
            .collect();
        let to_fix: Vec<Issue> = result
            .detail
            .issues
            .iter()
            .filter(|issue| confirmed.contains(issue.id.as_str()))
            .cloned()
            .collect();

        let tasks = run_fix_tasks(
            emitter,
            &self.fixers,
            path,
            &to_fix,
            self.config.max_parallel_fixes,
        )
        .await;

        for task in &tasks {
            if let Some(issue) = result
                .detail
                .issues
                .iter_mut()
                .find(|issue| issue.id == task.issue.id)
            {
                issue.fixed = task.status == FixStatus::Completed;
                issue.fix_result = task.result.clone();
            }
        }

        let failed = tasks
            .iter()
            .filter(|task| task.status == FixStatus::Failed)
            .count();
        if failed > 0 {
            warn!(failed, total = tasks.len(), "Some fix tasks failed");
        }
        result.detail.fix_tasks = tasks;
    }

    async fn step(
        &self,
        emitter: &RunEmitter,
        result: &mut CodeReviewResult,
        role: ExecutorRole,
        phase: Phase,
        prompt: &str,
    ) -> Result<Message> {
        let step = Step::new(role, phase, prompt);
        let message = invoke(emitter, self.executors.get(role), step, self.config.streaming).await?;
        Ok(record(result, emitter, message))
    }
}

/// Records a recovered parse failure in the result and as a non-fatal event.
fn note_parse_error(
    emitter: &RunEmitter,
    result: &mut CodeReviewResult,
    phase: Phase,
    error: Option<String>,
) {
    if let Some(error) = error {
        let message = format!("{} output could not be parsed: {}", phase, error);
        emitter.error(message.as_str(), Some(phase), false);
        result.detail.parse_errors.push(message);
    }
}
