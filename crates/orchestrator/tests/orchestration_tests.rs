use async_trait::async_trait;
use events::{Event, EventBus, EventEnvelope};
use orchestrator::{
    AgentExecutor, BuildCheck, CodeReviewConfig, CodeReviewOrchestrator, DebateConfig, DebateOrchestrator,
    ExecutionRequest, FixPool, RoleExecutors,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tribunal_core::{
    Backend, ExecutionResult, ExecutorRole, FixStatus, IssueType, Phase, RunStatus,
};

type Responder = Box<dyn Fn(&str) -> ExecutionResult + Send + Sync>;

/// In-memory executor that answers from a closure and records every prompt.
struct ScriptedExecutor {
    backend: Backend,
    available: bool,
    responder: Responder,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn new(
        backend: Backend,
        responder: impl Fn(&str) -> ExecutionResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            backend,
            available: true,
            responder: Box::new(responder),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn replying(backend: Backend, text: &str) -> Arc<Self> {
        let text = text.to_string();
        Arc::new(Self::new(backend, move |_| {
            ExecutionResult::success(text.clone(), 1)
        }))
    }

    fn failing(backend: Backend, error: &str) -> Arc<Self> {
        let error = error.to_string();
        Arc::new(Self::new(backend, move |_| {
            ExecutionResult::failure(String::new(), error.clone(), 2)
        }))
    }

    fn unavailable(backend: Backend) -> Arc<Self> {
        let mut executor = Self::new(backend, |_| ExecutionResult::success(String::new(), 0));
        executor.available = false;
        Arc::new(executor)
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl AgentExecutor for ScriptedExecutor {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn execute(&self, request: ExecutionRequest<'_>) -> ExecutionResult {
        let prompt = request.full_prompt();
        self.prompts.lock().unwrap().push(prompt.clone());
        let result = (self.responder)(&prompt);
        if let Some(sink) = request.on_chunk {
            for chunk in result.output.split_inclusive(' ') {
                sink(chunk);
            }
        }
        result
    }
}

/// Records every published envelope through a synchronous listener.
fn record_events(bus: &EventBus) -> Arc<Mutex<Vec<EventEnvelope>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    bus.on(move |envelope| sink.lock().unwrap().push(envelope.clone()));
    seen
}

fn event_names(events: &Mutex<Vec<EventEnvelope>>) -> Vec<&'static str> {
    events
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.event.name())
        .collect()
}

mod debate {
    use super::*;

    struct Panel {
        moderator: Arc<ScriptedExecutor>,
        challenger: Arc<ScriptedExecutor>,
        defender: Arc<ScriptedExecutor>,
    }

    impl Panel {
        fn replying() -> Self {
            Self {
                moderator: ScriptedExecutor::replying(Backend::Claude, "moderator ruling"),
                challenger: ScriptedExecutor::replying(Backend::Codex, "challenger argument"),
                defender: ScriptedExecutor::replying(Backend::Gemini, "defender rebuttal"),
            }
        }

        fn executors(&self) -> RoleExecutors {
            RoleExecutors::new(
                self.moderator.clone(),
                self.challenger.clone(),
                self.defender.clone(),
            )
        }

        fn orchestrator(&self, config: DebateConfig, bus: EventBus) -> DebateOrchestrator {
            DebateOrchestrator::with_executors(config, self.executors(), bus)
        }
    }

    #[tokio::test]
    async fn test_round_count_and_transcript_order() {
        for rounds in [0u32, 1, 3] {
            let panel = Panel::replying();
            let config = DebateConfig::new("X").with_rounds(rounds);
            let result = panel.orchestrator(config, EventBus::new()).run().await;

            assert_eq!(result.status, RunStatus::Completed, "rounds = {}", rounds);
            assert_eq!(result.detail.rounds.len(), rounds as usize);
            assert_eq!(result.messages.len(), 2 + 3 * rounds as usize);

            let first = &result.messages[0];
            assert_eq!((first.role, first.phase), (ExecutorRole::Moderator, Phase::Opening));
            let last = result.messages.last().unwrap();
            assert_eq!((last.role, last.phase), (ExecutorRole::Moderator, Phase::Final));

            for round in 1..=rounds {
                let start = 1 + 3 * (round as usize - 1);
                let roles: Vec<ExecutorRole> = result.messages[start..start + 3]
                    .iter()
                    .map(|m| m.role)
                    .collect();
                assert_eq!(
                    roles,
                    vec![
                        ExecutorRole::Challenger,
                        ExecutorRole::Defender,
                        ExecutorRole::Moderator
                    ]
                );
                assert!(result.messages[start..start + 3]
                    .iter()
                    .all(|m| m.round == Some(round)));
                assert_eq!(result.detail.rounds[round as usize - 1].round, round);
            }
        }
    }

    #[tokio::test]
    async fn test_single_round_completes_with_final_verdict() {
        let panel = Panel::replying();
        let result = panel
            .orchestrator(DebateConfig::new("X").with_rounds(1), EventBus::new())
            .run()
            .await;

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.detail.rounds.len(), 1);
        assert!(result.detail.opening.is_some());
        let verdict = result.detail.final_verdict.as_ref().unwrap();
        assert_eq!(verdict.content, "moderator ruling");
        assert!(result.error.is_none());
        assert!(result.ended_at.is_some());
    }

    #[tokio::test]
    async fn test_unavailable_role_fails_before_any_message() {
        let panel = Panel {
            defender: ScriptedExecutor::unavailable(Backend::Gemini),
            ..Panel::replying()
        };
        let result = panel
            .orchestrator(DebateConfig::new("X").with_rounds(1), EventBus::new())
            .run()
            .await;

        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.messages.is_empty());
        let error = result.error.unwrap();
        assert!(error.contains("defender"), "error: {}", error);
        assert_eq!(panel.moderator.calls(), 0);
        assert_eq!(panel.challenger.calls(), 0);
    }

    #[tokio::test]
    async fn test_mid_round_failure_keeps_partial_transcript() {
        let defender_calls = AtomicUsize::new(0);
        let panel = Panel {
            defender: Arc::new(ScriptedExecutor::new(Backend::Gemini, move |_| {
                if defender_calls.fetch_add(1, Ordering::SeqCst) == 1 {
                    ExecutionResult::failure(String::new(), "boom", 3)
                } else {
                    ExecutionResult::success("defender rebuttal".to_string(), 1)
                }
            })),
            ..Panel::replying()
        };
        let result = panel
            .orchestrator(DebateConfig::new("X").with_rounds(3), EventBus::new())
            .run()
            .await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(
            result.error.as_deref(),
            Some("defender failed during round phase: boom")
        );
        // opening, round 1, round 2 challenge
        assert_eq!(result.messages.len(), 5);
        assert_eq!(result.detail.rounds.len(), 1);
        assert!(result.detail.final_verdict.is_none());
        assert_eq!(panel.challenger.calls(), 2);
    }

    #[tokio::test]
    async fn test_each_step_sees_extended_transcript() {
        let panel = Panel::replying();
        panel
            .orchestrator(DebateConfig::new("X").with_rounds(1), EventBus::new())
            .run()
            .await;

        let defender_prompt = &panel.defender.prompts()[0];
        assert!(defender_prompt.contains("challenger argument"));
        assert!(defender_prompt.contains("moderator ruling"));

        let challenger_prompt = &panel.challenger.prompts()[0];
        assert!(!challenger_prompt.contains("defender rebuttal"));

        let final_prompt = panel.moderator.prompts().pop().unwrap();
        assert!(final_prompt.contains("defender rebuttal"));
        assert!(final_prompt.contains("final verdict"));
    }

    #[tokio::test]
    async fn test_event_stream_order() {
        let bus = EventBus::new();
        let events = record_events(&bus);
        let panel = Panel::replying();
        panel
            .orchestrator(DebateConfig::new("X").with_rounds(1), bus)
            .run()
            .await;

        let names = event_names(&events);
        assert_eq!(names.first(), Some(&"debate:start"));
        assert_eq!(names.last(), Some(&"debate:end"));
        assert!(names.contains(&"message:chunk"));
        assert_eq!(names.iter().filter(|n| **n == "message:end").count(), 5);
        assert_eq!(names.iter().filter(|n| **n == "round:start").count(), 1);

        let sequences: Vec<u64> = events.lock().unwrap().iter().map(|e| e.sequence).collect();
        assert!(sequences.windows(2).all(|w| w[0] < w[1]));

        let round_start = names.iter().position(|n| *n == "round:start").unwrap();
        let round_end = names.iter().position(|n| *n == "round:end").unwrap();
        assert!(round_start < round_end);
    }

    #[tokio::test]
    async fn test_streaming_disabled_suppresses_chunks() {
        let bus = EventBus::new();
        let events = record_events(&bus);
        let panel = Panel::replying();
        panel
            .orchestrator(
                DebateConfig::new("X").with_rounds(0).with_streaming(false),
                bus,
            )
            .run()
            .await;

        let names = event_names(&events);
        assert!(!names.contains(&"message:chunk"));
        assert_eq!(names.iter().filter(|n| **n == "message:start").count(), 2);
        assert_eq!(names.iter().filter(|n| **n == "message:end").count(), 2);
    }

    #[tokio::test]
    async fn test_failure_publishes_fatal_error() {
        let bus = EventBus::new();
        let events = record_events(&bus);
        let panel = Panel {
            moderator: ScriptedExecutor::failing(Backend::Claude, "timeout after 300000ms"),
            ..Panel::replying()
        };
        let result = panel.orchestrator(DebateConfig::new("X"), bus).run().await;

        assert_eq!(result.status, RunStatus::Failed);
        let events = events.lock().unwrap();
        let fatal = events.iter().find_map(|e| match &e.event {
            Event::Error {
                fatal: true, phase, ..
            } => Some(*phase),
            _ => None,
        });
        assert_eq!(fatal, Some(Some(Phase::Opening)));
        match &events.last().unwrap().event {
            Event::DebateEnd { status, error, .. } => {
                assert_eq!(*status, RunStatus::Failed);
                assert!(error.as_deref().unwrap().contains("timeout"));
            }
            other => panic!("unexpected last event {:?}", other),
        }
    }
}

mod code_review {
    use super::*;

    const TWO_ISSUES: &str = r#"Here is what I found:

```json
{
  "issues": [
    {"type": "bug", "severity": "high", "description": "null deref", "filePath": "src/a.rs", "lineNumber": 3},
    {"type": "security", "severity": "critical", "description": "sql injection"}
  ]
}
```"#;

    const THREE_ISSUES: &str = r#"```json
{"issues": [
  {"type": "bug", "severity": "low", "description": "one"},
  {"type": "performance", "severity": "medium", "description": "two"},
  {"type": "design", "severity": "high", "description": "three"}
]}
```"#;

    struct Review {
        moderator: Arc<ScriptedExecutor>,
        challenger: Arc<ScriptedExecutor>,
        defender: Arc<ScriptedExecutor>,
        fixers: Vec<Arc<ScriptedExecutor>>,
        dir: TempDir,
    }

    impl Review {
        fn new(analysis: &str, verdict: &str) -> Self {
            Self {
                moderator: ScriptedExecutor::replying(Backend::Claude, verdict),
                challenger: ScriptedExecutor::replying(Backend::Codex, analysis),
                defender: ScriptedExecutor::replying(Backend::Gemini, "these are intended"),
                fixers: Backend::ALL
                    .iter()
                    .map(|b| ScriptedExecutor::replying(*b, &format!("patched by {}", b)))
                    .collect(),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn config(&self) -> CodeReviewConfig {
            CodeReviewConfig::new(self.dir.path())
        }

        fn fixer(&self, backend: Backend) -> &ScriptedExecutor {
            self.fixers.iter().find(|f| f.backend == backend).unwrap()
        }

        fn orchestrator(&self, config: CodeReviewConfig, bus: EventBus) -> CodeReviewOrchestrator {
            let executors = RoleExecutors::new(
                self.moderator.clone(),
                self.challenger.clone(),
                self.defender.clone(),
            );
            let pool = self
                .fixers
                .iter()
                .fold(FixPool::new(), |pool, fixer| pool.with_executor(fixer.clone()));
            CodeReviewOrchestrator::with_executors(config, executors, pool, bus)
        }
    }

    fn verdict(entries: &[(&str, Option<&str>)]) -> String {
        let entries: Vec<String> = entries
            .iter()
            .map(|(id, assign)| match assign {
                Some(backend) => format!(
                    r#"{{"issueId": "{}", "confirmed": true, "assignTo": "{}"}}"#,
                    id, backend
                ),
                None => format!(r#"{{"issueId": "{}", "confirmed": true}}"#, id),
            })
            .collect();
        format!(
            "```json\n{{\"confirmedIssues\": [{}], \"summary\": \"upheld\"}}\n```",
            entries.join(", ")
        )
    }

    #[tokio::test]
    async fn test_zero_issues_short_circuits() {
        let review = Review::new("```json\n{\"issues\": []}\n```", "unused");
        let config = review.config().with_auto_fix(true);
        let result = review.orchestrator(config, EventBus::new()).run().await;

        assert_eq!(result.status, RunStatus::Completed);
        assert!(result.detail.issues.is_empty());
        assert!(result.detail.fix_tasks.is_empty());
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].phase, Phase::Analysis);
        assert_eq!(review.defender.calls(), 0);
        assert_eq!(review.moderator.calls(), 0);
    }

    #[tokio::test]
    async fn test_default_assigned_issues_route_to_default_backend() {
        let review = Review::new(
            TWO_ISSUES,
            &verdict(&[("issue-1", None), ("issue-2", None)]),
        );
        let config = review.config().with_auto_fix(true);
        let result = review.orchestrator(config, EventBus::new()).run().await;

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.detail.confirmed_issues, vec!["issue-1", "issue-2"]);
        assert_eq!(result.detail.fix_tasks.len(), 2);
        assert!(result
            .detail
            .fix_tasks
            .iter()
            .all(|t| t.backend == Backend::DEFAULT && t.status.is_terminal()));
        assert_eq!(review.fixer(Backend::DEFAULT).calls(), 2);
        assert!(result.detail.issues.iter().all(|i| i.fixed));
        assert_eq!(result.detail.verdict_summary.as_deref(), Some("upheld"));
    }

    #[tokio::test]
    async fn test_fix_failure_isolated() {
        let mut review = Review::new(
            THREE_ISSUES,
            &verdict(&[
                ("issue-1", Some("claude")),
                ("issue-2", Some("codex")),
                ("issue-3", Some("gemini")),
            ]),
        );
        review.fixers[1] = ScriptedExecutor::failing(Backend::Codex, "codex crashed");
        let config = review.config().with_auto_fix(true);
        let result = review.orchestrator(config, EventBus::new()).run().await;

        assert_eq!(result.status, RunStatus::Completed);
        let tasks = &result.detail.fix_tasks;
        assert_eq!(
            tasks.iter().map(|t| t.status).collect::<Vec<_>>(),
            vec![FixStatus::Completed, FixStatus::Failed, FixStatus::Completed]
        );
        assert_eq!(tasks[1].backend, Backend::Codex);
        assert_eq!(tasks[1].result.as_deref(), Some("codex crashed"));
        assert!(tasks[1].duration_ms.is_some());

        let fixed: Vec<bool> = result.detail.issues.iter().map(|i| i.fixed).collect();
        assert_eq!(fixed, vec![true, false, true]);
        assert_eq!(
            result.detail.issues[2].fix_result.as_deref(),
            Some("patched by gemini")
        );
    }

    #[tokio::test]
    async fn test_verdict_drops_unconfirmed_issues() {
        let review = Review::new(TWO_ISSUES, &verdict(&[("issue-2", Some("gemini"))]));
        let config = review.config().with_auto_fix(true);
        let result = review.orchestrator(config, EventBus::new()).run().await;

        assert_eq!(result.detail.issues.len(), 2);
        assert_eq!(result.detail.confirmed_issues, vec!["issue-2"]);
        assert_eq!(result.detail.fix_tasks.len(), 1);
        assert_eq!(result.detail.fix_tasks[0].backend, Backend::Gemini);
        assert_eq!(result.detail.issues[1].assigned_to, Some(Backend::Gemini));
        assert!(!result.detail.issues[0].fixed);
    }

    #[tokio::test]
    async fn test_unparseable_verdict_confirms_everything() {
        let bus = EventBus::new();
        let events = record_events(&bus);
        let review = Review::new(TWO_ISSUES, "I agree with the challenger on all counts.");
        let result = review.orchestrator(review.config(), bus).run().await;

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.detail.confirmed_issues, vec!["issue-1", "issue-2"]);
        assert!(result.detail.issues.iter().all(|i| i.assigned_to.is_none()));
        assert_eq!(result.detail.parse_errors.len(), 1);
        assert!(result.detail.fix_tasks.is_empty());

        let recovered = events.lock().unwrap().iter().any(|e| {
            matches!(
                e.event,
                Event::Error {
                    fatal: false,
                    phase: Some(Phase::Verdict),
                    ..
                }
            )
        });
        assert!(recovered);
    }

    #[tokio::test]
    async fn test_unparseable_analysis_completes_with_no_issues() {
        let review = Review::new("The code looks fine to me.", "unused");
        let result = review.orchestrator(review.config(), EventBus::new()).run().await;

        assert_eq!(result.status, RunStatus::Completed);
        assert!(result.detail.issues.is_empty());
        assert_eq!(result.detail.parse_errors.len(), 1);
        assert_eq!(review.defender.calls(), 0);
    }

    #[tokio::test]
    async fn test_focus_filter() {
        let review = Review::new(TWO_ISSUES, &verdict(&[("issue-2", None)]));
        let config = review.config().with_focus(vec![IssueType::Security]);
        let result = review.orchestrator(config, EventBus::new()).run().await;

        assert_eq!(result.detail.issues.len(), 1);
        assert_eq!(result.detail.issues[0].issue_type, IssueType::Security);
        assert!(review.challenger.prompts()[0].contains("Report only: security"));
    }

    #[tokio::test]
    async fn test_build_failure_is_advisory() {
        let bus = EventBus::new();
        let events = record_events(&bus);
        let review = Review::new("```json\n{\"issues\": []}\n```", "unused");
        let config = review
            .config()
            .with_build_command("echo 'error: linker failed' >&2; exit 1");
        let result = review.orchestrator(config, bus).run().await;

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.detail.build_errors, vec!["error: linker failed"]);
        assert!(review.challenger.prompts()[0].contains("error: linker failed"));

        let names = event_names(&events);
        assert!(names.contains(&"error"));
        assert!(names.contains(&"phase:start"));
    }

    #[tokio::test]
    async fn test_build_check_through_custom_executor() {
        let builder = Arc::new(ScriptedExecutor::new(Backend::Claude, |command| {
            assert_eq!(command, "make check");
            ExecutionResult::failure(
                "compiling...\nsrc/lib.rs:3: undefined symbol".to_string(),
                "make exited with code 2",
                9,
            )
        }));
        let review = Review::new("```json\n{\"issues\": []}\n```", "unused");
        let result = review
            .orchestrator(review.config(), EventBus::new())
            .with_build_check(BuildCheck::with_executor("make check", builder.clone()))
            .run()
            .await;

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(builder.calls(), 1);
        assert_eq!(
            result.detail.build_errors,
            vec![
                "make exited with code 2".to_string(),
                "compiling...\nsrc/lib.rs:3: undefined symbol".to_string(),
            ]
        );
        assert!(review.challenger.prompts()[0].contains("undefined symbol"));
    }

    #[tokio::test]
    async fn test_analysis_failure_fails_run() {
        let review = Review {
            challenger: ScriptedExecutor::failing(Backend::Codex, "exited with code 2"),
            ..Review::new("", "")
        };
        let result = review.orchestrator(review.config(), EventBus::new()).run().await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(
            result.error.as_deref(),
            Some("challenger failed during analysis phase: exited with code 2")
        );
        assert!(result.messages.is_empty());
    }

    #[tokio::test]
    async fn test_defense_failure_keeps_issues() {
        let review = Review {
            defender: ScriptedExecutor::failing(Backend::Gemini, "boom"),
            ..Review::new(TWO_ISSUES, "unused")
        };
        let result = review.orchestrator(review.config(), EventBus::new()).run().await;

        assert_eq!(result.status, RunStatus::Failed);
        assert_eq!(result.detail.issues.len(), 2);
        assert_eq!(result.messages.len(), 1);
    }

    #[tokio::test]
    async fn test_auto_fix_disabled_skips_fix_phase() {
        let review = Review::new(TWO_ISSUES, &verdict(&[("issue-1", None)]));
        let result = review.orchestrator(review.config(), EventBus::new()).run().await;

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.detail.confirmed_issues, vec!["issue-1"]);
        assert!(result.detail.fix_tasks.is_empty());
        assert!(review.fixers.iter().all(|f| f.calls() == 0));
    }

    #[tokio::test]
    async fn test_bounded_fix_fan_out() {
        let bus = EventBus::new();
        let events = record_events(&bus);
        let review = Review::new(
            THREE_ISSUES,
            &verdict(&[("issue-1", None), ("issue-2", None), ("issue-3", None)]),
        );
        let config = review
            .config()
            .with_auto_fix(true)
            .with_max_parallel_fixes(1);
        let result = review.orchestrator(config, bus).run().await;

        assert_eq!(result.detail.fix_tasks.len(), 3);
        assert!(result
            .detail
            .fix_tasks
            .iter()
            .all(|t| t.status == FixStatus::Completed));

        let names = event_names(&events);
        assert_eq!(names.iter().filter(|n| **n == "fix:start").count(), 3);
        assert_eq!(names.iter().filter(|n| **n == "fix:end").count(), 3);
    }

    #[tokio::test]
    async fn test_unavailable_role_fails_review() {
        let review = Review {
            moderator: ScriptedExecutor::unavailable(Backend::Claude),
            ..Review::new(TWO_ISSUES, "unused")
        };
        let result = review.orchestrator(review.config(), EventBus::new()).run().await;

        assert_eq!(result.status, RunStatus::Failed);
        assert!(result.error.unwrap().contains("moderator (claude)"));
        assert_eq!(review.challenger.calls(), 0);
    }
}

mod executor {
    use orchestrator::{CliExecutor, CommandTemplate};
    use std::time::{Duration, Instant};

    use super::*;

    fn shell() -> CliExecutor {
        CliExecutor::new(Backend::Claude).with_template(CommandTemplate::custom("sh", ["-c"]))
    }

    #[tokio::test]
    async fn test_timeout_preserves_partial_output() {
        let timeout = Duration::from_millis(400);
        let executor = shell().with_timeout(timeout);
        let chunks = Mutex::new(Vec::new());
        let sink = |chunk: &str| chunks.lock().unwrap().push(chunk.to_string());

        let started = Instant::now();
        let result = executor
            .execute(ExecutionRequest::new("echo partial; sleep 5").with_chunk_sink(&sink))
            .await;
        let elapsed = started.elapsed();

        assert!(!result.success);
        assert!(result.timed_out());
        assert_eq!(result.output, "partial\n");
        assert!(elapsed >= timeout);
        assert!(elapsed < timeout + Duration::from_secs(2));
        assert_eq!(chunks.lock().unwrap().concat(), "partial\n");
    }

    #[tokio::test]
    async fn test_availability_probe_is_stable() {
        let present = shell();
        assert_eq!(present.is_available().await, present.is_available().await);
        assert!(present.is_available().await);

        let missing = CliExecutor::new(Backend::Codex).with_template(CommandTemplate::custom(
            "tribunal-definitely-not-installed",
            Vec::<String>::new(),
        ));
        assert!(!missing.is_available().await);
        assert!(!missing.is_available().await);
    }

    #[tokio::test]
    async fn test_context_precedes_prompt() {
        let result = shell()
            .execute(ExecutionRequest::new("echo done").with_context("# shell comment"))
            .await;
        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.output, "done\n");
    }
}
