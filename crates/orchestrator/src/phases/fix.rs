//! Parallel fix phase.
//!
//! Every confirmed issue becomes a [`FixTask`] routed to one fixer backend.
//! All tasks run concurrently and the phase waits for every one of them; a
//! failing task only marks itself failed. Tasks work on private copies of
//! their issues, so the caller applies results after the join.

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tribunal_core::{Backend, FixStatus, FixTask, Issue};

use events::Event;

use crate::engine::RunEmitter;
use crate::executor::{AgentExecutor, CliExecutor, ExecutionRequest};
use crate::prompts::ReviewPrompts;

/// Fixer executors keyed by backend.
#[derive(Clone, Default)]
pub struct FixPool {
    executors: HashMap<Backend, Arc<dyn AgentExecutor>>,
    order: Vec<Backend>,
}

impl FixPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// One auto-approving [`CliExecutor`] per backend, rooted in `working_dir`.
    pub fn from_backends(backends: &[Backend], working_dir: &Path, timeout: Duration) -> Self {
        backends.iter().fold(Self::new(), |pool, backend| {
            let executor = CliExecutor::new(*backend)
                .with_working_dir(working_dir)
                .with_timeout(timeout)
                .with_auto_approve(true);
            pool.with_executor(Arc::new(executor))
        })
    }

    /// Adds `executor` under its own backend, replacing any previous one.
    pub fn with_executor(mut self, executor: Arc<dyn AgentExecutor>) -> Self {
        let backend = executor.backend();
        if self.executors.insert(backend, executor).is_none() {
            self.order.push(backend);
        }
        self
    }

    pub fn backends(&self) -> &[Backend] {
        &self.order
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The issue's assigned backend, or the default backend when unassigned.
    /// Falls back to the first pooled fixer when that backend has none.
    pub fn route(&self, issue: &Issue) -> Backend {
        let wanted = issue.assigned_to.unwrap_or(Backend::DEFAULT);
        if self.executors.contains_key(&wanted) {
            return wanted;
        }
        match self.order.first() {
            Some(fallback) => {
                debug!(issue_id = %issue.id, wanted = %wanted, fallback = %fallback, "No fixer for assigned backend");
                *fallback
            }
            None => wanted,
        }
    }

    pub fn get(&self, backend: Backend) -> Option<&dyn AgentExecutor> {
        self.executors.get(&backend).map(|e| e.as_ref())
    }
}

/// Runs one fix task per issue and returns them in issue order.
///
/// `max_parallel` bounds how many fixers run at once; `None` starts all of
/// them immediately.
pub async fn run_fix_tasks(
    emitter: &RunEmitter,
    pool: &FixPool,
    path: &str,
    issues: &[Issue],
    max_parallel: Option<usize>,
) -> Vec<FixTask> {
    let tasks: Vec<FixTask> = issues
        .iter()
        .map(|issue| FixTask::new(issue.clone(), pool.route(issue)))
        .collect();

    info!(
        tasks = tasks.len(),
        max_parallel = ?max_parallel,
        "Starting parallel fix phase"
    );

    let runs = tasks
        .into_iter()
        .enumerate()
        .map(|(index, task)| async move { (index, run_fix(emitter, pool, path, task).await) });

    let mut finished: Vec<(usize, FixTask)> = match max_parallel {
        Some(limit) => stream::iter(runs).buffer_unordered(limit.max(1)).collect().await,
        None => join_all(runs).await,
    };
    finished.sort_by_key(|(index, _)| *index);
    finished.into_iter().map(|(_, task)| task).collect()
}

async fn run_fix(emitter: &RunEmitter, pool: &FixPool, path: &str, mut task: FixTask) -> FixTask {
    task.start();
    emitter.emit(Event::FixStart {
        run_id: emitter.run_id(),
        task_id: task.id,
        issue_id: task.issue.id.clone(),
        backend: task.backend,
    });

    match pool.get(task.backend) {
        None => task.fail(format!("no fixer configured for {}", task.backend), 0),
        Some(executor) => {
            if executor.is_available().await {
                let prompt = ReviewPrompts::fix(path, &task.issue);
                let result = executor.execute(ExecutionRequest::new(&prompt)).await;
                if result.success {
                    task.complete(result.output, result.duration_ms);
                } else {
                    task.fail(result.error_message(), result.duration_ms);
                }
            } else {
                task.fail(format!("fixer {} is not available", task.backend), 0);
            }
        }
    }

    if task.status == FixStatus::Failed {
        warn!(
            issue_id = %task.issue.id,
            backend = %task.backend,
            reason = task.result.as_deref().unwrap_or_default(),
            "Fix task failed"
        );
    } else {
        debug!(issue_id = %task.issue.id, backend = %task.backend, "Fix task completed");
    }

    emitter.emit(Event::FixEnd {
        run_id: emitter.run_id(),
        task_id: task.id,
        issue_id: task.issue.id.clone(),
        backend: task.backend,
        status: task.status,
        duration_ms: task.duration_ms.unwrap_or_default(),
    });
    task
}
