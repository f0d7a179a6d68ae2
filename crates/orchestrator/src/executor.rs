//! Agent executors.
//!
//! An executor runs one external CLI once per call: it builds the argument
//! list from an immutable [`CommandTemplate`], spawns the program, streams
//! stdout to an optional chunk sink and enforces the timeout. Every failure
//! mode resolves to an unsuccessful [`ExecutionResult`]; `execute` never errors.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, warn};
use tribunal_core::{AgentConfig, Backend, ExecutionResult, DEFAULT_TIMEOUT};

const READ_BUFFER_SIZE: usize = 8192;
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

/// Receives each stdout increment as it arrives.
pub type ChunkSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// How the prompt is placed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptStyle {
    /// Prompt is the last argument before the suffix.
    Positional,
    /// Prompt is the value of the given flag.
    Flag(String),
}

/// Immutable description of how to invoke one backend program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    prefix_args: Vec<String>,
    auto_approve_args: Vec<String>,
    suffix_args: Vec<String>,
    prompt_style: PromptStyle,
}

impl CommandTemplate {
    pub fn for_backend(backend: Backend) -> Self {
        match backend {
            Backend::Claude => Self {
                program: "claude".to_string(),
                prefix_args: vec!["--print".to_string()],
                auto_approve_args: vec!["--dangerously-skip-permissions".to_string()],
                suffix_args: Vec::new(),
                prompt_style: PromptStyle::Positional,
            },
            Backend::Codex => Self {
                program: "codex".to_string(),
                prefix_args: vec!["exec".to_string()],
                auto_approve_args: vec!["--full-auto".to_string()],
                suffix_args: Vec::new(),
                prompt_style: PromptStyle::Positional,
            },
            Backend::Gemini => Self {
                program: "gemini".to_string(),
                prefix_args: Vec::new(),
                auto_approve_args: vec!["--yolo".to_string()],
                suffix_args: Vec::new(),
                prompt_style: PromptStyle::Flag("--prompt".to_string()),
            },
        }
    }

    /// Arbitrary program taking the prompt positionally after `prefix_args`.
    pub fn custom(
        program: impl Into<String>,
        prefix_args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            prefix_args: prefix_args.into_iter().map(Into::into).collect(),
            auto_approve_args: Vec::new(),
            suffix_args: Vec::new(),
            prompt_style: PromptStyle::Positional,
        }
    }

    pub fn with_suffix_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suffix_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_prompt_style(mut self, style: PromptStyle) -> Self {
        self.prompt_style = style;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Full argv after the program name.
    pub fn build_args(&self, extra_args: &[String], auto_approve: bool, prompt: &str) -> Vec<String> {
        let mut args = self.prefix_args.clone();
        if auto_approve {
            args.extend(self.auto_approve_args.iter().cloned());
        }
        args.extend(extra_args.iter().cloned());

        let prompt = escape_prompt(prompt);
        match &self.prompt_style {
            PromptStyle::Positional => args.push(prompt),
            PromptStyle::Flag(flag) => {
                args.push(flag.clone());
                args.push(prompt);
            }
        }

        args.extend(self.suffix_args.iter().cloned());
        args
    }
}

/// The prompt travels as one argv element with no shell in between; only NUL
/// bytes, which argv cannot carry, need removing.
fn escape_prompt(prompt: &str) -> String {
    prompt.replace('\0', "")
}

/// One invocation request.
#[derive(Clone, Copy, Default)]
pub struct ExecutionRequest<'a> {
    pub prompt: &'a str,
    pub context: Option<&'a str>,
    pub timeout: Option<Duration>,
    pub on_chunk: Option<ChunkSink<'a>>,
}

impl<'a> ExecutionRequest<'a> {
    pub fn new(prompt: &'a str) -> Self {
        Self {
            prompt,
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: &'a str) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_chunk_sink(mut self, sink: ChunkSink<'a>) -> Self {
        self.on_chunk = Some(sink);
        self
    }

    /// Context, when present, precedes the prompt separated by a blank line.
    pub fn full_prompt(&self) -> String {
        match self.context {
            Some(context) if !context.trim().is_empty() => {
                format!("{}\n\n{}", context.trim_end(), self.prompt)
            }
            _ => self.prompt.to_string(),
        }
    }
}

impl std::fmt::Debug for ExecutionRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionRequest")
            .field("prompt_length", &self.prompt.len())
            .field("has_context", &self.context.is_some())
            .field("timeout", &self.timeout)
            .field("streaming", &self.on_chunk.is_some())
            .finish()
    }
}

/// Capability the orchestrators drive. [`CliExecutor`] is the production
/// implementation.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    fn backend(&self) -> Backend;

    /// True iff the backing program can be launched. Never fails.
    async fn is_available(&self) -> bool;

    async fn execute(&self, request: ExecutionRequest<'_>) -> ExecutionResult;
}

/// Executor that spawns the backend CLI as a child process.
#[derive(Debug, Clone)]
pub struct CliExecutor {
    backend: Backend,
    template: CommandTemplate,
    timeout: Duration,
    extra_args: Vec<String>,
    working_dir: Option<PathBuf>,
    auto_approve: bool,
}

impl CliExecutor {
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            template: CommandTemplate::for_backend(backend),
            timeout: DEFAULT_TIMEOUT,
            extra_args: Vec::new(),
            working_dir: None,
            auto_approve: false,
        }
    }

    pub fn from_agent(config: &AgentConfig) -> Self {
        Self::new(config.backend)
            .with_timeout(config.timeout)
            .with_extra_args(config.extra_args.clone())
    }

    pub fn with_template(mut self, template: CommandTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_extra_args(mut self, extra_args: Vec<String>) -> Self {
        self.extra_args = extra_args;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Pass the backend's auto-approval flags (fixers edit files unattended).
    pub fn with_auto_approve(mut self, auto_approve: bool) -> Self {
        self.auto_approve = auto_approve;
        self
    }

    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    pub fn build_args(&self, prompt: &str) -> Vec<String> {
        self.template
            .build_args(&self.extra_args, self.auto_approve, prompt)
    }

    fn spawn_command(&self, args: &[String]) -> Command {
        let mut command = Command::new(self.template.program());
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

#[async_trait]
impl AgentExecutor for CliExecutor {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn is_available(&self) -> bool {
        which::which(self.template.program()).is_ok()
    }

    async fn execute(&self, request: ExecutionRequest<'_>) -> ExecutionResult {
        let started = Instant::now();
        let timeout = request.timeout.unwrap_or(self.timeout);
        let args = self.build_args(&request.full_prompt());
        let program = self.template.program();

        debug!(
            backend = %self.backend,
            program = %program,
            arg_count = args.len(),
            timeout_ms = timeout.as_millis() as u64,
            "Spawning executor"
        );

        let mut child = match self.spawn_command(&args).spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(backend = %self.backend, program = %program, error = %e, "Failed to launch executor");
                return ExecutionResult::failure(
                    String::new(),
                    format!("failed to launch {}: {}", program, e),
                    elapsed_ms(started),
                );
            }
        };

        let deadline = deadline_after(timeout);
        let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(read_all(stderr)));
        let mut stdout = child.stdout.take();

        let mut output = String::new();
        let mut pending = Vec::new();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];
        let mut stdout_open = stdout.is_some();

        let sleep = tokio::time::sleep_until(deadline);
        tokio::pin!(sleep);

        // Exactly one branch breaks the loop: the deadline or the process exit
        // observed after stdout reached EOF.
        let exit = loop {
            tokio::select! {
                _ = &mut sleep => break None,
                read = async {
                    match stdout.as_mut() {
                        Some(out) => out.read(&mut buf).await,
                        None => Ok(0),
                    }
                }, if stdout_open => match read {
                    Ok(0) | Err(_) => stdout_open = false,
                    Ok(n) => {
                        pending.extend_from_slice(&buf[..n]);
                        let chunk = take_utf8(&mut pending);
                        if !chunk.is_empty() {
                            if let Some(sink) = request.on_chunk {
                                sink(&chunk);
                            }
                            output.push_str(&chunk);
                        }
                    }
                },
                status = child.wait(), if !stdout_open => break Some(status),
            }
        };

        if !pending.is_empty() {
            let tail = String::from_utf8_lossy(&pending).into_owned();
            if let Some(sink) = request.on_chunk {
                sink(&tail);
            }
            output.push_str(&tail);
        }

        let status = match exit {
            None => {
                let _ = child.start_kill();
                if let Some(task) = stderr_task {
                    task.abort();
                }
                let duration_ms = elapsed_ms(started);
                warn!(backend = %self.backend, duration_ms, "Executor timed out");
                return ExecutionResult::timeout(output, duration_ms);
            }
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                return ExecutionResult::failure(
                    output,
                    format!("failed to wait for {}: {}", program, e),
                    elapsed_ms(started),
                );
            }
        };

        let stderr = match stderr_task {
            Some(task) => match tokio::time::timeout_at(deadline, task).await {
                Ok(Ok(text)) => text,
                _ => String::new(),
            },
            None => String::new(),
        };
        let duration_ms = elapsed_ms(started);

        if status.success() {
            debug!(backend = %self.backend, duration_ms, output_length = output.len(), "Executor finished");
            ExecutionResult::success(output, duration_ms)
        } else {
            let error = if stderr.trim().is_empty() {
                match status.code() {
                    Some(code) => format!("{} exited with code {}", program, code),
                    None => format!("{} was terminated by a signal", program),
                }
            } else {
                stderr.trim().to_string()
            };
            debug!(backend = %self.backend, duration_ms, error = %error, "Executor failed");
            ExecutionResult::failure(output, error, duration_ms)
        }
    }
}

/// Timeouts too large to represent as an instant never fire.
fn deadline_after(timeout: Duration) -> tokio::time::Instant {
    let now = tokio::time::Instant::now();
    now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE)
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut bytes = Vec::new();
    let _ = reader.read_to_end(&mut bytes).await;
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Decodes the longest valid UTF-8 prefix, leaving an incomplete trailing
/// sequence in `pending` for the next read.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            text
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let text = String::from_utf8_lossy(&pending[..valid]).into_owned();
            pending.drain(..valid);
            text
        }
        Err(_) => {
            let text = String::from_utf8_lossy(pending).into_owned();
            pending.clear();
            text
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
