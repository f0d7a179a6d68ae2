//! Run configuration supplied by the caller.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tribunal_core::{serde_secs, AgentConfig, Backend, ExecutorRole, IssueType};

use crate::error::{OrchestratorError, Result};

pub const DEFAULT_ROUNDS: u32 = 3;
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(600);

/// Moderator on claude, challenger on codex, defender on gemini.
pub fn default_agents() -> Vec<AgentConfig> {
    vec![
        AgentConfig::new(ExecutorRole::Moderator, Backend::Claude),
        AgentConfig::new(ExecutorRole::Challenger, Backend::Codex),
        AgentConfig::new(ExecutorRole::Defender, Backend::Gemini),
    ]
}

fn default_rounds() -> u32 {
    DEFAULT_ROUNDS
}

fn default_true() -> bool {
    true
}

fn default_build_timeout() -> Duration {
    DEFAULT_BUILD_TIMEOUT
}

fn default_fix_timeout() -> Duration {
    tribunal_core::DEFAULT_TIMEOUT
}

/// The agent bound to each of the three roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAgents {
    pub moderator: AgentConfig,
    pub challenger: AgentConfig,
    pub defender: AgentConfig,
}

impl RoleAgents {
    /// Requires exactly one valid binding per role.
    pub fn resolve(agents: &[AgentConfig]) -> Result<Self> {
        let pick = |role: ExecutorRole| -> Result<AgentConfig> {
            let mut bound = agents.iter().filter(|a| a.role == role);
            let agent = bound
                .next()
                .ok_or_else(|| OrchestratorError::Config(format!("no agent bound to the {} role", role)))?;
            if bound.next().is_some() {
                return Err(OrchestratorError::Config(format!(
                    "more than one agent bound to the {} role",
                    role
                )));
            }
            agent.validate()?;
            Ok(agent.clone())
        };

        Ok(Self {
            moderator: pick(ExecutorRole::Moderator)?,
            challenger: pick(ExecutorRole::Challenger)?,
            defender: pick(ExecutorRole::Defender)?,
        })
    }

    pub fn get(&self, role: ExecutorRole) -> &AgentConfig {
        match role {
            ExecutorRole::Moderator => &self.moderator,
            ExecutorRole::Challenger => &self.challenger,
            ExecutorRole::Defender => &self.defender,
        }
    }
}

/// Replaces the binding for `agent.role`, keeping the others.
fn bind(agents: &mut Vec<AgentConfig>, agent: AgentConfig) {
    agents.retain(|a| a.role != agent.role);
    agents.push(agent);
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    pub topic: String,
    #[serde(default = "default_rounds")]
    pub rounds: u32,
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentConfig>,
    /// Forward executor output as `message:chunk` events.
    #[serde(default = "default_true")]
    pub streaming: bool,
}

impl DebateConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            rounds: DEFAULT_ROUNDS,
            agents: default_agents(),
            streaming: true,
        }
    }

    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_agent(mut self, agent: AgentConfig) -> Self {
        bind(&mut self.agents, agent);
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn validate(&self) -> Result<RoleAgents> {
        if self.topic.trim().is_empty() {
            return Err(OrchestratorError::Config("debate topic is empty".to_string()));
        }
        RoleAgents::resolve(&self.agents)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeReviewConfig {
    pub path: PathBuf,
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentConfig>,
    /// Shell command run in `path` before analysis; failures are advisory.
    #[serde(default)]
    pub build_command: Option<String>,
    #[serde(
        rename = "build_timeout_secs",
        with = "serde_secs",
        default = "default_build_timeout"
    )]
    pub build_timeout: Duration,
    /// Restrict analysis to these issue types; empty means all.
    #[serde(default)]
    pub focus: Vec<IssueType>,
    #[serde(default)]
    pub auto_fix: bool,
    /// Fixer backends; empty means every known backend.
    #[serde(default)]
    pub fixers: Vec<Backend>,
    #[serde(
        rename = "fix_timeout_secs",
        with = "serde_secs",
        default = "default_fix_timeout"
    )]
    pub fix_timeout: Duration,
    /// Upper bound on concurrent fix tasks; `None` runs all at once.
    #[serde(default)]
    pub max_parallel_fixes: Option<usize>,
    #[serde(default = "default_true")]
    pub streaming: bool,
}

impl CodeReviewConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            agents: default_agents(),
            build_command: None,
            build_timeout: DEFAULT_BUILD_TIMEOUT,
            focus: Vec::new(),
            auto_fix: false,
            fixers: Vec::new(),
            fix_timeout: tribunal_core::DEFAULT_TIMEOUT,
            max_parallel_fixes: None,
            streaming: true,
        }
    }

    pub fn with_agent(mut self, agent: AgentConfig) -> Self {
        bind(&mut self.agents, agent);
        self
    }

    pub fn with_build_command(mut self, command: impl Into<String>) -> Self {
        self.build_command = Some(command.into());
        self
    }

    pub fn with_focus(mut self, focus: Vec<IssueType>) -> Self {
        self.focus = focus;
        self
    }

    pub fn with_auto_fix(mut self, auto_fix: bool) -> Self {
        self.auto_fix = auto_fix;
        self
    }

    pub fn with_fixers(mut self, fixers: Vec<Backend>) -> Self {
        self.fixers = fixers;
        self
    }

    pub fn with_max_parallel_fixes(mut self, limit: usize) -> Self {
        self.max_parallel_fixes = Some(limit);
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    /// Configured fixers, or every known backend when none were given.
    pub fn fixer_backends(&self) -> Vec<Backend> {
        let mut backends = if self.fixers.is_empty() {
            Backend::ALL.to_vec()
        } else {
            self.fixers.clone()
        };
        backends.sort();
        backends.dedup();
        backends
    }

    pub fn validate(&self) -> Result<RoleAgents> {
        if self.path.as_os_str().is_empty() {
            return Err(OrchestratorError::Config("code review path is empty".to_string()));
        }
        if self.max_parallel_fixes == Some(0) {
            return Err(OrchestratorError::Config(
                "max_parallel_fixes must be at least 1".to_string(),
            ));
        }
        if self.fix_timeout.is_zero() || self.build_timeout.is_zero() {
            return Err(OrchestratorError::Config(
                "fix and build timeouts must be greater than zero".to_string(),
            ));
        }
        RoleAgents::resolve(&self.agents)
    }
}
