//! `tribunal.toml` loading.
//!
//! Every key is optional. Values from the file sit between the built-in
//! defaults and command-line flags.

use anyhow::{Context, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tribunal_core::{AgentConfig, Backend, ExecutorRole, IssueType};

pub const CONFIG_FILE: &str = "tribunal.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub agents: AgentsSection,
    pub debate: DebateSection,
    pub review: ReviewSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentsSection {
    pub moderator: Option<AgentSection>,
    pub challenger: Option<AgentSection>,
    pub defender: Option<AgentSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentSection {
    #[serde(deserialize_with = "known_backend")]
    pub backend: Option<Backend>,
    pub timeout_secs: Option<u64>,
    pub extra_args: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DebateSection {
    pub rounds: Option<u32>,
    pub streaming: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReviewSection {
    pub build_command: Option<String>,
    pub build_timeout_secs: Option<u64>,
    pub focus: Vec<IssueType>,
    pub auto_fix: Option<bool>,
    #[serde(deserialize_with = "known_backends")]
    pub fixers: Vec<Backend>,
    pub fix_timeout_secs: Option<u64>,
    pub max_parallel_fixes: Option<usize>,
    pub streaming: Option<bool>,
}

/// Strict backend lookup shared by the config file and the command line.
pub fn parse_backend(name: &str) -> std::result::Result<Backend, String> {
    Backend::lookup(name)
        .ok_or_else(|| format!("unknown backend '{}' (expected claude, codex or gemini)", name))
}

fn known_backend<'de, D>(deserializer: D) -> std::result::Result<Option<Backend>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)?
        .map(|name| parse_backend(&name).map_err(D::Error::custom))
        .transpose()
}

fn known_backends<'de, D>(deserializer: D) -> std::result::Result<Vec<Backend>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|name| parse_backend(name).map_err(D::Error::custom))
        .collect()
}

impl AgentsSection {
    fn get(&self, role: ExecutorRole) -> Option<&AgentSection> {
        match role {
            ExecutorRole::Moderator => self.moderator.as_ref(),
            ExecutorRole::Challenger => self.challenger.as_ref(),
            ExecutorRole::Defender => self.defender.as_ref(),
        }
    }
}

impl FileConfig {
    /// Loads `explicit` if given (it must exist), otherwise the first of
    /// `./tribunal.toml` and `<config dir>/tribunal/tribunal.toml` that
    /// exists, otherwise defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }

        match Self::candidates().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::read(&path),
            None => {
                tracing::debug!("No {} found, using defaults", CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    fn candidates() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("tribunal").join(CONFIG_FILE));
        }
        paths
    }

    fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Role bindings: built-in defaults overlaid with the `[agents.*]` tables.
    pub fn agents(&self) -> Vec<AgentConfig> {
        orchestrator::config::default_agents()
            .into_iter()
            .map(|default| match self.agents.get(default.role) {
                None => default,
                Some(section) => {
                    let mut agent = AgentConfig {
                        backend: section.backend.unwrap_or(default.backend),
                        ..default
                    };
                    if let Some(secs) = section.timeout_secs {
                        agent.timeout = Duration::from_secs(secs);
                    }
                    if !section.extra_args.is_empty() {
                        agent.extra_args = section.extra_args.clone();
                    }
                    agent
                }
            })
            .collect()
    }
}
