use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::error::CoreError;

/// Timeout applied to an agent invocation when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorRole {
    Moderator,
    Challenger,
    Defender,
}

impl ExecutorRole {
    pub const ALL: [ExecutorRole; 3] = [Self::Moderator, Self::Challenger, Self::Defender];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Moderator => "moderator",
            Self::Challenger => "challenger",
            Self::Defender => "defender",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "moderator" => Some(Self::Moderator),
            "challenger" => Some(Self::Challenger),
            "defender" => Some(Self::Defender),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExecutorRole {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownRole(s.to_string()))
    }
}

/// External program an executor wraps.
///
/// Parsing never fails: unrecognized names map to [`Backend::DEFAULT`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Backend {
    Claude,
    Codex,
    Gemini,
}

impl Backend {
    pub const DEFAULT: Backend = Backend::Claude;
    pub const ALL: [Backend; 3] = [Self::Claude, Self::Codex, Self::Gemini];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
        }
    }

    /// Strict lookup, `None` for unknown names.
    pub fn lookup(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "claude" => Some(Self::Claude),
            "codex" => Some(Self::Codex),
            "gemini" => Some(Self::Gemini),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Self {
        Self::lookup(s).unwrap_or(Self::DEFAULT)
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<String> for Backend {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding of one role to one backend for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentConfig {
    pub backend: Backend,
    pub role: ExecutorRole,
    #[serde(rename = "timeout_secs", with = "serde_secs", default = "default_timeout")]
    pub timeout: Duration,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

impl AgentConfig {
    pub fn new(role: ExecutorRole, backend: Backend) -> Self {
        Self {
            backend,
            role,
            timeout: DEFAULT_TIMEOUT,
            extra_args: Vec::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_extra_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.timeout.is_zero() {
            return Err(CoreError::Validation(format!(
                "{} timeout must be greater than zero",
                self.role
            )));
        }
        Ok(())
    }
}

/// (De)serializes a `Duration` as whole seconds.
pub mod serde_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
