use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::agent::Backend;
use crate::error::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Bug,
    Security,
    Performance,
    Design,
}

impl IssueType {
    pub const ALL: [IssueType; 4] = [Self::Bug, Self::Security, Self::Performance, Self::Design];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::Design => "design",
        }
    }
}

impl FromStr for IssueType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bug" => Ok(Self::Bug),
            "security" => Ok(Self::Security),
            "performance" => Ok(Self::Performance),
            "design" => Ok(Self::Design),
            _ => Err(CoreError::UnknownIssueType(s.to_string())),
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(CoreError::UnknownSeverity(s.to_string())),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A defect candidate reported by the challenger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub id: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Backend>,
    #[serde(default)]
    pub fixed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_result: Option<String>,
}

impl Issue {
    pub fn new(
        id: impl Into<String>,
        issue_type: IssueType,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            issue_type,
            severity,
            description: description.into(),
            file_path: None,
            line_number: None,
            suggested_fix: None,
            assigned_to: None,
            fixed: false,
            fix_result: None,
        }
    }

    pub fn with_location(mut self, file_path: impl Into<String>, line_number: Option<u32>) -> Self {
        self.file_path = Some(file_path.into());
        self.line_number = line_number;
        self
    }

    /// `path:line`, `path`, or `None` when the challenger gave no location.
    pub fn location(&self) -> Option<String> {
        match (&self.file_path, self.line_number) {
            (Some(path), Some(line)) => Some(format!("{}:{}", path, line)),
            (Some(path), None) => Some(path.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FixStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl FixStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Remediation of one confirmed issue by one backend.
///
/// The task owns a private copy of its issue; the source collection is only
/// updated by the orchestrator after the fan-out joins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FixTask {
    pub id: Uuid,
    pub issue: Issue,
    pub backend: Backend,
    pub status: FixStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl FixTask {
    pub fn new(issue: Issue, backend: Backend) -> Self {
        Self {
            id: Uuid::new_v4(),
            issue,
            backend,
            status: FixStatus::default(),
            result: None,
            duration_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.status = FixStatus::InProgress;
    }

    pub fn complete(&mut self, result: String, duration_ms: u64) {
        self.status = FixStatus::Completed;
        self.result = Some(result);
        self.duration_ms = Some(duration_ms);
    }

    pub fn fail(&mut self, reason: String, duration_ms: u64) {
        self.status = FixStatus::Failed;
        self.result = Some(reason);
        self.duration_ms = Some(duration_ms);
    }
}
