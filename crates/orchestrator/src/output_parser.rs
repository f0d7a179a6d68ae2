//! Structured output parser.
//!
//! Agents are asked to answer with a fenced JSON block, but free-form text
//! around (or instead of) it is normal. Parsing is best effort: a payload
//! that cannot be decoded yields an empty or fallback value together with a
//! recoverable error message, and never an `Err`.

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};
use tribunal_core::{Backend, Issue, IssueType, Severity};

static JSON_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ims)```[ \t]*json[ \t]*\r?\n(.*?)^[ \t]*```")
        .expect("Invalid JSON fence regex pattern")
});

static BARE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)```[ \t]*\r?\n(\{.*?)^[ \t]*```").expect("Invalid bare fence regex pattern")
});

/// Decoded value plus the recoverable error that forced a fallback, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome<T> {
    pub value: T,
    pub error: Option<String>,
}

impl<T> ParseOutcome<T> {
    fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    fn fallback(value: T, error: String) -> Self {
        warn!(error = %error, "Structured output rejected, using fallback");
        Self {
            value,
            error: Some(error),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIssuePayload {
    issues: Vec<RawIssue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIssue {
    #[serde(rename = "type", alias = "issueType", alias = "issue_type")]
    issue_type: String,
    severity: String,
    description: String,
    #[serde(default, alias = "file_path", alias = "file")]
    file_path: Option<String>,
    #[serde(
        default,
        alias = "line_number",
        alias = "line",
        deserialize_with = "lenient_line_number"
    )]
    line_number: Option<u32>,
    #[serde(default, alias = "suggested_fix")]
    suggested_fix: Option<String>,
}

/// Accepts `42` or `"42"`; anything else becomes `None` instead of
/// rejecting the whole payload.
fn lenient_line_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Moderator verdict over the discovered issues.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    #[serde(alias = "confirmed_issues")]
    pub confirmed_issues: Vec<VerdictEntry>,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictEntry {
    #[serde(alias = "issue_id", alias = "id")]
    pub issue_id: String,
    #[serde(default = "default_confirmed")]
    pub confirmed: bool,
    #[serde(default, alias = "assign_to", alias = "assignedTo")]
    pub assign_to: Option<String>,
}

fn default_confirmed() -> bool {
    true
}

impl Verdict {
    /// Marks assignments on confirmed issues and returns their ids in issue
    /// order. Issues without a confirming entry are left untouched.
    pub fn apply(&self, issues: &mut [Issue]) -> Vec<String> {
        let known: HashSet<&str> = issues.iter().map(|i| i.id.as_str()).collect();
        for entry in &self.confirmed_issues {
            if !known.contains(entry.issue_id.as_str()) {
                debug!(issue_id = %entry.issue_id, "Verdict references unknown issue");
            }
        }

        let mut confirmed = Vec::new();
        for issue in issues.iter_mut() {
            let entry = self
                .confirmed_issues
                .iter()
                .find(|e| e.confirmed && e.issue_id == issue.id);
            if let Some(entry) = entry {
                if let Some(backend) = entry.assign_to.as_deref() {
                    issue.assigned_to = Some(resolve_backend(backend));
                }
                confirmed.push(issue.id.clone());
            }
        }
        confirmed
    }
}

fn resolve_backend(name: &str) -> Backend {
    Backend::lookup(name).unwrap_or_else(|| {
        warn!(requested = %name, fallback = %Backend::DEFAULT, "Unknown backend in verdict");
        Backend::DEFAULT
    })
}

pub struct StructuredOutputParser;

impl StructuredOutputParser {
    /// Candidate payloads in the order they are tried: `json` fences, bare
    /// fences opening with `{`, the outermost brace span, the whole text.
    pub fn candidates(raw: &str) -> Vec<&str> {
        let mut candidates: Vec<&str> = Vec::new();

        for caps in JSON_FENCE.captures_iter(raw) {
            if let Some(m) = caps.get(1) {
                candidates.push(m.as_str().trim());
            }
        }
        for caps in BARE_FENCE.captures_iter(raw) {
            if let Some(m) = caps.get(1) {
                candidates.push(m.as_str().trim());
            }
        }
        if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) {
            if start < end {
                candidates.push(&raw[start..=end]);
            }
        }
        candidates.push(raw.trim());

        let mut seen = HashSet::new();
        candidates.retain(|c| !c.is_empty() && seen.insert(*c));
        candidates
    }

    /// Decodes the first candidate matching `T`. The error names the first
    /// decode failure, which is the most specific one.
    pub fn parse<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
        let candidates = Self::candidates(raw);
        if candidates.is_empty() {
            return Err("empty output".to_string());
        }

        let mut first_error = None;
        for candidate in candidates {
            match serde_json::from_str::<T>(candidate) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        Err(first_error.unwrap_or_else(|| "no JSON payload found".to_string()))
    }

    /// Parses an issue-discovery payload. Ids are assigned in payload order.
    pub fn parse_issues(raw: &str) -> ParseOutcome<Vec<Issue>> {
        let payload: RawIssuePayload = match Self::parse(raw) {
            Ok(payload) => payload,
            Err(e) => {
                return ParseOutcome::fallback(
                    Vec::new(),
                    format!("could not parse issues payload: {}", e),
                )
            }
        };

        let mut issues = Vec::with_capacity(payload.issues.len());
        for (index, raw_issue) in payload.issues.into_iter().enumerate() {
            match Self::convert_issue(index, raw_issue) {
                Ok(issue) => issues.push(issue),
                Err(e) => {
                    return ParseOutcome::fallback(
                        Vec::new(),
                        format!("issue {} does not match the expected shape: {}", index + 1, e),
                    )
                }
            }
        }

        debug!(issue_count = issues.len(), "Parsed issues payload");
        ParseOutcome::ok(issues)
    }

    fn convert_issue(index: usize, raw: RawIssue) -> Result<Issue, String> {
        let issue_type = raw.issue_type.parse::<IssueType>().map_err(|e| e.to_string())?;
        let severity = raw.severity.parse::<Severity>().map_err(|e| e.to_string())?;

        let mut issue = Issue::new(
            format!("issue-{}", index + 1),
            issue_type,
            severity,
            raw.description,
        );
        issue.file_path = raw.file_path.filter(|p| !p.trim().is_empty());
        issue.line_number = raw.line_number;
        issue.suggested_fix = raw.suggested_fix.filter(|f| !f.trim().is_empty());
        Ok(issue)
    }

    /// Parses a verdict payload; `None` tells the caller to keep every issue.
    pub fn parse_verdict(raw: &str) -> ParseOutcome<Option<Verdict>> {
        match Self::parse::<Verdict>(raw) {
            Ok(verdict) => {
                debug!(
                    entries = verdict.confirmed_issues.len(),
                    "Parsed verdict payload"
                );
                ParseOutcome::ok(Some(verdict))
            }
            Err(e) => ParseOutcome::fallback(None, format!("could not parse verdict payload: {}", e)),
        }
    }
}
