use tribunal_core::{Issue, IssueType, Message};

/// Renders a transcript as the context block handed to every debate step.
pub fn format_transcript(messages: &[Message]) -> String {
    if messages.is_empty() {
        return String::new();
    }

    let mut out = String::from("## Transcript so far\n");
    for message in messages {
        let label = match message.round {
            Some(round) => format!("{} ({}, round {})", message.role, message.backend, round),
            None => format!("{} ({}, {})", message.role, message.backend, message.phase),
        };
        out.push_str(&format!("\n### {}\n{}\n", label, message.content.trim()));
    }
    out
}

fn format_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| {
            let location = issue
                .location()
                .map(|l| format!(" at `{}`", l))
                .unwrap_or_default();
            let fix = issue
                .suggested_fix
                .as_deref()
                .map(|f| format!("\n  Suggested fix: {}", f))
                .unwrap_or_default();
            format!(
                "- [{id}] {severity} {kind}{location}: {description}{fix}",
                id = issue.id,
                severity = issue.severity,
                kind = issue.issue_type,
                location = location,
                description = issue.description,
                fix = fix
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct DebatePrompts;

impl DebatePrompts {
    pub fn opening(topic: &str, rounds: u32) -> String {
        format!(
            r#"You are the moderator of a structured debate.

## Topic
{topic}

## Format
The debate runs for {rounds} round(s). In each round a challenger attacks the position,
a defender answers, and you evaluate the exchange.

## Instructions
1. Restate the topic precisely
2. Define the key terms and the criteria a good answer must meet
3. Lay out the strongest initial position for the defender to hold

Keep the opening under 400 words."#,
            topic = topic,
            rounds = rounds
        )
    }

    pub fn challenge(topic: &str, round: u32) -> String {
        format!(
            r#"You are the challenger in round {round} of a debate on: {topic}

Read the transcript above. Attack the weakest point of the current position with concrete
arguments, counterexamples or evidence. Do not repeat objections that were already answered.

Keep your challenge under 300 words."#,
            topic = topic,
            round = round
        )
    }

    pub fn defend(topic: &str, round: u32) -> String {
        format!(
            r#"You are the defender in round {round} of a debate on: {topic}

Read the transcript above and answer the latest challenge directly. Concede points that are
correct and refine the position where needed; rebut the rest with specifics.

Keep your defense under 300 words."#,
            topic = topic,
            round = round
        )
    }

    pub fn evaluate(topic: &str, round: u32) -> String {
        format!(
            r#"You are the moderator. Evaluate round {round} of the debate on: {topic}

Using the transcript above:
1. Summarize the challenge and the defense in one sentence each
2. State which points were won, lost or left open
3. Name what the next round should focus on

Keep the evaluation under 250 words."#,
            topic = topic,
            round = round
        )
    }

    pub fn final_verdict(topic: &str) -> String {
        format!(
            r#"You are the moderator. The debate on "{topic}" is over.

Using the complete transcript above, deliver the final verdict:
1. The conclusion the debate supports
2. The strongest surviving arguments on each side
3. Remaining open questions

Start with a one-line verdict, then explain."#,
            topic = topic
        )
    }
}

pub struct ReviewPrompts;

impl ReviewPrompts {
    pub fn analysis(path: &str, focus: &[IssueType], build_errors: &[String]) -> String {
        let focus_section = if focus.is_empty() {
            "all issue types: bug, security, performance, design".to_string()
        } else {
            focus
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        let build_section = if build_errors.is_empty() {
            String::new()
        } else {
            format!(
                "\n## Build Output\nThe build check failed. Treat this as context, not as the full list of issues:\n```\n{}\n```\n",
                build_errors.join("\n")
            )
        };

        format!(
            r#"You are a critical code reviewer. Analyze the code in `{path}`.

## Focus
Report only: {focus}
{build}
## Output
Respond with a fenced JSON block of exactly this shape:

```json
{{
  "issues": [
    {{
      "type": "bug | security | performance | design",
      "severity": "critical | high | medium | low",
      "description": "what is wrong and why it matters",
      "filePath": "relative/path.rs",
      "lineNumber": 42,
      "suggestedFix": "how to fix it"
    }}
  ]
}}
```

`filePath`, `lineNumber` and `suggestedFix` are optional. If you find nothing, return `{{"issues": []}}`."#,
            path = path,
            focus = focus_section,
            build = build_section
        )
    }

    pub fn defense(path: &str, issues: &[Issue]) -> String {
        format!(
            r#"You are defending the code in `{path}` against a review.

## Reported Issues
{issues}

## Instructions
For each issue, by id, either concede it or explain why it is not a real problem
(false positive, intended behavior, already handled elsewhere). Be specific."#,
            path = path,
            issues = format_issues(issues)
        )
    }

    pub fn verdict(path: &str, issues: &[Issue], defense: &str) -> String {
        format!(
            r#"You are the moderator of a code review of `{path}`.

## Reported Issues
{issues}

## Defense
{defense}

## Instructions
Decide which issues are real. For each confirmed issue you may assign a fixer:
claude, codex or gemini.

## Output
Respond with a fenced JSON block of exactly this shape:

```json
{{
  "confirmedIssues": [
    {{ "issueId": "issue-1", "confirmed": true, "assignTo": "codex" }}
  ],
  "summary": "one paragraph explaining the verdict"
}}
```"#,
            path = path,
            issues = format_issues(issues),
            defense = defense.trim()
        )
    }

    pub fn fix(path: &str, issue: &Issue) -> String {
        let location = issue.location().unwrap_or_else(|| "unknown location".to_string());
        let suggestion = issue
            .suggested_fix
            .as_deref()
            .map(|s| format!("\n**Suggested fix:** {}", s))
            .unwrap_or_default();

        format!(
            r#"Fix the following confirmed issue in `{path}`.

## Issue {id}
**Type:** {kind}
**Severity:** {severity}
**Location:** {location}
**Description:** {description}{suggestion}

## Instructions
1. Make the smallest change that resolves the issue
2. Do not touch unrelated code
3. Finish with a short summary of what you changed"#,
            path = path,
            id = issue.id,
            kind = issue.issue_type,
            severity = issue.severity,
            location = location,
            description = issue.description,
            suggestion = suggestion
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tribunal_core::{Backend, ExecutorRole, Phase, Severity};

    fn sample_issue() -> Issue {
        Issue::new("issue-1", IssueType::Security, Severity::High, "SQL injection")
            .with_location("src/db.rs", Some(12))
    }

    #[test]
    fn test_format_transcript() {
        assert_eq!(format_transcript(&[]), "");

        let messages = vec![
            Message::new(ExecutorRole::Moderator, Backend::Claude, "opening", Phase::Opening),
            Message::new(ExecutorRole::Challenger, Backend::Codex, "attack", Phase::Round)
                .with_round(1),
        ];
        let transcript = format_transcript(&messages);
        assert!(transcript.contains("### moderator (claude, opening)\nopening"));
        assert!(transcript.contains("### challenger (codex, round 1)\nattack"));
        assert!(transcript.find("opening").unwrap() < transcript.find("attack").unwrap());
    }

    #[test]
    fn test_debate_prompts_mention_topic() {
        assert!(DebatePrompts::opening("Tabs vs spaces", 2).contains("Tabs vs spaces"));
        assert!(DebatePrompts::challenge("T", 3).contains("round 3"));
        assert!(DebatePrompts::defend("T", 1).contains("defender"));
        assert!(DebatePrompts::evaluate("T", 1).contains("moderator"));
        assert!(DebatePrompts::final_verdict("T").contains("final verdict"));
    }

    #[test]
    fn test_analysis_prompt_focus_and_build_errors() {
        let prompt = ReviewPrompts::analysis("/src", &[], &[]);
        assert!(prompt.contains("all issue types"));
        assert!(!prompt.contains("Build Output"));
        assert!(prompt.contains(r#""issues": ["#));

        let prompt = ReviewPrompts::analysis(
            "/src",
            &[IssueType::Security, IssueType::Bug],
            &["error[E0308]: mismatched types".to_string()],
        );
        assert!(prompt.contains("Report only: security, bug"));
        assert!(prompt.contains("error[E0308]"));
    }

    #[test]
    fn test_review_prompts_list_issues() {
        let issues = vec![sample_issue()];
        let defense = ReviewPrompts::defense("/src", &issues);
        assert!(defense.contains("[issue-1] high security at `src/db.rs:12`: SQL injection"));

        let verdict = ReviewPrompts::verdict("/src", &issues, "  not exploitable  ");
        assert!(verdict.contains("not exploitable"));
        assert!(verdict.contains("confirmedIssues"));
    }

    #[test]
    fn test_fix_prompt() {
        let prompt = ReviewPrompts::fix("/src", &sample_issue());
        assert!(prompt.contains("## Issue issue-1"));
        assert!(prompt.contains("**Location:** src/db.rs:12"));
        assert!(!prompt.contains("Suggested fix"));
    }
}
