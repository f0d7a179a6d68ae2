//! Human-readable progress on stderr, driven by bus events.

use colored::Colorize;
use events::{Event, EventBus, RunKind};
use std::io::Write;
use tribunal_core::{ExecutorRole, FixStatus, RunStatus};

pub fn attach(bus: &EventBus, show_chunks: bool) {
    bus.on(move |envelope| {
        if let Event::MessageChunk { chunk, .. } = &envelope.event {
            if show_chunks {
                let mut stderr = std::io::stderr().lock();
                let _ = stderr.write_all(chunk.as_bytes());
                let _ = stderr.flush();
            }
            return;
        }
        if let Some(line) = describe(&envelope.event, show_chunks) {
            eprintln!("{}", line);
        }
    });
}

fn role_label(role: ExecutorRole) -> colored::ColoredString {
    match role {
        ExecutorRole::Moderator => role.as_str().blue().bold(),
        ExecutorRole::Challenger => role.as_str().red().bold(),
        ExecutorRole::Defender => role.as_str().green().bold(),
    }
}

/// One status line per event; `None` for events that print nothing.
pub fn describe(event: &Event, show_chunks: bool) -> Option<String> {
    let line = match event {
        Event::DebateStart { kind, subject, .. } => {
            let what = match kind {
                RunKind::Debate => "Debate",
                RunKind::CodeReview => "Code review",
            };
            format!("{} {}", what.bold(), subject)
        }
        Event::PhaseStart { phase, .. } => format!("{} {}", "==".cyan(), phase),
        Event::RoundStart { round, total, .. } => {
            format!("{} round {}/{}", "--".cyan(), round, total)
        }
        Event::MessageStart { role, backend, .. } => {
            format!("[{} via {}]", role_label(*role), backend)
        }
        Event::MessageEnd { message, .. } => {
            if show_chunks {
                String::new()
            } else {
                let preview = message.content.lines().next().unwrap_or_default();
                format!("  {}", preview.dimmed())
            }
        }
        Event::FixStart {
            issue_id, backend, ..
        } => format!("{} fixing {} with {}", "~~".cyan(), issue_id, backend),
        Event::FixEnd {
            issue_id,
            status,
            duration_ms,
            ..
        } => {
            let outcome = match status {
                FixStatus::Completed => "fixed".green(),
                _ => status.as_str().red(),
            };
            format!("   {} {} ({}ms)", issue_id, outcome, duration_ms)
        }
        Event::Error { message, fatal, .. } => {
            let label = if *fatal { "error".red().bold() } else { "warning".yellow().bold() };
            format!("{}: {}", label, message)
        }
        Event::DebateEnd { status, error, .. } => match (status, error) {
            (RunStatus::Completed, _) => format!("{}", "Completed".green().bold()),
            (status, Some(error)) => format!("{} {}", status.as_str().red().bold(), error),
            (status, None) => format!("{}", status.as_str().red().bold()),
        },
        _ => return None,
    };
    Some(line)
}
