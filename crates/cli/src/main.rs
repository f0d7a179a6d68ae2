mod config;
mod progress;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use events::EventBus;
use orchestrator::config::DEFAULT_ROUNDS;
use orchestrator::{CodeReviewConfig, CodeReviewOrchestrator, DebateConfig, DebateOrchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tribunal_core::{AgentConfig, Backend, CoreError, ExecutorRole, IssueType, RunStatus};

use crate::config::{parse_backend, FileConfig};

#[derive(Parser)]
#[command(name = "tribunal")]
#[command(about = "Debates and code reviews between LLM command-line agents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ./tribunal.toml, then the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Do not print progress to stderr
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a moderated debate between three agents
    Debate {
        topic: String,

        #[arg(short, long)]
        rounds: Option<u32>,

        #[command(flatten)]
        agents: AgentArgs,
    },
    /// Review the code at PATH, optionally fixing confirmed issues
    Review {
        path: PathBuf,

        /// Build command run in PATH before analysis
        #[arg(long)]
        build: Option<String>,

        /// Only report these issue types (comma separated)
        #[arg(long, value_delimiter = ',', value_parser = parse_issue_type)]
        focus: Vec<IssueType>,

        /// Fix confirmed issues in parallel
        #[arg(long)]
        fix: bool,

        /// Fixer backend; repeat for several (default: all backends)
        #[arg(long = "fixer", value_parser = parse_backend)]
        fixers: Vec<Backend>,

        /// Maximum number of fixers running at once
        #[arg(long)]
        max_parallel: Option<usize>,

        #[command(flatten)]
        agents: AgentArgs,
    },
}

#[derive(Args)]
struct AgentArgs {
    #[arg(long, value_parser = parse_backend)]
    moderator: Option<Backend>,

    #[arg(long, value_parser = parse_backend)]
    challenger: Option<Backend>,

    #[arg(long, value_parser = parse_backend)]
    defender: Option<Backend>,

    /// Timeout for every agent, in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Do not stream agent output
    #[arg(long)]
    no_stream: bool,
}

impl AgentArgs {
    fn apply(&self, agents: Vec<AgentConfig>) -> Vec<AgentConfig> {
        agents
            .into_iter()
            .map(|mut agent| {
                let backend = match agent.role {
                    ExecutorRole::Moderator => self.moderator,
                    ExecutorRole::Challenger => self.challenger,
                    ExecutorRole::Defender => self.defender,
                };
                if let Some(backend) = backend {
                    agent.backend = backend;
                }
                if let Some(secs) = self.timeout {
                    agent.timeout = Duration::from_secs(secs);
                }
                agent
            })
            .collect()
    }

    fn streaming(&self, configured: Option<bool>) -> bool {
        !self.no_stream && configured.unwrap_or(true)
    }
}

fn parse_issue_type(s: &str) -> std::result::Result<IssueType, String> {
    s.parse().map_err(|e: CoreError| e.to_string())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let file = FileConfig::load(cli.config.as_deref())?;
    let bus = EventBus::new();

    let (status, output) = match cli.command {
        Commands::Debate {
            topic,
            rounds,
            agents,
        } => {
            let mut config = DebateConfig::new(topic)
                .with_rounds(rounds.or(file.debate.rounds).unwrap_or(DEFAULT_ROUNDS))
                .with_streaming(agents.streaming(file.debate.streaming));
            config.agents = agents.apply(file.agents());

            if !cli.quiet {
                progress::attach(&bus, config.streaming);
            }
            let orchestrator = DebateOrchestrator::new(config, bus)?;
            let result = orchestrator.run().await;
            (result.status, serde_json::to_string_pretty(&result)?)
        }
        Commands::Review {
            path,
            build,
            focus,
            fix,
            fixers,
            max_parallel,
            agents,
        } => {
            let path = path
                .canonicalize()
                .with_context(|| format!("Review path {} not found", path.display()))?;
            let roles = agents.apply(file.agents());
            let review = file.review;

            let mut config = CodeReviewConfig::new(path)
                .with_auto_fix(fix || review.auto_fix.unwrap_or(false))
                .with_focus(if focus.is_empty() { review.focus } else { focus })
                .with_fixers(if fixers.is_empty() { review.fixers } else { fixers })
                .with_streaming(agents.streaming(review.streaming));
            config.agents = roles;
            config.build_command = build.or(review.build_command);
            config.max_parallel_fixes = max_parallel.or(review.max_parallel_fixes);
            if let Some(secs) = review.build_timeout_secs {
                config.build_timeout = Duration::from_secs(secs);
            }
            if let Some(secs) = review.fix_timeout_secs {
                config.fix_timeout = Duration::from_secs(secs);
            }

            if !cli.quiet {
                progress::attach(&bus, config.streaming);
            }
            let orchestrator = CodeReviewOrchestrator::new(config, bus)?;
            let result = orchestrator.run().await;
            (result.status, serde_json::to_string_pretty(&result)?)
        }
    };

    println!("{}", output);

    Ok(if status == RunStatus::Completed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Logs go to stderr; stdout carries only the JSON result.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tribunal=info,orchestrator=info".into()),
        )
        .init();
}
