//! Command-line arguments.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::command::PLACEHOLDER;
use crate::controller::FailurePolicy;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "sweep",
    version,
    about = "Run one command over a list of objects, one at a time, with a live view.",
    arg_required_else_help = true,
    after_help = "Example:\n  sweep --list servers.txt --command 'ssh $object \"echo $HOSTNAME ; df -h /\"'\n\nOnly `$object` (or `${object}`) is substituted. Other `$VARS` are passed through\nunexpanded. Press q during a run to abort. In plain mode Ctrl-C stops the run and still prints the report."
)]
pub struct CliArgs {
    /// File with one object per line. Blank lines are skipped.
    #[arg(short, long, value_name = "PATH")]
    pub list: PathBuf,

    /// Command template; must contain the `$object` placeholder.
    #[arg(short, long, value_name = "TEMPLATE")]
    pub command: String,

    /// What to do when a command fails.
    #[arg(long, value_enum, default_value_t = OnFailure::Prompt)]
    pub on_failure: OnFailure,

    /// Milliseconds to wait after SIGTERM before killing an aborted command.
    #[arg(long, value_name = "MILLIS", default_value_t = 3000)]
    pub grace_ms: u64,

    /// Line-oriented output instead of the full-screen view.
    #[arg(long)]
    pub plain: bool,

    /// Print the final report as JSON.
    #[arg(long)]
    pub json: bool,

    /// Logging level. Falls back to `SWEEP_LOG`, then `warn`.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

impl CliArgs {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OnFailure {
    /// Ask whether to skip or exit.
    Prompt,
    /// Continue with the next object.
    Skip,
    /// Stop the run.
    Exit,
}

impl From<OnFailure> for FailurePolicy {
    fn from(value: OnFailure) -> Self {
        match value {
            OnFailure::Prompt => FailurePolicy::Prompt,
            OnFailure::Skip => FailurePolicy::Skip,
            OnFailure::Exit => FailurePolicy::Exit,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_tracing(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

pub fn placeholder_hint() -> String {
    format!("Use `{PLACEHOLDER}` where the object should go, e.g. `ssh {PLACEHOLDER} uptime`")
}
