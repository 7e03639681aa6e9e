//! Orchestrates one run: validate the template, load the objects, pick a
//! front-end, drive the controller to a terminal phase and build the report.

use std::io::{self, IsTerminal, Write};

use thiserror::Error;
use tracing::info;

use crate::cli::{placeholder_hint, CliArgs};
use crate::command::{CommandTemplate, ConfigError};
use crate::controller::{FailurePolicy, JobController};
use crate::objects::{load_objects, ObjectListError};
use crate::process_manager::{ProcessRunner, RunnerConfig};
use crate::tui::{self, TuiError, TuiOptions, MIN_HEIGHT, MIN_WIDTH};
use crate::ui::theme::is_ci_environment;
use crate::ui::{OutputMode, PlainRenderer, UiError};
use crate::{EXIT_FAILURE, EXIT_USAGE};

mod interrupt;
mod plain;
mod summary;

pub use summary::{ObjectReport, ReportCounts, RunReport};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Objects(#[from] ObjectListError),
    #[error(transparent)]
    Tui(#[from] TuiError),
    #[error("failed to write output: {0}")]
    Ui(#[from] UiError),
    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Config(_) | RunError::Objects(_) => EXIT_USAGE,
            RunError::Tui(_) | RunError::Ui(_) | RunError::Json(_) => EXIT_FAILURE,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RunError::Config(_) => "Invalid command template",
            RunError::Objects(_) => "Cannot load object list",
            RunError::Tui(_) => "Terminal failure",
            RunError::Ui(_) | RunError::Json(_) => "Output failure",
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            RunError::Config(ConfigError::MissingPlaceholder | ConfigError::Empty) => {
                Some(placeholder_hint())
            }
            RunError::Config(ConfigError::MismatchedQuotes) => {
                Some("Close every quote opened in --command".to_owned())
            }
            RunError::Objects(ObjectListError::Empty { .. }) => {
                Some("Put one object per line in the --list file".to_owned())
            }
            RunError::Tui(_) => Some("Retry with --plain".to_owned()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontEnd {
    Tui,
    Plain,
}

/// The full-screen view needs both ends of the terminal and enough room
/// for the panes.
pub fn select_front_end(
    force_plain: bool,
    stdout_is_tty: bool,
    stdin_is_tty: bool,
    size: Option<(u16, u16)>,
) -> FrontEnd {
    if force_plain || !stdout_is_tty || !stdin_is_tty {
        return FrontEnd::Plain;
    }
    match size {
        Some((width, height)) if width >= MIN_WIDTH && height >= MIN_HEIGHT => FrontEnd::Tui,
        _ => FrontEnd::Plain,
    }
}

pub fn run_command(args: &CliArgs) -> Result<RunReport, RunError> {
    let template = CommandTemplate::parse(&args.command)?;
    let objects = load_objects(&args.list)?;
    let front_end = select_front_end(
        args.plain,
        io::stdout().is_terminal(),
        io::stdin().is_terminal(),
        crossterm::terminal::size().ok(),
    );
    info!(
        ?front_end,
        objects = objects.len(),
        template = template.source(),
        "starting run"
    );

    let runner = ProcessRunner::new(RunnerConfig {
        grace_period: args.grace_period(),
        new_process_group: front_end == FrontEnd::Tui,
    });
    let mut controller = JobController::new(template, objects, runner);
    let policy = FailurePolicy::from(args.on_failure);

    match front_end {
        FrontEnd::Tui => {
            tui::run_tui(
                &mut controller,
                TuiOptions {
                    failure_policy: policy,
                },
            )?;
        }
        FrontEnd::Plain => run_plain_front_end(&mut controller, policy, args.json)?,
    }

    Ok(RunReport::from_state(
        controller.template().source(),
        controller.state(),
    ))
}

fn run_plain_front_end(
    controller: &mut JobController,
    policy: FailurePolicy,
    json: bool,
) -> Result<(), RunError> {
    let mode = OutputMode::from_env();
    let interactive = io::stdin().is_terminal() && !is_ci_environment();
    // Ctrl-C ends the run through the controller so the report still prints.
    let _sigint = interrupt::InterruptGuard::install();
    // Progress goes to stderr when stdout carries the JSON report.
    if json {
        let mut renderer = PlainRenderer::stderr(mode);
        drive_plain(controller, policy, &mut renderer, interactive)
    } else {
        let mut renderer = PlainRenderer::stdout(mode);
        drive_plain(controller, policy, &mut renderer, interactive)
    }
}

fn drive_plain<W: Write>(
    controller: &mut JobController,
    policy: FailurePolicy,
    renderer: &mut PlainRenderer<W>,
    interactive: bool,
) -> Result<(), RunError> {
    if interactive {
        plain::run_plain(
            controller,
            policy,
            renderer,
            Some(io::stdin().lock()),
            &interrupt::take_interrupt,
        )?;
    } else {
        plain::run_plain(
            controller,
            policy,
            renderer,
            None::<io::StdinLock<'static>>,
            &interrupt::take_interrupt,
        )?;
    }
    Ok(())
}

/// Prints the final report on stdout: a table and summary, or JSON.
pub fn emit_report(report: &RunReport, json: bool) -> Result<(), RunError> {
    if json {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", report.to_json()?).map_err(UiError::from)?;
        return Ok(());
    }
    let mut renderer = PlainRenderer::stdout(OutputMode::from_env());
    report.render(&mut renderer)?;
    renderer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_is_chosen_without_a_terminal_or_when_forced() {
        assert_eq!(
            select_front_end(true, true, true, Some((120, 40))),
            FrontEnd::Plain
        );
        assert_eq!(
            select_front_end(false, false, true, Some((120, 40))),
            FrontEnd::Plain
        );
        assert_eq!(
            select_front_end(false, true, false, Some((120, 40))),
            FrontEnd::Plain
        );
    }

    #[test]
    fn tui_needs_the_minimum_size() {
        assert_eq!(
            select_front_end(false, true, true, Some((MIN_WIDTH, MIN_HEIGHT))),
            FrontEnd::Tui
        );
        assert_eq!(
            select_front_end(false, true, true, Some((MIN_WIDTH - 1, 30))),
            FrontEnd::Plain
        );
        assert_eq!(select_front_end(false, true, true, None), FrontEnd::Plain);
    }

    #[test]
    fn config_and_list_errors_are_usage_errors() {
        let err = RunError::from(ConfigError::MissingPlaceholder);
        assert_eq!(err.exit_code(), EXIT_USAGE);
        assert!(err.hint().is_some_and(|hint| hint.contains("$object")));

        let err = RunError::from(ObjectListError::Empty {
            path: "hosts.txt".into(),
        });
        assert_eq!(err.exit_code(), EXIT_USAGE);
        assert_eq!(err.title(), "Cannot load object list");
    }
}
