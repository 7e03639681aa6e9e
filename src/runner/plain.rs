//! Line-oriented front-end for pipes, CI logs and tiny terminals.

use std::io::{self, BufRead, ErrorKind, Write};
use std::time::Duration;

use tracing::debug;

use crate::controller::{ControlEvent, FailurePolicy, JobController, ObjectStatus, RunPhase};
use crate::tui::terminal_text::{display_line, format_elapsed, strip_ansi};
use crate::ui::{NoticeLevel, PlainRenderer, Renderer, StepState, UiResult};

const POLL_WAIT: Duration = Duration::from_millis(100);
const OUTPUT_GUTTER: &str = "│";

/// Drives `controller` to a terminal phase, printing each job as it runs.
/// Failure decisions come from `policy`, then from `input`; with neither,
/// the run stops at the first failure. `interrupted` is checked between
/// events and aborts the run when it reports true.
pub(super) fn run_plain<W: Write, R: BufRead>(
    controller: &mut JobController,
    policy: FailurePolicy,
    renderer: &mut PlainRenderer<W>,
    mut input: Option<R>,
    interrupted: &dyn Fn() -> bool,
) -> UiResult<()> {
    let mut announced = None;
    controller.start();
    announce(controller, renderer, &mut announced)?;

    while !controller.phase().is_terminal() {
        if interrupted() {
            abort_run(controller, renderer)?;
            break;
        }
        match controller.phase() {
            RunPhase::Running => {
                let outcome = controller.poll(POLL_WAIT);
                for line in &outcome.lines {
                    write_output(renderer, line)?;
                }
                if let Some(index) = outcome.finished {
                    finish_step(controller, renderer, index)?;
                }
            }
            RunPhase::AwaitingFailureDecision => {
                let decision = match policy.decision() {
                    Some(decision) => decision,
                    None => ask_decision(controller, renderer, input.as_mut(), interrupted)?,
                };
                debug!(?decision, "plain failure decision");
                controller.handle(decision);
            }
            RunPhase::Idle | RunPhase::Aborted | RunPhase::Completed => break,
        }
        announce(controller, renderer, &mut announced)?;
    }
    renderer.flush()
}

/// Prints the header for a newly launched job. A job whose spawn failed is
/// already finished at this point, so its step line follows right away.
fn announce<W: Write>(
    controller: &JobController,
    renderer: &mut PlainRenderer<W>,
    announced: &mut Option<usize>,
) -> UiResult<()> {
    let state = controller.state();
    let Some(index) = state.current_index else {
        return Ok(());
    };
    if *announced == Some(index) {
        return Ok(());
    }
    *announced = Some(index);

    let entry = &state.entries[index];
    renderer.section(&format!(
        "[{}/{}] {}",
        index + 1,
        state.entries.len(),
        entry.identifier
    ))?;
    renderer.notice(
        NoticeLevel::Info,
        &format!("$ {}", controller.template().display_for(&entry.identifier)),
    )?;
    for line in &state.output {
        write_output(renderer, line)?;
    }
    if entry.status == ObjectStatus::Failed {
        finish_step(controller, renderer, index)?;
    }
    Ok(())
}

fn abort_run<W: Write>(
    controller: &mut JobController,
    renderer: &mut PlainRenderer<W>,
) -> UiResult<()> {
    let running = match controller.phase() {
        RunPhase::Running => controller.state().current_index,
        _ => None,
    };
    renderer.notice(NoticeLevel::Warning, "interrupted; stopping the run")?;
    controller.handle(ControlEvent::Abort);
    if let Some(index) = running {
        finish_step(controller, renderer, index)?;
    }
    Ok(())
}

fn write_output<W: Write>(renderer: &mut PlainRenderer<W>, raw: &str) -> UiResult<()> {
    let line = display_line(raw);
    let line = if renderer.color_enabled() {
        line
    } else {
        strip_ansi(&line)
    };
    renderer.output_line(OUTPUT_GUTTER, &line)
}

fn finish_step<W: Write>(
    controller: &JobController,
    renderer: &mut PlainRenderer<W>,
    index: usize,
) -> UiResult<()> {
    let entry = &controller.state().entries[index];
    let mut label = entry.identifier.clone();
    if let Some(detail) = &entry.detail {
        label.push_str(&format!(" ({detail})"));
    }
    if let Some(elapsed) = entry.elapsed {
        label.push_str(&format!(" in {}", format_elapsed(elapsed)));
    }
    let state = match entry.status {
        ObjectStatus::Success => StepState::Done,
        ObjectStatus::Failed => StepState::Failed,
        ObjectStatus::Pending => StepState::Pending,
        ObjectStatus::Running => StepState::Running,
    };
    renderer.step(&label, state)
}

fn ask_decision<W: Write, R: BufRead>(
    controller: &JobController,
    renderer: &mut PlainRenderer<W>,
    input: Option<&mut R>,
    interrupted: &dyn Fn() -> bool,
) -> UiResult<ControlEvent> {
    let Some(input) = input else {
        renderer.notice(
            NoticeLevel::Warning,
            "no terminal to answer the failure prompt; stopping the run",
        )?;
        return Ok(ControlEvent::Exit);
    };
    let prompt = controller.state().failure_prompt();
    loop {
        renderer.text(&prompt)?;
        renderer.flush()?;
        let answer = match read_answer(input, interrupted)? {
            Answer::Line(answer) => answer,
            Answer::EndOfInput => return Ok(ControlEvent::Exit),
            Answer::Interrupted => return Ok(ControlEvent::Abort),
        };
        match answer.trim() {
            "s" | "S" => return Ok(ControlEvent::Skip),
            "e" | "E" => return Ok(ControlEvent::Exit),
            _ => {}
        }
    }
}

enum Answer {
    Line(String),
    EndOfInput,
    Interrupted,
}

/// Reads one line like `read_line`, except that an interrupted read is
/// reported instead of retried once `interrupted` says so.
fn read_answer<R: BufRead>(input: &mut R, interrupted: &dyn Fn() -> bool) -> io::Result<Answer> {
    let mut line = Vec::new();
    loop {
        let available = match input.fill_buf() {
            Ok(available) => available,
            Err(err) if err.kind() == ErrorKind::Interrupted => {
                if interrupted() {
                    return Ok(Answer::Interrupted);
                }
                continue;
            }
            Err(err) => return Err(err),
        };
        if available.is_empty() {
            if line.is_empty() {
                return Ok(Answer::EndOfInput);
            }
            break;
        }
        match available.iter().position(|byte| *byte == b'\n') {
            Some(pos) => {
                line.extend_from_slice(&available[..=pos]);
                input.consume(pos + 1);
                break;
            }
            None => {
                let len = available.len();
                line.extend_from_slice(available);
                input.consume(len);
            }
        }
    }
    Ok(Answer::Line(String::from_utf8_lossy(&line).into_owned()))
}
