//! Full-screen front-end: the object list beside the live output of the
//! running job, with the failure prompt and the final screen as overlays.
//!
//! One loop on the caller's thread drains process events from the
//! controller, polls the keyboard, and redraws when something changed, the
//! terminal was resized, or the redraw tick elapsed.

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event};
use thiserror::Error;
use tracing::debug;

use crate::controller::{ControlEvent, FailurePolicy, JobController, RunPhase};

mod config;
mod core;
mod input;
mod lifecycle;
mod render;
pub(crate) mod terminal_text;

pub(crate) use config::{MIN_HEIGHT, MIN_WIDTH};

use self::core::ViewState;
use input::{route_key, KeyAction};
use lifecycle::TerminalSession;
use render::render_run;

#[derive(Debug, Error)]
pub enum TuiError {
    #[error("terminal error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TuiOptions {
    pub failure_policy: FailurePolicy,
}

/// Runs the controller to a terminal phase inside the TUI and waits for the
/// user to dismiss the final screen. The terminal is restored before
/// returning, also on error.
pub fn run_tui(controller: &mut JobController, options: TuiOptions) -> Result<RunPhase, TuiError> {
    let mut session = TerminalSession::enter()?;
    let mut view = ViewState::default();
    let result = event_loop(&mut session, controller, &mut view, options);
    session.restore()?;
    result?;
    Ok(controller.phase())
}

fn event_loop(
    session: &mut TerminalSession,
    controller: &mut JobController,
    view: &mut ViewState,
    options: TuiOptions,
) -> Result<(), TuiError> {
    controller.start();
    let mut dirty = true;
    let mut last_draw = Instant::now();

    loop {
        if !controller.poll(Duration::ZERO).is_empty() {
            dirty = true;
        }
        if controller.phase() == RunPhase::AwaitingFailureDecision {
            if let Some(decision) = options.failure_policy.decision() {
                controller.handle(decision);
                dirty = true;
                continue;
            }
        }

        if dirty || last_draw.elapsed() >= config::REDRAW_TICK {
            session
                .terminal
                .draw(|frame| render_run(frame, controller.state(), view))?;
            dirty = false;
            last_draw = Instant::now();
        }

        let wait = if controller.phase() == RunPhase::Running {
            config::INPUT_POLL_WAIT
        } else {
            config::REDRAW_TICK
        };
        if !event::poll(wait)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => match route_key(controller.phase(), &key) {
                Some(KeyAction::Control(ControlEvent::Abort)) => {
                    view.notice = Some("Aborting: stopping the running job...".to_owned());
                    session
                        .terminal
                        .draw(|frame| render_run(frame, controller.state(), view))?;
                    controller.handle(ControlEvent::Abort);
                    view.notice = None;
                    dirty = true;
                }
                Some(KeyAction::Control(decision)) => {
                    controller.handle(decision);
                    dirty = true;
                }
                Some(KeyAction::Dismiss) => return Ok(()),
                None => {}
            },
            Event::Resize(width, height) => {
                debug!(width, height, "terminal resized");
                dirty = true;
            }
            _ => {}
        }
    }
}
