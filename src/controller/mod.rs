//! Drives the object list through the job lifecycle, one process at a time.
//!
//! All state transitions happen here, on the caller's thread. Process output
//! arrives through the active [`ProcessHandle`]'s channel and is folded into
//! [`RunState`] only when [`JobController::poll`] is called.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::command::CommandTemplate;
use crate::process_manager::{CancelOutcome, ExitOutcome, ProcessEvent, ProcessHandle, ProcessRunner};

mod state;

pub use state::{
    AbortReason, ObjectEntry, ObjectStatus, RunPhase, RunState, MAX_OUTPUT_LINES,
};

pub const MAX_EVENTS_PER_TICK: usize = 200;

/// Decisions fed back from the user (or a failure policy).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Abort,
    Skip,
    Exit,
}

/// How a front-end resolves [`RunPhase::AwaitingFailureDecision`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Prompt,
    Skip,
    Exit,
}

impl FailurePolicy {
    /// The decision to apply without asking, if any.
    pub fn decision(self) -> Option<ControlEvent> {
        match self {
            FailurePolicy::Prompt => None,
            FailurePolicy::Skip => Some(ControlEvent::Skip),
            FailurePolicy::Exit => Some(ControlEvent::Exit),
        }
    }
}

/// What changed during one [`JobController::poll`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub lines: Vec<String>,
    pub finished: Option<usize>,
}

impl PollOutcome {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.finished.is_none()
    }
}

struct ActiveJob {
    index: usize,
    handle: ProcessHandle,
}

pub struct JobController {
    template: CommandTemplate,
    runner: ProcessRunner,
    state: RunState,
    active: Option<ActiveJob>,
}

impl JobController {
    pub fn new(template: CommandTemplate, objects: Vec<String>, runner: ProcessRunner) -> Self {
        Self {
            template,
            runner,
            state: RunState::new(objects),
            active: None,
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn template(&self) -> &CommandTemplate {
        &self.template
    }

    pub fn phase(&self) -> RunPhase {
        self.state.phase
    }

    pub fn active_pid(&self) -> Option<u32> {
        self.active.as_ref().map(|job| job.handle.id())
    }

    /// Idle -> Running: launches the first object.
    pub fn start(&mut self) {
        if self.state.phase != RunPhase::Idle {
            return;
        }
        if self.state.entries.is_empty() {
            self.state.phase = RunPhase::Completed;
            return;
        }
        self.launch(0);
    }

    /// Folds pending process events into the state. Waits up to `wait` for
    /// the first event, then drains without blocking.
    pub fn poll(&mut self, wait: Duration) -> PollOutcome {
        let mut outcome = PollOutcome::default();
        let Some(job) = self.active.as_mut() else {
            return outcome;
        };
        let mut exit = None;
        let mut first = true;
        while outcome.lines.len() < MAX_EVENTS_PER_TICK {
            let event = if first && !wait.is_zero() {
                job.handle.next_event_timeout(wait)
            } else {
                job.handle.try_next_event()
            };
            first = false;
            match event {
                Some(ProcessEvent::Line(line)) => {
                    self.state.push_output(line.clone());
                    outcome.lines.push(line);
                }
                Some(ProcessEvent::Exit(result)) => {
                    exit = Some(result);
                    break;
                }
                None => break,
            }
        }
        if let Some(result) = exit {
            if let Some(job) = self.active.take() {
                outcome.finished = Some(job.index);
                self.record_outcome(job.index, &result);
                self.after_job(job.index);
            }
        }
        outcome
    }

    pub fn handle(&mut self, event: ControlEvent) {
        match (self.state.phase, event) {
            (
                RunPhase::Running | RunPhase::Idle | RunPhase::AwaitingFailureDecision,
                ControlEvent::Abort,
            ) => self.abort(),
            (RunPhase::AwaitingFailureDecision, ControlEvent::Skip) => {
                let next = self.state.current_index.map_or(0, |index| index + 1);
                info!(next, "skipping past failed object");
                self.advance_to(next);
            }
            (RunPhase::AwaitingFailureDecision, ControlEvent::Exit) => {
                info!("exiting after failed object");
                self.state.phase = RunPhase::Aborted;
                self.state.abort_reason = Some(AbortReason::ExitOnFailure);
            }
            _ => {}
        }
    }

    fn abort(&mut self) {
        if let Some(mut job) = self.active.take() {
            match job.handle.cancel() {
                CancelOutcome::AlreadyExited(result) => {
                    // The process beat the cancel; it counts as a normal finish.
                    self.record_outcome(job.index, &result);
                    let last = job.index + 1 == self.state.entries.len();
                    if last && result.is_success() {
                        info!("abort arrived after the last job finished");
                        self.advance_to(job.index + 1);
                        return;
                    }
                }
                CancelOutcome::Terminated { outcome, forced } => {
                    info!(object = %self.state.entries[job.index].identifier, %outcome, forced, "aborted running job");
                    let elapsed = self.state.job_elapsed();
                    let entry = &mut self.state.entries[job.index];
                    entry.status = ObjectStatus::Failed;
                    entry.detail = Some(format!("aborted ({outcome})"));
                    entry.elapsed = Some(elapsed);
                }
            }
        }
        self.state.phase = RunPhase::Aborted;
        self.state.abort_reason = Some(AbortReason::UserAbort);
    }

    fn record_outcome(&mut self, index: usize, result: &ExitOutcome) {
        let elapsed = self.state.job_elapsed();
        let entry = &mut self.state.entries[index];
        entry.elapsed = Some(elapsed);
        entry.detail = Some(result.to_string());
        entry.status = if result.is_success() {
            ObjectStatus::Success
        } else {
            ObjectStatus::Failed
        };
        info!(object = %entry.identifier, outcome = %result, elapsed_ms = elapsed.as_millis() as u64, "job finished");
    }

    fn after_job(&mut self, index: usize) {
        match self.state.entries[index].status {
            ObjectStatus::Success => self.advance_to(index + 1),
            _ => self.state.phase = RunPhase::AwaitingFailureDecision,
        }
    }

    fn advance_to(&mut self, next: usize) {
        if next >= self.state.entries.len() {
            self.state.phase = RunPhase::Completed;
            self.state.job_started_at = None;
            return;
        }
        self.launch(next);
    }

    fn launch(&mut self, index: usize) {
        self.state.output.clear();
        self.state.current_index = Some(index);
        self.state.job_started_at = Some(Instant::now());

        let identifier = self.state.entries[index].identifier.clone();
        let argv = self.template.render(&identifier);
        debug!(object = %identifier, ?argv, "launching job");

        match self.runner.start(&argv) {
            Ok(handle) => {
                self.state.entries[index].status = ObjectStatus::Running;
                self.state.phase = RunPhase::Running;
                self.active = Some(ActiveJob { index, handle });
            }
            Err(err) => {
                warn!(object = %identifier, error = %err, "failed to start job");
                let entry = &mut self.state.entries[index];
                entry.status = ObjectStatus::Failed;
                entry.detail = Some(err.to_string());
                entry.elapsed = Some(Duration::ZERO);
                self.state.push_output(format!("[sweep] {err}"));
                self.state.phase = RunPhase::AwaitingFailureDecision;
            }
        }
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        if let Some(mut job) = self.active.take() {
            let _ = job.handle.cancel();
        }
    }
}

#[cfg(test)]
#[path = "../tests/controller_tests.rs"]
mod tests;
