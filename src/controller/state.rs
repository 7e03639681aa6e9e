use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

pub const MAX_OUTPUT_LINES: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectStatus {
    Pending,
    Running,
    Success,
    Failed,
}

impl ObjectStatus {
    pub fn label(self) -> &'static str {
        match self {
            ObjectStatus::Pending => "pending",
            ObjectStatus::Running => "running",
            ObjectStatus::Success => "ok",
            ObjectStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle,
    Running,
    AwaitingFailureDecision,
    Aborted,
    Completed,
}

impl RunPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Aborted | RunPhase::Completed)
    }
}

/// Why a run ended in [`RunPhase::Aborted`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    UserAbort,
    ExitOnFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub identifier: String,
    pub status: ObjectStatus,
    /// Exit diagnostic (`exit=1`, `signal=15`) or spawn error text.
    pub detail: Option<String>,
    pub elapsed: Option<Duration>,
}

impl ObjectEntry {
    fn pending(identifier: String) -> Self {
        Self {
            identifier,
            status: ObjectStatus::Pending,
            detail: None,
            elapsed: None,
        }
    }
}

/// Everything the display needs, owned by the controller.
#[derive(Debug, Clone)]
pub struct RunState {
    pub entries: Vec<ObjectEntry>,
    pub current_index: Option<usize>,
    pub output: VecDeque<String>,
    pub phase: RunPhase,
    pub abort_reason: Option<AbortReason>,
    pub job_started_at: Option<Instant>,
}

impl RunState {
    pub fn new(objects: Vec<String>) -> Self {
        Self {
            entries: objects.into_iter().map(ObjectEntry::pending).collect(),
            current_index: None,
            output: VecDeque::new(),
            phase: RunPhase::Idle,
            abort_reason: None,
            job_started_at: None,
        }
    }

    pub fn current(&self) -> Option<&ObjectEntry> {
        self.current_index.and_then(|index| self.entries.get(index))
    }

    pub fn finished_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry.status, ObjectStatus::Success | ObjectStatus::Failed))
            .count()
    }

    pub fn count(&self, status: ObjectStatus) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.status == status)
            .count()
    }

    pub fn job_elapsed(&self) -> Duration {
        self.job_started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    pub fn outcome_message(&self) -> &'static str {
        match (self.phase, self.abort_reason) {
            (RunPhase::Completed, _) => "Execution finished successfully.",
            (RunPhase::Aborted, Some(AbortReason::ExitOnFailure)) => {
                "Execution aborted due to failure."
            }
            (RunPhase::Aborted, _) => "Execution aborted by user.",
            _ => "Execution in progress.",
        }
    }

    /// The question asked while in [`RunPhase::AwaitingFailureDecision`].
    pub fn failure_prompt(&self) -> String {
        match self.current().and_then(|entry| entry.detail.as_deref()) {
            Some(detail) => {
                format!("Command failed ({detail}). (s)kip to next object or (e)xit?")
            }
            None => "Command failed. (s)kip to next object or (e)xit?".to_owned(),
        }
    }

    pub(crate) fn push_output(&mut self, line: String) {
        self.output.push_back(line);
        while self.output.len() > MAX_OUTPUT_LINES {
            self.output.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_buffer_keeps_most_recent_lines() {
        let mut state = RunState::new(vec!["a".to_owned()]);
        for i in 0..(MAX_OUTPUT_LINES + 5) {
            state.push_output(format!("line-{i}"));
        }
        assert_eq!(state.output.len(), MAX_OUTPUT_LINES);
        assert_eq!(state.output.front().map(String::as_str), Some("line-5"));
    }

    #[test]
    fn new_state_is_idle_with_pending_entries() {
        let state = RunState::new(vec!["a".to_owned(), "b".to_owned()]);
        assert_eq!(state.phase, RunPhase::Idle);
        assert_eq!(state.current_index, None);
        assert_eq!(state.count(ObjectStatus::Pending), 2);
        assert_eq!(state.finished_count(), 0);
    }
}
