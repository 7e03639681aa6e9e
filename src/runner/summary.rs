use std::io::Write;
use std::time::Duration;

use serde::Serialize;

use crate::controller::{AbortReason, ObjectStatus, RunPhase, RunState};
use crate::tui::terminal_text::format_elapsed;
use crate::ui::{
    KeyValue, NoticeLevel, PlainRenderer, Renderer, SummaryCounts, TableSpec, UiResult,
};
use crate::{EXIT_ABORTED, EXIT_FAILURE, EXIT_OK};

/// What is left once the run is over, for the summary table and `--json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub command: String,
    pub phase: RunPhase,
    pub abort_reason: Option<AbortReason>,
    pub message: String,
    pub counts: ReportCounts,
    pub objects: Vec<ObjectReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportCounts {
    pub ok: usize,
    pub failed: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectReport {
    pub object: String,
    pub status: ObjectStatus,
    pub detail: Option<String>,
    pub elapsed_ms: Option<u64>,
}

impl RunReport {
    pub fn from_state(command: &str, state: &RunState) -> Self {
        Self {
            command: command.to_owned(),
            phase: state.phase,
            abort_reason: state.abort_reason,
            message: state.outcome_message().to_owned(),
            counts: ReportCounts {
                ok: state.count(ObjectStatus::Success),
                failed: state.count(ObjectStatus::Failed),
                pending: state.count(ObjectStatus::Pending) + state.count(ObjectStatus::Running),
            },
            objects: state
                .entries
                .iter()
                .map(|entry| ObjectReport {
                    object: entry.identifier.clone(),
                    status: entry.status,
                    detail: entry.detail.clone(),
                    elapsed_ms: entry
                        .elapsed
                        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)),
                })
                .collect(),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.phase {
            RunPhase::Completed => EXIT_OK,
            RunPhase::Aborted => EXIT_ABORTED,
            RunPhase::Idle | RunPhase::Running | RunPhase::AwaitingFailureDecision => {
                EXIT_FAILURE
            }
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn render<W: Write>(&self, renderer: &mut PlainRenderer<W>) -> UiResult<()> {
        renderer.section("Run report")?;
        renderer.key_values(&[KeyValue::new("command", self.command.clone())])?;
        let rows = self
            .objects
            .iter()
            .map(|object| {
                vec![
                    object.object.clone(),
                    object.status.label().to_owned(),
                    object.detail.clone().unwrap_or_else(|| "-".to_owned()),
                    object
                        .elapsed_ms
                        .map(|ms| format_report_elapsed(Duration::from_millis(ms)))
                        .unwrap_or_else(|| "-".to_owned()),
                ]
            })
            .collect();
        renderer.table(&TableSpec::new(
            vec![
                "object".to_owned(),
                "status".to_owned(),
                "detail".to_owned(),
                "elapsed".to_owned(),
            ],
            rows,
        ))?;
        renderer.summary(SummaryCounts {
            ok: self.counts.ok,
            failed: self.counts.failed,
            pending: self.counts.pending,
        })?;
        let level = match (self.phase, self.counts.failed) {
            (RunPhase::Completed, 0) => NoticeLevel::Success,
            (RunPhase::Completed, _) => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        renderer.notice(level, &self.message)
    }
}

fn format_report_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        return format!("{}ms", elapsed.as_millis());
    }
    format_elapsed(elapsed)
}
