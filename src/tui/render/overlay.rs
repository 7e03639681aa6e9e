use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Clear, Paragraph, Wrap};
use ratatui::Frame;

use crate::controller::{RunPhase, RunState};

use super::{panel_block, panel_title};

const PROMPT_HEIGHT: u16 = 3;

pub(super) fn final_prompt(state: &RunState) -> String {
    format!("{} Press any key to exit.", state.outcome_message())
}

/// Modal line at the bottom of the output pane for the failure prompt and
/// the final screen. The object list stays uncovered.
pub(super) fn render_phase_overlay(frame: &mut Frame<'_>, body: Rect, state: &RunState) {
    let (message, color) = match state.phase {
        RunPhase::AwaitingFailureDecision => (state.failure_prompt(), Color::Yellow),
        RunPhase::Completed => (final_prompt(state), Color::Green),
        RunPhase::Aborted => (final_prompt(state), Color::Red),
        RunPhase::Idle | RunPhase::Running => return,
    };
    if body.height < PROMPT_HEIGHT {
        return;
    }
    let area = Rect {
        x: body.x,
        y: body.y + body.height - PROMPT_HEIGHT,
        width: body.width,
        height: PROMPT_HEIGHT,
    };
    frame.render_widget(Clear, area);
    let prompt = Paragraph::new(Line::from(Span::styled(
        message,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )))
    .block(panel_block(panel_title(String::new()), color));
    frame.render_widget(prompt, area);
}

/// Textual fallback for terminals below the minimum pane geometry.
pub(super) fn render_compact(frame: &mut Frame<'_>, area: Rect, state: &RunState) {
    let current = state
        .current()
        .map(|entry| format!("{} [{}]", entry.identifier, entry.status.label()))
        .unwrap_or_else(|| "-".to_owned());
    let mut lines = vec![Line::from(format!(
        "sweep {}/{} {current}",
        state.finished_count(),
        state.entries.len()
    ))];
    match state.phase {
        RunPhase::AwaitingFailureDecision => lines.push(Line::from(state.failure_prompt())),
        RunPhase::Completed | RunPhase::Aborted => lines.push(Line::from(final_prompt(state))),
        RunPhase::Idle | RunPhase::Running => {
            lines.push(Line::from("terminal too small, q to abort"))
        }
    }
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), area);
}
