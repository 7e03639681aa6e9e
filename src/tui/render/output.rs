use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::Line;
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::controller::{RunPhase, RunState};

use super::super::core::{tail_offset, ViewState};
use super::super::terminal_text::{ansi_line, display_line, format_elapsed};
use super::{inner_height, panel_block, panel_title};

pub(super) fn render_output_pane(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &RunState,
    view: &mut ViewState,
) {
    let visible = inner_height(area);
    view.output_offset = tail_offset(state.output.len(), visible);

    let lines = state
        .output
        .iter()
        .skip(view.output_offset)
        .map(|raw| ansi_line(&display_line(raw), Style::default()))
        .collect::<Vec<Line>>();

    let title = match state.current() {
        Some(entry) if state.phase == RunPhase::Running => format!(
            " Live Output: {} · {} ",
            entry.identifier,
            format_elapsed(state.job_elapsed())
        ),
        Some(entry) => format!(" Live Output: {} ", entry.identifier),
        None => " Live Output ".to_owned(),
    };
    let border = match state.phase {
        RunPhase::AwaitingFailureDecision => Color::Red,
        RunPhase::Running => Color::Magenta,
        _ => Color::DarkGray,
    };
    frame.render_widget(
        Paragraph::new(lines).block(panel_block(panel_title(title), border)),
        area,
    );
}
