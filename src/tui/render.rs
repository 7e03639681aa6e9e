use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::border;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders};
use ratatui::Frame;

use crate::controller::RunState;

use super::config::{MIN_HEIGHT, MIN_LIST_WIDTH, MIN_WIDTH};
use super::core::ViewState;

mod footer;
mod list;
mod output;
mod overlay;

use footer::render_footer;
use list::render_object_list;
use output::render_output_pane;
use overlay::{render_compact, render_phase_overlay};

/// Draws one frame from the run state. Only the derived scroll offsets in
/// `view` are updated.
pub(crate) fn render_run(frame: &mut Frame<'_>, state: &RunState, view: &mut ViewState) {
    let area = frame.area();
    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        render_compact(frame, area, state);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(area);
    let list_width = (area.width / 4).max(MIN_LIST_WIDTH).min(area.width / 2);
    let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(list_width), Constraint::Min(1)])
        .split(rows[0]);

    render_object_list(frame, panes[0], state, view);
    render_output_pane(frame, panes[1], state, view);
    render_phase_overlay(frame, panes[1], state);
    render_footer(frame, rows[1], state, view.notice.as_deref());
}

pub(super) fn panel_block(title: Line<'static>, border_color: Color) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(border_color))
        .title_top(title.left_aligned())
}

pub(super) fn panel_title(text: String) -> Line<'static> {
    Line::from(Span::styled(
        text,
        Style::default()
            .fg(Color::Magenta)
            .add_modifier(Modifier::BOLD),
    ))
}

pub(super) fn inner_height(area: Rect) -> usize {
    area.height.saturating_sub(2) as usize
}

#[cfg(test)]
#[path = "../tests/render_tests.rs"]
mod tests;
