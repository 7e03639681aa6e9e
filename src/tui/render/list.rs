use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::controller::{ObjectStatus, RunState};

use super::super::core::{list_window_offset, ViewState};
use super::super::terminal_text::truncate_label;
use super::{inner_height, panel_block, panel_title};

pub(super) struct StatusGlyph {
    pub(super) symbol: &'static str,
    pub(super) style: Style,
}

/// Rendering table for object status.
pub(super) fn status_glyph(status: ObjectStatus) -> StatusGlyph {
    match status {
        ObjectStatus::Pending => StatusGlyph {
            symbol: "[ ]",
            style: Style::default().fg(Color::Gray),
        },
        ObjectStatus::Running => StatusGlyph {
            symbol: "[▶]",
            style: Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        },
        ObjectStatus::Success => StatusGlyph {
            symbol: "[✔]",
            style: Style::default().fg(Color::Green),
        },
        ObjectStatus::Failed => StatusGlyph {
            symbol: "[✖]",
            style: Style::default().fg(Color::Red),
        },
    }
}

pub(super) fn render_object_list(
    frame: &mut Frame<'_>,
    area: Rect,
    state: &RunState,
    view: &mut ViewState,
) {
    let visible = inner_height(area);
    view.list_offset = list_window_offset(
        view.list_offset,
        state.current_index,
        visible,
        state.entries.len(),
    );
    // pointer, space, glyph, space
    let name_width = (area.width.saturating_sub(2) as usize).saturating_sub(6);

    let lines = state
        .entries
        .iter()
        .enumerate()
        .skip(view.list_offset)
        .take(visible)
        .map(|(index, entry)| {
            let glyph = status_glyph(entry.status);
            let is_current = state.current_index == Some(index);
            let row_style = if is_current {
                glyph.style.add_modifier(Modifier::REVERSED)
            } else {
                glyph.style
            };
            Line::from(vec![
                Span::styled(
                    if is_current { "› " } else { "  " },
                    Style::default().fg(Color::Magenta),
                ),
                Span::styled(
                    format!(
                        "{} {}",
                        glyph.symbol,
                        truncate_label(&entry.identifier, name_width)
                    ),
                    row_style,
                ),
            ])
        })
        .collect::<Vec<Line>>();

    let title = panel_title(format!(
        " Objects {}/{} ",
        state.finished_count(),
        state.entries.len()
    ));
    frame.render_widget(
        Paragraph::new(lines).block(panel_block(title, Color::DarkGray)),
        area,
    );
}
