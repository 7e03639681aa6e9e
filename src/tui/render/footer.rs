use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::controller::{ObjectStatus, RunPhase, RunState};

pub(super) fn render_footer(frame: &mut Frame<'_>, area: Rect, state: &RunState, notice: Option<&str>) {
    let muted = Style::default().fg(Color::DarkGray);
    let active = Style::default().fg(Color::Yellow);

    if let Some(notice) = notice {
        frame.render_widget(Paragraph::new(Span::styled(notice.to_owned(), active)), area);
        return;
    }

    let keys = match state.phase {
        RunPhase::Idle | RunPhase::Running => "abort (q)",
        RunPhase::AwaitingFailureDecision => "skip (s)  |  exit (e)",
        RunPhase::Completed | RunPhase::Aborted => "any key to exit",
    };
    let spans = vec![
        Span::styled(keys, active),
        Span::styled("  |  ", muted),
        Span::styled(
            format!("ok:{}", state.count(ObjectStatus::Success)),
            Style::default().fg(Color::Green),
        ),
        Span::styled(" ", muted),
        Span::styled(
            format!("failed:{}", state.count(ObjectStatus::Failed)),
            Style::default().fg(Color::Red),
        ),
        Span::styled(
            format!(" pending:{}", state.count(ObjectStatus::Pending)),
            muted,
        ),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
