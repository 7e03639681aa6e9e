use std::time::Duration;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Prepares one captured output line for display: a carriage-return
/// progress line keeps only its last fragment, and control bytes other
/// than ESC are dropped so SGR colour sequences survive for [`ansi_line`].
pub(crate) fn display_line(raw: &str) -> String {
    let last = raw
        .split('\r')
        .filter(|fragment| !fragment.is_empty())
        .last()
        .unwrap_or("");
    sanitize_output_text(last)
}

pub(crate) fn sanitize_output_text(raw: &str) -> String {
    raw.chars()
        .map(|ch| if ch == '\t' { ' ' } else { ch })
        .filter(|ch| {
            !matches!(
                ch,
                '\r'
                    | '\u{0000}'..='\u{0008}'
                    | '\u{000A}'..='\u{001A}'
                    | '\u{001C}'..='\u{001F}'
                    | '\u{007F}'
            )
        })
        .collect()
}

/// Removes every escape sequence, for plain-text output and width checks.
pub(crate) fn strip_ansi(raw: &str) -> String {
    ansi_line(raw, Style::default())
        .spans
        .iter()
        .map(|span| span.content.as_ref())
        .collect()
}

pub(crate) fn ansi_line(raw: &str, base: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut style = base;
    let mut buf = String::new();
    let chars: Vec<char> = raw.chars().collect();
    let mut i = 0usize;
    while i < chars.len() {
        if chars[i] == '\u{1b}' && i + 1 < chars.len() && chars[i + 1] == '[' {
            if !buf.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut buf), style));
            }
            i += 2;
            let mut code = String::new();
            while i < chars.len() {
                let final_byte = chars[i];
                if ('@'..='~').contains(&final_byte) {
                    if final_byte == 'm' {
                        style = apply_sgr(style, &code, base);
                    }
                    break;
                }
                code.push(final_byte);
                i += 1;
            }
        } else if chars[i] != '\u{1b}' {
            buf.push(chars[i]);
        }
        i += 1;
    }
    if !buf.is_empty() {
        spans.push(Span::styled(buf, style));
    }
    if spans.is_empty() {
        return Line::from("");
    }
    Line::from(spans)
}

fn apply_sgr(current: Style, sgr: &str, base: Style) -> Style {
    let mut style = current;
    let parts = if sgr.is_empty() {
        vec!["0"]
    } else {
        sgr.split(';').collect::<Vec<&str>>()
    };
    for part in parts {
        match part.parse::<u8>() {
            Ok(0) => style = base,
            Ok(1) => style = style.add_modifier(Modifier::BOLD),
            Ok(2) => style = style.add_modifier(Modifier::DIM),
            Ok(3) => style = style.add_modifier(Modifier::ITALIC),
            Ok(4) => style = style.add_modifier(Modifier::UNDERLINED),
            Ok(22) => style = style.remove_modifier(Modifier::BOLD | Modifier::DIM),
            Ok(23) => style = style.remove_modifier(Modifier::ITALIC),
            Ok(24) => style = style.remove_modifier(Modifier::UNDERLINED),
            Ok(code @ 30..=37) => style = style.fg(basic_color(code - 30)),
            Ok(39) => style = style.fg(base.fg.unwrap_or(Color::Reset)),
            Ok(code @ 90..=97) => style = style.fg(bright_color(code - 90)),
            _ => {}
        }
    }
    style
}

fn basic_color(index: u8) -> Color {
    match index {
        0 => Color::Black,
        1 => Color::Red,
        2 => Color::Green,
        3 => Color::Yellow,
        4 => Color::Blue,
        5 => Color::Magenta,
        6 => Color::Cyan,
        _ => Color::Gray,
    }
}

fn bright_color(index: u8) -> Color {
    match index {
        0 => Color::DarkGray,
        1 => Color::LightRed,
        2 => Color::LightGreen,
        3 => Color::LightYellow,
        4 => Color::LightBlue,
        5 => Color::LightMagenta,
        6 => Color::LightCyan,
        _ => Color::White,
    }
}

pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}h{minutes:02}m{secs:02}s")
    } else if minutes > 0 {
        format!("{minutes}m{secs:02}s")
    } else {
        format!("{secs}s")
    }
}

/// Cuts `text` to at most `max` characters, marking the cut with `..`.
pub(crate) fn truncate_label(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_owned();
    }
    if max <= 2 {
        return text.chars().take(max).collect();
    }
    let mut out = text.chars().take(max - 2).collect::<String>();
    out.push_str("..");
    out
}
