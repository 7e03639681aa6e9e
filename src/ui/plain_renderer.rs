use std::io::{IsTerminal, Write};

use anstream::{AutoStream, ColorChoice};
use anstyle::Style;

use crate::ui::renderer::{Renderer, UiResult};
use crate::ui::table::render_table;
use crate::ui::theme::{resolve_color_enabled, OutputMode, Theme};
use crate::ui::widgets::{
    KeyValue, MessageBlock, NoticeLevel, StepState, SummaryCounts, TableSpec,
};

pub struct PlainRenderer<W: Write> {
    writer: W,
    color_enabled: bool,
    theme: Theme,
}

impl<W: Write> PlainRenderer<W> {
    pub fn new(writer: W, color_enabled: bool) -> Self {
        Self {
            writer,
            color_enabled,
            theme: Theme::default(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    pub fn color_enabled(&self) -> bool {
        self.color_enabled
    }

    /// Writes one line of child output. Escape sequences pass through only
    /// when colour is enabled.
    pub fn output_line(&mut self, prefix: &str, line: &str) -> UiResult<()> {
        let gutter = self.style_text(self.theme.muted, prefix);
        writeln!(self.writer, "{gutter} {line}")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn flush(&mut self) -> UiResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    fn style_text(&self, style: Style, text: &str) -> String {
        if !self.color_enabled {
            return text.to_owned();
        }
        format!("{}{}{}", style.render(), text, style.render_reset())
    }

    fn write_block(&mut self, label: &str, style: Style, block: &MessageBlock) -> UiResult<()> {
        let marker = self.style_text(style, label);
        writeln!(self.writer, "{marker} {}", block.title)?;
        writeln!(self.writer, "  {}", block.body)?;
        if let Some(hint) = &block.hint {
            let hint_label = self.style_text(self.theme.muted, "hint");
            writeln!(self.writer, "  {hint_label}: {hint}")?;
        }
        Ok(())
    }
}

fn color_choice(mode: OutputMode) -> ColorChoice {
    match mode {
        OutputMode::Auto => ColorChoice::Auto,
        OutputMode::Always => ColorChoice::AlwaysAnsi,
        OutputMode::Never => ColorChoice::Never,
    }
}

impl PlainRenderer<AutoStream<std::io::Stdout>> {
    pub fn stdout(mode: OutputMode) -> Self {
        let stream = AutoStream::new(std::io::stdout(), color_choice(mode));
        let color_enabled = resolve_color_enabled(mode, std::io::stdout().is_terminal());
        Self::new(stream, color_enabled)
    }
}

impl PlainRenderer<AutoStream<std::io::Stderr>> {
    pub fn stderr(mode: OutputMode) -> Self {
        let stream = AutoStream::new(std::io::stderr(), color_choice(mode));
        let color_enabled = resolve_color_enabled(mode, std::io::stderr().is_terminal());
        Self::new(stream, color_enabled)
    }
}

impl<W: Write> Renderer for PlainRenderer<W> {
    fn text(&mut self, body: &str) -> UiResult<()> {
        write!(self.writer, "{body}")?;
        if !body.ends_with('\n') {
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn section(&mut self, title: &str) -> UiResult<()> {
        let rendered = self.style_text(self.theme.accent, title);
        let underline = self.style_text(self.theme.muted, &"─".repeat(title.chars().count()));
        writeln!(self.writer, "{rendered}")?;
        writeln!(self.writer, "{underline}")?;
        Ok(())
    }

    fn notice(&mut self, level: NoticeLevel, body: &str) -> UiResult<()> {
        let (label, style) = match level {
            NoticeLevel::Info => ("info", self.theme.accent),
            NoticeLevel::Success => ("ok", self.theme.success),
            NoticeLevel::Warning => ("warn", self.theme.warning),
            NoticeLevel::Error => ("error", self.theme.error),
        };
        let marker = self.style_text(style, "•");
        let label = self.style_text(self.theme.muted, label);
        writeln!(self.writer, "{marker} {label}: {body}")?;
        Ok(())
    }

    fn error_block(&mut self, block: &MessageBlock) -> UiResult<()> {
        self.write_block("[error]", self.theme.error, block)
    }

    fn key_values(&mut self, items: &[KeyValue]) -> UiResult<()> {
        for item in items {
            let key = self.style_text(self.theme.label, &item.key);
            let value = self.style_text(self.theme.value, &item.value);
            writeln!(self.writer, "{key}: {value}")?;
        }
        Ok(())
    }

    fn step(&mut self, label: &str, state: StepState) -> UiResult<()> {
        let (symbol, style) = match state {
            StepState::Pending => ("·", self.theme.muted),
            StepState::Running => ("◌", self.theme.accent),
            StepState::Done => ("✓", self.theme.success),
            StepState::Failed => ("✕", self.theme.error),
        };
        let symbol = self.style_text(style, symbol);
        writeln!(self.writer, "{symbol} {label}")?;
        Ok(())
    }

    fn summary(&mut self, counts: SummaryCounts) -> UiResult<()> {
        let ok = self.style_text(self.theme.success, &counts.ok.to_string());
        let failed = self.style_text(self.theme.error, &counts.failed.to_string());
        let pending = self.style_text(self.theme.muted, &counts.pending.to_string());
        writeln!(
            self.writer,
            "summary  ok:{ok}  failed:{failed}  pending:{pending}"
        )?;
        Ok(())
    }

    fn table(&mut self, spec: &TableSpec) -> UiResult<()> {
        let rendered = render_table(spec);
        writeln!(self.writer, "{rendered}")?;
        Ok(())
    }
}
