use std::io;

use crossterm::cursor::Hide;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnableLineWrap, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::logging;

pub(super) type TuiTerminal = Terminal<CrosstermBackend<std::io::Stdout>>;

/// Owns the terminal while the TUI runs. Raw mode and the alternate screen
/// are undone on drop, so an early return or a panic still leaves a usable
/// shell behind.
pub(super) struct TerminalSession {
    pub(super) terminal: TuiTerminal,
    active: bool,
}

impl TerminalSession {
    pub(super) fn enter() -> Result<Self, io::Error> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        let backend = CrosstermBackend::new(stdout);
        let terminal = match Terminal::new(backend) {
            Ok(terminal) => terminal,
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                return Err(err);
            }
        };
        logging::hold_stderr();
        let mut session = Self {
            terminal,
            active: true,
        };
        session.terminal.clear()?;
        Ok(session)
    }

    pub(super) fn restore(&mut self) -> Result<(), io::Error> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let raw = disable_raw_mode();
        let screen = execute!(self.terminal.backend_mut(), LeaveAlternateScreen, EnableLineWrap);
        let cursor = self.terminal.show_cursor();
        logging::release_stderr();
        raw?;
        screen?;
        cursor
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}
