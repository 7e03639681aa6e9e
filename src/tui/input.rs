use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::controller::{ControlEvent, RunPhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyAction {
    Control(ControlEvent),
    /// Leave the final screen.
    Dismiss,
}

/// Maps a key press to an action for the current phase. Keys that mean
/// nothing in that phase map to `None`.
pub(crate) fn route_key(phase: RunPhase, key: &KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    let ctrl_c =
        key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c'));
    match phase {
        RunPhase::Idle | RunPhase::Running => match key.code {
            _ if ctrl_c => Some(KeyAction::Control(ControlEvent::Abort)),
            KeyCode::Char('q' | 'Q') => Some(KeyAction::Control(ControlEvent::Abort)),
            _ => None,
        },
        RunPhase::AwaitingFailureDecision => match key.code {
            _ if ctrl_c => Some(KeyAction::Control(ControlEvent::Exit)),
            KeyCode::Char('s' | 'S') => Some(KeyAction::Control(ControlEvent::Skip)),
            KeyCode::Char('e' | 'E') => Some(KeyAction::Control(ControlEvent::Exit)),
            _ => None,
        },
        RunPhase::Completed | RunPhase::Aborted => Some(KeyAction::Dismiss),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn q_aborts_while_running() {
        assert_eq!(
            route_key(RunPhase::Running, &press(KeyCode::Char('q'))),
            Some(KeyAction::Control(ControlEvent::Abort))
        );
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(
            route_key(RunPhase::Running, &ctrl_c),
            Some(KeyAction::Control(ControlEvent::Abort))
        );
    }

    #[test]
    fn failure_prompt_accepts_skip_and_exit_only() {
        assert_eq!(
            route_key(RunPhase::AwaitingFailureDecision, &press(KeyCode::Char('S'))),
            Some(KeyAction::Control(ControlEvent::Skip))
        );
        assert_eq!(
            route_key(RunPhase::AwaitingFailureDecision, &press(KeyCode::Char('e'))),
            Some(KeyAction::Control(ControlEvent::Exit))
        );
        assert_eq!(
            route_key(RunPhase::AwaitingFailureDecision, &press(KeyCode::Char('q'))),
            None
        );
        assert_eq!(
            route_key(RunPhase::AwaitingFailureDecision, &press(KeyCode::Enter)),
            None
        );
    }

    #[test]
    fn unrelated_keys_are_ignored_while_running() {
        assert_eq!(route_key(RunPhase::Running, &press(KeyCode::Char('s'))), None);
        assert_eq!(route_key(RunPhase::Running, &press(KeyCode::Esc)), None);
    }

    #[test]
    fn any_key_dismisses_terminal_screen() {
        assert_eq!(
            route_key(RunPhase::Completed, &press(KeyCode::Char('x'))),
            Some(KeyAction::Dismiss)
        );
        assert_eq!(
            route_key(RunPhase::Aborted, &press(KeyCode::Enter)),
            Some(KeyAction::Dismiss)
        );
    }

    #[test]
    fn key_release_events_are_ignored() {
        let mut release = press(KeyCode::Char('q'));
        release.kind = KeyEventKind::Release;
        release.state = KeyEventState::NONE;
        assert_eq!(route_key(RunPhase::Running, &release), None);
    }
}
