use super::*;
use crate::controller::{ObjectStatus, RunPhase};
use ratatui::backend::TestBackend;
use ratatui::Terminal;

fn state_with(objects: &[&str]) -> RunState {
    RunState::new(objects.iter().map(|object| (*object).to_owned()).collect())
}

fn render_text(state: &RunState, view: &mut ViewState, width: u16, height: u16) -> String {
    let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
    terminal
        .draw(|frame| render_run(frame, state, view))
        .expect("draw");
    let buffer = terminal.backend().buffer();
    buffer
        .content
        .chunks(width as usize)
        .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
        .collect::<Vec<String>>()
        .join("\n")
}

#[test]
fn list_shows_status_glyphs_and_pointer() {
    let mut state = state_with(&["a", "b", "c"]);
    state.entries[0].status = ObjectStatus::Success;
    state.entries[1].status = ObjectStatus::Running;
    state.current_index = Some(1);
    state.phase = RunPhase::Running;
    state.push_output("hello from b".to_owned());

    let text = render_text(&state, &mut ViewState::default(), 80, 12);

    assert!(text.contains("[✔] a"), "{text}");
    assert!(text.contains("› [▶] b"), "{text}");
    assert!(text.contains("[ ] c"), "{text}");
    assert!(text.contains("Objects 1/3"), "{text}");
    assert!(text.contains("Live Output: b"), "{text}");
    assert!(text.contains("hello from b"), "{text}");
    assert!(text.contains("abort (q)"), "{text}");
}

#[test]
fn output_pane_pins_to_tail() {
    let mut state = state_with(&["a"]);
    state.current_index = Some(0);
    state.phase = RunPhase::Running;
    for i in 0..50 {
        state.push_output(format!("line-{i:02}"));
    }
    let mut view = ViewState::default();

    let text = render_text(&state, &mut view, 80, 12);

    // 12 rows: footer takes one, borders take two.
    assert_eq!(view.output_offset, 41);
    assert!(text.contains("line-49"));
    assert!(text.contains("line-41"));
    assert!(!text.contains("line-40"));
}

#[test]
fn list_scrolls_only_when_current_leaves_window() {
    let names = (0..30).map(|i| format!("obj-{i:02}")).collect::<Vec<String>>();
    let mut state = RunState::new(names);
    state.phase = RunPhase::Running;
    let mut view = ViewState::default();

    state.current_index = Some(5);
    render_text(&state, &mut view, 80, 12);
    assert_eq!(view.list_offset, 0);

    state.current_index = Some(25);
    let text = render_text(&state, &mut view, 80, 12);
    assert_eq!(view.list_offset, 17);
    assert!(text.contains("obj-25"));
    assert!(!text.contains("obj-16"));

    state.current_index = Some(20);
    render_text(&state, &mut view, 80, 12);
    assert_eq!(view.list_offset, 17);
}

#[test]
fn resize_recomputes_list_window() {
    let names = (0..30).map(|i| format!("obj-{i:02}")).collect::<Vec<String>>();
    let mut state = RunState::new(names);
    state.phase = RunPhase::Running;
    state.current_index = Some(29);
    let mut view = ViewState::default();

    render_text(&state, &mut view, 80, 12);
    assert_eq!(view.list_offset, 21);
    let text = render_text(&state, &mut view, 80, 40);
    assert_eq!(view.list_offset, 0);
    assert!(text.contains("obj-00"));
    assert!(text.contains("obj-29"));
}

#[test]
fn failure_prompt_overlays_output() {
    let mut state = state_with(&["a", "bad"]);
    state.entries[0].status = ObjectStatus::Success;
    state.entries[1].status = ObjectStatus::Failed;
    state.entries[1].detail = Some("exit=1".to_owned());
    state.current_index = Some(1);
    state.phase = RunPhase::AwaitingFailureDecision;

    let text = render_text(&state, &mut ViewState::default(), 100, 14);

    assert!(text.contains("[✖] bad"), "{text}");
    assert!(
        text.contains("Command failed (exit=1). (s)kip to next object or (e)xit?"),
        "{text}"
    );
    assert!(text.contains("skip (s)  |  exit (e)"), "{text}");
}

#[test]
fn final_screen_waits_for_any_key() {
    let mut state = state_with(&["a"]);
    state.entries[0].status = ObjectStatus::Success;
    state.current_index = Some(0);
    state.phase = RunPhase::Completed;

    let text = render_text(&state, &mut ViewState::default(), 100, 14);

    assert!(
        text.contains("Execution finished successfully. Press any key to exit."),
        "{text}"
    );
}

#[test]
fn tiny_terminal_falls_back_to_text() {
    let mut state = state_with(&["a", "b"]);
    state.current_index = Some(0);
    state.entries[0].status = ObjectStatus::Running;
    state.phase = RunPhase::Running;

    let text = render_text(&state, &mut ViewState::default(), 30, 5);

    assert!(text.contains("sweep 0/2"), "{text}");
    assert!(text.contains("terminal too small"), "{text}");
}

#[test]
fn notice_replaces_footer() {
    let mut state = state_with(&["a"]);
    state.current_index = Some(0);
    state.phase = RunPhase::Running;
    let mut view = ViewState {
        notice: Some("Aborting: stopping the running job...".to_owned()),
        ..ViewState::default()
    };

    let text = render_text(&state, &mut view, 80, 10);

    assert!(text.contains("Aborting: stopping the running job..."));
    assert!(!text.contains("abort (q)"));
}

#[test]
fn failure_prompt_leaves_failed_entry_visible() {
    let names = (0..30).map(|i| format!("obj-{i:02}")).collect::<Vec<String>>();
    let mut state = RunState::new(names);
    for entry in state.entries.iter_mut().take(12) {
        entry.status = ObjectStatus::Success;
    }
    state.entries[12].status = ObjectStatus::Failed;
    state.current_index = Some(12);
    state.phase = RunPhase::AwaitingFailureDecision;

    let text = render_text(&state, &mut ViewState::default(), 80, 12);

    assert!(text.contains("[✖] obj-12"), "{text}");
    assert!(text.contains("obj-11"), "{text}");
    assert!(text.contains("Command failed. (s)kip"), "{text}");
}
