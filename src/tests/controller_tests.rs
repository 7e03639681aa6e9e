use super::*;
use crate::process_manager::{process_exists, RunnerConfig};

fn controller(template: &str, objects: &[&str]) -> JobController {
    let template = CommandTemplate::parse(template).expect("template");
    let runner = ProcessRunner::new(RunnerConfig {
        grace_period: Duration::from_millis(500),
        new_process_group: true,
    });
    JobController::new(
        template,
        objects.iter().map(|object| (*object).to_owned()).collect(),
        runner,
    )
}

fn drive_until<F>(controller: &mut JobController, done: F) -> Vec<String>
where
    F: Fn(&RunState) -> bool,
{
    let mut lines = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done(controller.state()) {
        assert!(Instant::now() < deadline, "controller did not settle");
        lines.extend(controller.poll(Duration::from_millis(20)).lines);
    }
    lines
}

fn statuses(controller: &JobController) -> Vec<ObjectStatus> {
    controller
        .state()
        .entries
        .iter()
        .map(|entry| entry.status)
        .collect()
}

#[test]
fn echo_runs_each_object_in_order_and_completes() {
    let mut controller = controller("echo $object", &["a", "b"]);
    controller.start();
    let lines = drive_until(&mut controller, |state| state.phase.is_terminal());

    assert_eq!(lines, vec!["a", "b"]);
    assert_eq!(controller.phase(), RunPhase::Completed);
    assert_eq!(
        statuses(&controller),
        vec![ObjectStatus::Success, ObjectStatus::Success]
    );
    assert_eq!(controller.state().current_index, Some(1));
}

#[test]
fn every_object_is_visited_exactly_once() {
    let objects = ["one", "two", "three", "four", "five"];
    let mut controller = controller("echo $object", &objects);
    controller.start();
    let lines = drive_until(&mut controller, |state| state.phase.is_terminal());
    assert_eq!(lines, objects);
    assert_eq!(controller.state().count(ObjectStatus::Success), objects.len());
}

#[test]
fn failure_pauses_and_skip_moves_forward() {
    let mut controller = controller("sh -c 'test \"$1\" != bad' sh $object", &["a", "bad", "c"]);
    controller.start();
    drive_until(&mut controller, |state| {
        state.phase == RunPhase::AwaitingFailureDecision
    });

    assert_eq!(controller.state().current_index, Some(1));
    assert_eq!(
        statuses(&controller),
        vec![
            ObjectStatus::Success,
            ObjectStatus::Failed,
            ObjectStatus::Pending
        ]
    );
    assert_eq!(controller.state().entries[1].detail.as_deref(), Some("exit=1"));
    assert!(controller.active_pid().is_none());

    controller.handle(ControlEvent::Skip);
    drive_until(&mut controller, |state| state.phase.is_terminal());

    assert_eq!(controller.phase(), RunPhase::Completed);
    assert_eq!(
        statuses(&controller),
        vec![
            ObjectStatus::Success,
            ObjectStatus::Failed,
            ObjectStatus::Success
        ]
    );
}

#[test]
fn exit_on_failure_aborts_and_leaves_rest_pending() {
    let mut controller = controller("sh -c 'exit 3' sh $object", &["a", "b"]);
    controller.start();
    drive_until(&mut controller, |state| {
        state.phase == RunPhase::AwaitingFailureDecision
    });

    controller.handle(ControlEvent::Exit);
    assert_eq!(controller.phase(), RunPhase::Aborted);
    assert_eq!(
        controller.state().abort_reason,
        Some(AbortReason::ExitOnFailure)
    );
    assert_eq!(
        statuses(&controller),
        vec![ObjectStatus::Failed, ObjectStatus::Pending]
    );
}

#[test]
fn abort_kills_running_process_and_keeps_later_entries_pending() {
    let mut controller = controller(
        "sh -c 'echo started; sleep 30' sh $object",
        &["x", "y", "z"],
    );
    controller.start();
    drive_until(&mut controller, |state| {
        state.output.iter().any(|line| line == "started")
    });
    let pid = controller.active_pid().expect("running pid");
    assert!(process_exists(pid));

    controller.handle(ControlEvent::Abort);

    assert_eq!(controller.phase(), RunPhase::Aborted);
    assert_eq!(controller.state().abort_reason, Some(AbortReason::UserAbort));
    assert!(!process_exists(pid), "child left running after abort");
    assert_eq!(controller.state().entries[1].status, ObjectStatus::Pending);
    assert_eq!(controller.state().entries[2].status, ObjectStatus::Pending);
}

#[test]
fn output_is_empty_right_after_advancing() {
    let mut controller = controller("echo line-$object", &["a", "b"]);
    controller.start();
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        assert!(Instant::now() < deadline, "first job never finished");
        let outcome = controller.poll(Duration::from_millis(20));
        if outcome.finished == Some(0) {
            break;
        }
    }
    assert_eq!(controller.state().current_index, Some(1));
    assert!(controller.state().output.is_empty());
}

#[test]
fn spawn_error_fails_job_without_running_state() {
    let mut controller = controller("/nonexistent/sweep-test-binary $object", &["a", "b"]);
    controller.start();

    assert_eq!(controller.phase(), RunPhase::AwaitingFailureDecision);
    let entry = &controller.state().entries[0];
    assert_eq!(entry.status, ObjectStatus::Failed);
    assert!(entry
        .detail
        .as_deref()
        .is_some_and(|detail| detail.contains("failed to start")));
    assert_eq!(controller.state().output.len(), 1);

    controller.handle(ControlEvent::Skip);
    assert_eq!(controller.phase(), RunPhase::AwaitingFailureDecision);
    assert_eq!(controller.state().current_index, Some(1));
    controller.handle(ControlEvent::Skip);
    assert_eq!(controller.phase(), RunPhase::Completed);
}

#[test]
fn decisions_outside_failure_prompt_are_ignored() {
    let mut controller = controller("echo $object", &["a"]);
    controller.handle(ControlEvent::Skip);
    assert_eq!(controller.phase(), RunPhase::Idle);
    controller.start();
    controller.handle(ControlEvent::Exit);
    assert_ne!(controller.phase(), RunPhase::Aborted);
    drive_until(&mut controller, |state| state.phase.is_terminal());
    assert_eq!(controller.phase(), RunPhase::Completed);
}

#[test]
fn object_with_spaces_reaches_child_as_one_argument() {
    let mut controller = controller("sh -c 'echo \"$#:$1\"' sh $object", &["two words; $HOME"]);
    controller.start();
    let lines = drive_until(&mut controller, |state| state.phase.is_terminal());
    assert_eq!(lines, vec!["1:two words; $HOME"]);
}

fn wait_for_exit(pid: u32) {
    let deadline = Instant::now() + Duration::from_secs(5);
    // The child stays a zombie until reaped, so wait on its /proc state.
    while Instant::now() < deadline {
        let stat = std::fs::read_to_string(format!("/proc/{pid}/stat")).unwrap_or_default();
        let state = stat
            .rsplit_once(") ")
            .and_then(|(_, rest)| rest.chars().next());
        if !matches!(state, Some(state) if state != 'Z') {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn abort_after_last_job_exited_counts_as_completion() {
    let mut controller = controller("true $object", &["only"]);
    controller.start();
    let pid = controller.active_pid().expect("running pid");
    wait_for_exit(pid);
    std::thread::sleep(Duration::from_millis(100));

    controller.handle(ControlEvent::Abort);

    assert_eq!(statuses(&controller), vec![ObjectStatus::Success]);
    assert_eq!(controller.phase(), RunPhase::Completed);
    assert_eq!(controller.state().abort_reason, None);
    assert_eq!(controller.state().entries[0].detail.as_deref(), Some("exit=0"));
}

#[test]
fn abort_after_exit_with_work_left_still_aborts() {
    let mut controller = controller("true $object", &["a", "b"]);
    controller.start();
    let pid = controller.active_pid().expect("running pid");
    wait_for_exit(pid);
    std::thread::sleep(Duration::from_millis(100));

    controller.handle(ControlEvent::Abort);

    assert_eq!(
        statuses(&controller),
        vec![ObjectStatus::Success, ObjectStatus::Pending]
    );
    assert_eq!(controller.phase(), RunPhase::Aborted);
    assert_eq!(controller.state().abort_reason, Some(AbortReason::UserAbort));
}

#[test]
fn abort_during_failure_prompt_stops_the_run() {
    let mut controller = controller("sh -c 'exit 1' sh $object", &["a", "b"]);
    controller.start();
    drive_until(&mut controller, |state| {
        state.phase == RunPhase::AwaitingFailureDecision
    });

    controller.handle(ControlEvent::Abort);

    assert_eq!(controller.phase(), RunPhase::Aborted);
    assert_eq!(controller.state().abort_reason, Some(AbortReason::UserAbort));
    assert_eq!(controller.state().entries[1].status, ObjectStatus::Pending);
}
