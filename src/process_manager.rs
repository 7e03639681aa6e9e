use std::fmt;
use std::io::{BufRead, BufReader, ErrorKind, Read};
#[cfg(unix)]
use std::os::unix::process::CommandExt;
#[cfg(unix)]
use std::os::unix::process::ExitStatusExt;
use std::process::{Child, Command as ProcessCommand, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

#[cfg(unix)]
use nix::sys::signal::{kill, Signal};
#[cfg(unix)]
use nix::unistd::{setpgid, Pid};
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(3);
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(40);
const OUTPUT_DRAIN_WINDOW: Duration = Duration::from_millis(250);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("cannot start an empty command")]
    EmptyCommand,
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("process `{program}` missing stdout/stderr pipe")]
    MissingStdio { program: String },
}

/// How a child process ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Exited(i32),
    Signaled(i32),
    Unknown(String),
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Exited(0))
    }

    fn from_status(status: ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitOutcome::Exited(code);
        }
        #[cfg(unix)]
        {
            if let Some(signal) = status.signal() {
                return ExitOutcome::Signaled(signal);
            }
        }
        ExitOutcome::Unknown("exit=unknown".to_owned())
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Exited(code) => write!(f, "exit={code}"),
            ExitOutcome::Signaled(signal) => write!(f, "signal={signal}"),
            ExitOutcome::Unknown(detail) => f.write_str(detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// One line of merged stdout/stderr, without the trailing newline.
    Line(String),
    /// Always the last event of a handle.
    Exit(ExitOutcome),
}

/// Result of [`ProcessHandle::cancel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The process had already exited on its own before the signal was sent.
    AlreadyExited(ExitOutcome),
    Terminated { outcome: ExitOutcome, forced: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    pub grace_period: Duration,
    /// Put each child in its own process group so cancellation reaches the
    /// whole tree. Leave it off when the terminal's Ctrl-C should reach the
    /// child directly.
    pub new_process_group: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
            new_process_group: true,
        }
    }
}

/// Launches one child process at a time with merged, line-oriented output.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner {
    config: RunnerConfig,
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> RunnerConfig {
        self.config
    }

    pub fn start(&self, argv: &[String]) -> Result<ProcessHandle, ProcessError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(ProcessError::EmptyCommand);
        };
        let mut command = ProcessCommand::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            if self.config.new_process_group {
                unsafe {
                    command.pre_exec(|| {
                        setpgid(Pid::from_raw(0), Pid::from_raw(0)).map_err(|error| {
                            std::io::Error::new(ErrorKind::Other, error.to_string())
                        })
                    });
                }
            }
        }

        let mut child = command.spawn().map_err(|source| ProcessError::Spawn {
            program: program.clone(),
            source,
        })?;
        debug!(pid = child.id(), program = %program, "spawned child process");

        let (stdout, stderr) = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => (stdout, stderr),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(ProcessError::MissingStdio {
                    program: program.clone(),
                });
            }
        };

        let (events_tx, events_rx) = mpsc::channel::<ProcessEvent>();
        let discard = Arc::new(AtomicBool::new(false));
        let open_streams = Arc::new(AtomicUsize::new(2));
        spawn_line_reader(stdout, events_tx.clone(), discard.clone(), open_streams.clone());
        spawn_line_reader(stderr, events_tx.clone(), discard.clone(), open_streams.clone());

        let child = Arc::new(Mutex::new(child));
        spawn_exit_watcher(child.clone(), events_tx, open_streams);

        Ok(ProcessHandle {
            child,
            events_rx,
            discard,
            group: self.config.new_process_group,
            grace_period: self.config.grace_period,
            exit: None,
        })
    }
}

fn spawn_line_reader<R>(
    stream: R,
    tx: Sender<ProcessEvent>,
    discard: Arc<AtomicBool>,
    open_streams: Arc<AtomicUsize>,
) where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for chunk in reader.split(b'\n').map_while(Result::ok) {
            if discard.load(Ordering::SeqCst) {
                continue;
            }
            let mut line = String::from_utf8_lossy(&chunk).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            if tx.send(ProcessEvent::Line(line)).is_err() {
                break;
            }
        }
        open_streams.fetch_sub(1, Ordering::SeqCst);
    });
}

fn spawn_exit_watcher(
    child: Arc<Mutex<Child>>,
    tx: Sender<ProcessEvent>,
    open_streams: Arc<AtomicUsize>,
) {
    thread::spawn(move || {
        let outcome = loop {
            let status = lock_child(&child).try_wait();
            match status {
                Ok(Some(status)) => break ExitOutcome::from_status(status),
                Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
                Err(err) => break ExitOutcome::Unknown(format!("wait-error={err}")),
            }
        };
        // Readers normally hit EOF right after exit; a grandchild holding the
        // pipes open must not stall the job.
        let deadline = Instant::now() + OUTPUT_DRAIN_WINDOW;
        while open_streams.load(Ordering::SeqCst) > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        let _ = tx.send(ProcessEvent::Exit(outcome));
    });
}

fn lock_child(child: &Mutex<Child>) -> MutexGuard<'_, Child> {
    child.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One in-flight child. Dropping the handle kills and reaps the child if it
/// is still running.
pub struct ProcessHandle {
    child: Arc<Mutex<Child>>,
    events_rx: Receiver<ProcessEvent>,
    discard: Arc<AtomicBool>,
    group: bool,
    grace_period: Duration,
    exit: Option<ExitOutcome>,
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("pid", &self.id())
            .field("exit", &self.exit)
            .finish()
    }
}

impl ProcessHandle {
    pub fn id(&self) -> u32 {
        lock_child(&self.child).id()
    }

    pub fn exit_outcome(&self) -> Option<&ExitOutcome> {
        self.exit.as_ref()
    }

    pub fn next_event_timeout(&mut self, timeout: Duration) -> Option<ProcessEvent> {
        let event = match self.events_rx.recv_timeout(timeout) {
            Ok(event) => event,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
        };
        self.observe(event)
    }

    pub fn try_next_event(&mut self) -> Option<ProcessEvent> {
        let event = match self.events_rx.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => return None,
        };
        self.observe(event)
    }

    fn observe(&mut self, event: ProcessEvent) -> Option<ProcessEvent> {
        if self.discard.load(Ordering::SeqCst) {
            if let ProcessEvent::Exit(outcome) = &event {
                self.exit = Some(outcome.clone());
            }
            return None;
        }
        if let ProcessEvent::Exit(outcome) = &event {
            self.exit = Some(outcome.clone());
        }
        Some(event)
    }

    /// Blocking iterator over output lines; ends once the process has exited
    /// and its output is drained.
    pub fn lines(&mut self) -> Lines<'_> {
        Lines { handle: self }
    }

    /// Blocks until the process exits. Unread output lines are dropped.
    pub fn wait(&mut self) -> ExitOutcome {
        if let Some(outcome) = &self.exit {
            return outcome.clone();
        }
        while let Ok(event) = self.events_rx.recv() {
            if let ProcessEvent::Exit(outcome) = event {
                self.exit = Some(outcome.clone());
                return outcome;
            }
        }
        // The watcher always sends Exit before hanging up; this is reachable
        // only if it panicked.
        let outcome = match lock_child(&self.child).wait() {
            Ok(status) => ExitOutcome::from_status(status),
            Err(err) => ExitOutcome::Unknown(format!("wait-error={err}")),
        };
        self.exit = Some(outcome.clone());
        outcome
    }

    /// Sends SIGTERM, waits up to the grace period, then SIGKILLs. Output
    /// arriving after this call is discarded. If the process had already
    /// exited, its own outcome is returned untouched.
    pub fn cancel(&mut self) -> CancelOutcome {
        self.discard.store(true, Ordering::SeqCst);
        if let Some(outcome) = self.exit.clone() {
            return CancelOutcome::AlreadyExited(outcome);
        }
        if let Ok(Some(status)) = lock_child(&self.child).try_wait() {
            let outcome = ExitOutcome::from_status(status);
            self.exit = Some(outcome.clone());
            return CancelOutcome::AlreadyExited(outcome);
        }

        self.signal(TerminationSignal::Term);
        let deadline = Instant::now() + self.grace_period;
        while Instant::now() < deadline {
            if let Ok(Some(status)) = lock_child(&self.child).try_wait() {
                let outcome = ExitOutcome::from_status(status);
                self.exit = Some(outcome.clone());
                debug!(%outcome, "child exited after SIGTERM");
                return CancelOutcome::Terminated {
                    outcome,
                    forced: false,
                };
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }

        warn!(pid = self.id(), "child ignored SIGTERM, forcing termination");
        self.signal(TerminationSignal::Kill);
        let outcome = match lock_child(&self.child).wait() {
            Ok(status) => ExitOutcome::from_status(status),
            Err(err) => ExitOutcome::Unknown(format!("wait-error={err}")),
        };
        self.exit = Some(outcome.clone());
        CancelOutcome::Terminated {
            outcome,
            forced: true,
        }
    }

    fn signal(&self, signal: TerminationSignal) {
        let mut child = lock_child(&self.child);
        #[cfg(unix)]
        {
            let signal = match signal {
                TerminationSignal::Term => Signal::SIGTERM,
                TerminationSignal::Kill => Signal::SIGKILL,
            };
            let _ = signal_child(&mut child, signal, self.group);
        }
        #[cfg(not(unix))]
        {
            let _ = signal;
            let _ = child.kill();
        }
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        let mut child = lock_child(&self.child);
        if matches!(child.try_wait(), Ok(None)) {
            #[cfg(unix)]
            {
                let _ = signal_child(&mut child, Signal::SIGKILL, self.group);
            }
            #[cfg(not(unix))]
            {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

pub struct Lines<'a> {
    handle: &'a mut ProcessHandle,
}

impl Iterator for Lines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.handle.exit.is_some() {
            return None;
        }
        loop {
            let event = self.handle.events_rx.recv().ok()?;
            match self.handle.observe(event) {
                Some(ProcessEvent::Line(line)) => return Some(line),
                Some(ProcessEvent::Exit(_)) => return None,
                None if self.handle.exit.is_some() => return None,
                None => continue,
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TerminationSignal {
    Term,
    Kill,
}

#[cfg(unix)]
fn signal_child(child: &mut Child, signal: Signal, group: bool) -> Result<(), nix::Error> {
    let pid = child.id() as i32;
    if pid <= 0 {
        return Ok(());
    }
    if group {
        kill(Pid::from_raw(-pid), signal)
    } else {
        kill(Pid::from_raw(pid), signal)
    }
}

#[cfg(unix)]
pub fn process_exists(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}
