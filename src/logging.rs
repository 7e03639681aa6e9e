//! Diagnostic logging via `tracing`.
//!
//! Level priority: `--log-level`, then `SWEEP_LOG`, then `warn`. Output goes
//! to stderr, except while the TUI owns the screen: then it is held in
//! memory and written out once the terminal is restored.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::Level;

use crate::cli::LogLevel;

static HOLDING: AtomicBool = AtomicBool::new(false);
static HELD: Mutex<Vec<u8>> = Mutex::new(Vec::new());
static DROPPED: AtomicUsize = AtomicUsize::new(0);

/// Held log output is capped; the oldest whole lines go first.
const MAX_HELD_BYTES: usize = 256 * 1024;

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(cli_level: Option<LogLevel>) {
    let level = match cli_level {
        Some(level) => level.as_tracing(),
        None => std::env::var("SWEEP_LOG")
            .ok()
            .and_then(|value| parse_level(&value))
            .unwrap_or(Level::WARN),
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_writer(|| DeferredStderr)
        .try_init();
}

pub(crate) fn parse_level(raw: &str) -> Option<Level> {
    match raw.trim().to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

pub(crate) fn hold_stderr() {
    HOLDING.store(true, Ordering::SeqCst);
}

pub(crate) fn release_stderr() {
    HOLDING.store(false, Ordering::SeqCst);
    let held = std::mem::take(&mut *HELD.lock().unwrap_or_else(PoisonError::into_inner));
    let dropped = DROPPED.swap(0, Ordering::SeqCst);
    if held.is_empty() && dropped == 0 {
        return;
    }
    let mut stderr = io::stderr().lock();
    if dropped > 0 {
        let _ = writeln!(stderr, "[sweep] {dropped} bytes of older log output were dropped");
    }
    let _ = stderr.write_all(&held);
    let _ = stderr.flush();
}

/// Drops whole lines from the front of `held` until it fits in `max`.
/// Returns the number of bytes removed.
fn trim_held(held: &mut Vec<u8>, max: usize) -> usize {
    if held.len() <= max {
        return 0;
    }
    let excess = held.len() - max;
    let cut = held[excess..]
        .iter()
        .position(|byte| *byte == b'\n')
        .map_or(held.len(), |pos| excess + pos + 1);
    held.drain(..cut);
    cut
}

struct DeferredStderr;

impl Write for DeferredStderr {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if HOLDING.load(Ordering::SeqCst) {
            let mut held = HELD.lock().unwrap_or_else(PoisonError::into_inner);
            held.extend_from_slice(buf);
            let removed = trim_held(&mut held, MAX_HELD_BYTES);
            if removed > 0 {
                DROPPED.fetch_add(removed, Ordering::SeqCst);
            }
            return Ok(buf.len());
        }
        io::stderr().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if HOLDING.load(Ordering::SeqCst) {
            return Ok(());
        }
        io::stderr().flush()
    }
}
