//! Ctrl-C handling for the plain front-end. The TUI reads Ctrl-C as a key
//! in raw mode; the plain front-end gets SIGINT instead and turns it into
//! an abort so the report is still printed.

use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(unix)]
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};
use tracing::{debug, warn};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_sigint(_: i32) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Returns whether SIGINT arrived since the last call.
pub(crate) fn take_interrupt() -> bool {
    INTERRUPTED.swap(false, Ordering::SeqCst)
}

/// Routes SIGINT to [`take_interrupt`] until dropped, then restores the
/// previous disposition.
pub(crate) struct InterruptGuard {
    #[cfg(unix)]
    previous: Option<SigAction>,
}

impl InterruptGuard {
    pub(crate) fn install() -> Self {
        INTERRUPTED.store(false, Ordering::SeqCst);
        #[cfg(unix)]
        {
            // No SA_RESTART: a blocked prompt read must wake up on Ctrl-C.
            let action = SigAction::new(
                SigHandler::Handler(on_sigint),
                SaFlags::empty(),
                SigSet::empty(),
            );
            let previous = match unsafe { signal::sigaction(Signal::SIGINT, &action) } {
                Ok(previous) => Some(previous),
                Err(err) => {
                    warn!(error = %err, "cannot install SIGINT handler");
                    None
                }
            };
            debug!(installed = previous.is_some(), "plain interrupt handler");
            Self { previous }
        }
        #[cfg(not(unix))]
        {
            Self {}
        }
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            if let Some(previous) = self.previous.take() {
                let _ = unsafe { signal::sigaction(Signal::SIGINT, &previous) };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interrupt_flag_is_consumed_once() {
        INTERRUPTED.store(true, Ordering::SeqCst);
        assert!(take_interrupt());
        assert!(!take_interrupt());
    }
}
