//! Periodic tick notifier.
//!
//! External collaborator: the controller does not depend on it for
//! correctness. Ticks arrive as process-directed `SIGALRM`, which the pause
//! handler's suspend mask leaves open, so even paused units keep observing
//! them. A single callback slot can be driven from the tick handler.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use nix::errno::Errno;
use nix::libc::c_int;
use nix::sys::signal::{kill, sigaction, SaFlags, SigAction, SigHandler, SigSet};
use nix::unistd::Pid;

use crate::signals::TICK_SIGNAL;

static TICK_COUNT: AtomicU64 = AtomicU64::new(0);
/// Holds a `fn()` written by `set_tick_callback`, or 0 when unset.
static TICK_CALLBACK: AtomicUsize = AtomicUsize::new(0);

/// Fills the single tick callback slot. The callback runs in signal-handler
/// context and must restrict itself accordingly.
pub fn set_tick_callback(callback: fn()) {
    TICK_CALLBACK.store(callback as usize, Ordering::Release);
}

extern "C" fn tick_handler(_sig: c_int) {
    TICK_COUNT.fetch_add(1, Ordering::Relaxed);
    let slot = TICK_CALLBACK.load(Ordering::Acquire);
    if slot != 0 {
        // The slot only ever holds a fn() stored by set_tick_callback.
        let callback: fn() = unsafe { std::mem::transmute(slot) };
        callback();
    }
}

/// Interval notifier: raises the tick signal every `interval` until dropped.
pub struct Ticker {
    shutdown: Arc<AtomicBool>,
    notifier: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn start(interval: Duration) -> Result<Self, Errno> {
        let action = SigAction::new(
            SigHandler::Handler(tick_handler),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        unsafe {
            sigaction(TICK_SIGNAL, &action)?;
        }

        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);
        let notifier = thread::Builder::new()
            .name("tick-notifier".into())
            .spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    thread::sleep(interval);
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    let _ = kill(Pid::this(), TICK_SIGNAL);
                }
            })
            .map_err(|_| Errno::EAGAIN)?;

        Ok(Self {
            shutdown,
            notifier: Some(notifier),
        })
    }

    /// Ticks observed since process start.
    pub fn ticks() -> u64 {
        TICK_COUNT.load(Ordering::Relaxed)
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        if let Some(notifier) = self.notifier.take() {
            let _ = notifier.join();
        }
    }
}
