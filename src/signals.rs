//! Out-of-band PAUSE/RESUME delivery and the per-unit handler logic.
//!
//! Two directed signal channels exist per process: PAUSE (`SIGUSR1`) stops a
//! unit's forward progress and RESUME (`SIGUSR2`) releases it. Delivery goes
//! through `pthread_kill`, so a unit can be interrupted at an arbitrary point
//! without its cooperation. The handlers installed here are the only code
//! that runs inside an interrupted unit; they are restricted to flag stores
//! and `sigsuspend` (no allocation, no logging, no registry access).

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::errno::Errno;
use nix::libc::c_int;
use nix::sys::pthread::pthread_kill;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::registry::UnitId;

/// Directed at a unit to stop its forward progress.
pub const PAUSE_SIGNAL: Signal = Signal::SIGUSR1;
/// Directed at a paused unit to release it.
pub const RESUME_SIGNAL: Signal = Signal::SIGUSR2;
/// Periodic tick notification; stays deliverable while a unit is paused.
pub const TICK_SIGNAL: Signal = Signal::SIGALRM;

/// Set by the PAUSE handler once the target has committed to suspending.
/// Shared across the controller and the target only during the in-flight
/// handshake; the controller clears it as soon as it observes the store.
static PAUSE_ACKNOWLEDGED: AtomicBool = AtomicBool::new(false);

thread_local! {
    /// Set by the RESUME handler in the thread it interrupted, so the PAUSE
    /// handler can tell a real release apart from a tick waking `sigsuspend`.
    static RESUME_RECEIVED: Cell<bool> = const { Cell::new(false) };
}

extern "C" fn pause_handler(_sig: c_int) {
    // RESUME is blocked for the duration of this handler (sigaction mask), so
    // a resume landing between the acknowledgment and the suspension stays
    // pending until the suspend mask unblocks it.
    let mut suspend_mask = SigSet::all();
    suspend_mask.remove(RESUME_SIGNAL);
    suspend_mask.remove(TICK_SIGNAL);

    RESUME_RECEIVED.with(|received| received.set(false));
    PAUSE_ACKNOWLEDGED.store(true, Ordering::SeqCst);

    while !RESUME_RECEIVED.with(|received| received.get()) {
        // Always "fails" with EINTR once an unblocked signal is handled.
        let _ = suspend_mask.suspend();
    }
}

extern "C" fn resume_handler(_sig: c_int) {
    RESUME_RECEIVED.with(|received| received.set(true));
}

/// Registers the PAUSE and RESUME dispositions process-wide.
///
/// Must run before any worker unit starts; `Controller::new` takes care of
/// that. Re-installation is harmless.
pub fn install_handlers() -> Result<(), Errno> {
    let mut during_pause = SigSet::empty();
    during_pause.add(RESUME_SIGNAL);

    let pause = SigAction::new(
        SigHandler::Handler(pause_handler),
        SaFlags::empty(),
        during_pause,
    );
    let resume = SigAction::new(
        SigHandler::Handler(resume_handler),
        SaFlags::empty(),
        SigSet::empty(),
    );

    unsafe {
        sigaction(PAUSE_SIGNAL, &pause)?;
        sigaction(RESUME_SIGNAL, &resume)?;
    }
    Ok(())
}

/// Delivers `signal` to the unit's thread. Fails with `ESRCH` when the handle
/// no longer names a live thread.
pub fn deliver(unit: UnitId, signal: Signal) -> Result<(), Errno> {
    pthread_kill(unit.as_raw(), signal)
}

/// Rendezvous for `stop`: spins until the target's PAUSE handler has set the
/// acknowledgment flag, then clears it for the next handshake. The caller
/// must hold the controller lock, which is what serializes handshakes.
pub(crate) fn await_pause_acknowledged() {
    while !PAUSE_ACKNOWLEDGED.swap(false, Ordering::AcqRel) {
        std::hint::spin_loop();
    }
}
