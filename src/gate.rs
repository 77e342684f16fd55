//! Blocking gate for the primary unit.
//!
//! Workers are paused by signal delivery; the primary unit instead parks
//! itself here voluntarily and is released by whichever worker calls
//! [`MainGate::unpark`].

use parking_lot::{Condvar, Mutex};

/// Mutex/condition pair with no payload: "parked" while a wait is in
/// progress, "free" otherwise.
pub struct MainGate {
    lock: Mutex<()>,
    cond: Condvar,
}

impl MainGate {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Blocks the calling thread until another thread calls [`unpark`].
    ///
    /// Intended for the primary unit only; callers must ensure at most one
    /// outstanding park.
    ///
    /// [`unpark`]: MainGate::unpark
    pub fn park(&self) {
        let mut guard = self.lock.lock();
        self.cond.wait(&mut guard);
    }

    /// Releases a parked thread. The wakeup is lost if no one is parked:
    /// there is no latch, so an early unpark never causes a later spurious
    /// release.
    pub fn unpark(&self) {
        self.cond.notify_one();
    }
}

impl Default for MainGate {
    fn default() -> Self {
        Self::new()
    }
}
