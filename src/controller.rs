//! The lifecycle controller: registry plus protocol behind `stop`/`resume`.

use std::sync::Mutex;

use log::debug;
use nix::errno::Errno;
use thiserror::Error;

use crate::gate::MainGate;
use crate::registry::{Membership, Registry, UnitId};
use crate::signals::{self, PAUSE_SIGNAL, RESUME_SIGNAL};

/// The controller mutex was poisoned by a panicking holder.
#[derive(Debug, Error)]
#[error("controller lock is poisoned")]
pub struct LockPoisoned;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StopError {
    /// The unit is already a member of `paused`; redundant stops are
    /// rejected, not queued.
    #[error("unit is already paused")]
    AlreadyPaused,
    /// The PAUSE signal could not be delivered (stale or terminated handle).
    #[error("pause signal could not be delivered: {0}")]
    DeliveryFailed(Errno),
    #[error("could not lock the controller mutex")]
    LockFailed,
    /// Retained for surface parity with the reference design; RAII guards
    /// cannot fail to unlock, so this is never produced.
    #[error("could not unlock the controller mutex")]
    UnlockFailed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResumeError {
    /// The unit is already a member of `running`.
    #[error("unit is already running")]
    AlreadyRunning,
    /// The RESUME signal could not be delivered.
    #[error("resume signal could not be delivered: {0}")]
    DeliveryFailed(Errno),
    #[error("could not lock the controller mutex")]
    LockFailed,
    /// Retained for surface parity with the reference design; RAII guards
    /// cannot fail to unlock, so this is never produced.
    #[error("could not unlock the controller mutex")]
    UnlockFailed,
}

/// Orchestrates the registry and the suspend/resume protocol.
///
/// One lock serializes every state transition process-wide. Signal
/// dispositions and the pause handshake flag are process-global, so a single
/// controller per process is the supported configuration.
pub struct Controller {
    registry: Mutex<Registry>,
    gate: MainGate,
    primary: UnitId,
}

impl Controller {
    /// Installs the PAUSE/RESUME handlers and records the calling thread as
    /// the primary unit.
    pub fn new() -> Result<Self, Errno> {
        signals::install_handlers()?;
        Ok(Self {
            registry: Mutex::new(Registry::new()),
            gate: MainGate::new(),
            primary: UnitId::current(),
        })
    }

    /// The distinguished controlling unit. Never a member of the registry;
    /// its pause state lives entirely in the gate.
    pub fn primary(&self) -> UnitId {
        self.primary
    }

    /// Pauses a running unit and does not return until the target is
    /// provably parked.
    ///
    /// For the primary unit this parks the caller on the gate instead: the
    /// primary is never signaled, it blocks voluntarily and must therefore be
    /// the thread making this call.
    pub fn stop(&self, unit: UnitId) -> Result<(), StopError> {
        let mut registry = self.registry.lock().map_err(|_| StopError::LockFailed)?;

        if unit == self.primary {
            debug_assert_eq!(
                UnitId::current(),
                self.primary,
                "stop(primary) must be called by the primary unit"
            );
            // The indefinite block happens outside the critical section.
            drop(registry);
            debug!("parking primary unit {unit}");
            self.gate.park();
            debug!("primary unit {unit} released");
            return Ok(());
        }

        if registry.contains(Membership::Paused, unit) {
            return Err(StopError::AlreadyPaused);
        }

        signals::deliver(unit, PAUSE_SIGNAL).map_err(StopError::DeliveryFailed)?;
        // Rendezvous: a stop that returned must be fully applied before any
        // subsequent resume on the same handle can take effect, so wait here
        // until the target's handler has committed to suspending.
        signals::await_pause_acknowledged();

        registry.move_to(Membership::Paused, unit);
        debug!("unit {unit} moved running -> paused");
        Ok(())
    }

    /// Releases a paused unit.
    ///
    /// For the primary unit this delivers the (no-op) RESUME and unparks the
    /// gate instead of touching the registry.
    pub fn resume(&self, unit: UnitId) -> Result<(), ResumeError> {
        let mut registry = self.registry.lock().map_err(|_| ResumeError::LockFailed)?;

        if unit == self.primary {
            signals::deliver(unit, RESUME_SIGNAL).map_err(ResumeError::DeliveryFailed)?;
            self.gate.unpark();
            debug!("unparked primary unit {unit}");
            return Ok(());
        }

        if registry.contains(Membership::Running, unit) {
            return Err(ResumeError::AlreadyRunning);
        }

        signals::deliver(unit, RESUME_SIGNAL).map_err(ResumeError::DeliveryFailed)?;

        registry.move_to(Membership::Running, unit);
        debug!("unit {unit} moved paused -> running");
        Ok(())
    }

    /// Registers a freshly created worker as running. Supervisor hook;
    /// idempotent.
    pub fn register_running(&self, unit: UnitId) -> Result<(), LockPoisoned> {
        let mut registry = self.registry.lock().map_err(|_| LockPoisoned)?;
        registry.insert(Membership::Running, unit);
        debug!("registered unit {unit} as running");
        Ok(())
    }

    /// The set `unit` currently belongs to, if any. The primary is never a
    /// member of either set.
    pub fn membership(&self, unit: UnitId) -> Result<Option<Membership>, LockPoisoned> {
        let registry = self.registry.lock().map_err(|_| LockPoisoned)?;
        Ok(registry.membership(unit))
    }

    /// `(running, paused)` counts.
    pub fn census(&self) -> Result<(usize, usize), LockPoisoned> {
        let registry = self.registry.lock().map_err(|_| LockPoisoned)?;
        Ok((
            registry.len(Membership::Running),
            registry.len(Membership::Paused),
        ))
    }

    /// Cloned registry state for diagnostics.
    pub fn snapshot(&self) -> Result<Registry, LockPoisoned> {
        let registry = self.registry.lock().map_err(|_| LockPoisoned)?;
        Ok(registry.clone())
    }
}
