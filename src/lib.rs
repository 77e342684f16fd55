//! Cooperative suspend/resume control over a fixed pool of OS threads.
//!
//! Any caller holding a [`UnitId`] can pause that unit mid-flight and resume
//! it later; the unit's own code never participates in the decision. Pausing
//! rides on directed POSIX signals: a PAUSE signal interrupts the target,
//! whose pre-installed handler acknowledges the interruption and then
//! suspends the thread until a RESUME signal arrives, at which point control
//! returns exactly where it left off.
//!
//! The [`Controller`] tracks which units are running or paused and serializes
//! every transition behind a single lock. The controlling thread itself can
//! be parked and later released by a worker through the [`MainGate`], which
//! is symmetric to worker pausing but voluntary (no signal delivery). The
//! [`tick`] module is an optional interval notifier the controller does not
//! depend on for correctness.

pub mod controller;
pub mod gate;
pub mod registry;
pub mod signals;
pub mod supervisor;
pub mod tick;

pub use controller::{Controller, LockPoisoned, ResumeError, StopError};
pub use gate::MainGate;
pub use registry::{Membership, Registry, UnitId};
pub use supervisor::spawn_pool;
pub use tick::{set_tick_callback, Ticker};
