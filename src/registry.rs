//! Membership bookkeeping for execution units.
//!
//! Two disjoint sets over unit handles, `running` and `paused`. This is a
//! pure data structure: it never blocks or performs I/O, and it relies on the
//! controller's lock for synchronization rather than carrying one of its own.

use std::collections::BTreeSet;
use std::fmt;

use nix::sys::pthread::{pthread_self, Pthread};

/// Opaque identifier for one schedulable execution unit.
///
/// Wraps the POSIX thread id of the unit. Handles are compared by equality;
/// the controller distinguishes one handle as the *primary* unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(Pthread);

impl UnitId {
    /// Handle of the calling thread.
    pub fn current() -> Self {
        UnitId(pthread_self())
    }

    pub fn from_raw(raw: Pthread) -> Self {
        UnitId(raw)
    }

    pub fn as_raw(&self) -> Pthread {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Which of the two registry sets a unit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Running,
    Paused,
}

impl Membership {
    fn opposite(self) -> Membership {
        match self {
            Membership::Running => Membership::Paused,
            Membership::Paused => Membership::Running,
        }
    }
}

/// The two membership sets. A unit appears in at most one set at any time.
///
/// Ordered sets keep iteration deterministic for diagnostics; the order
/// itself carries no semantic weight.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    running: BTreeSet<UnitId>,
    paused: BTreeSet<UnitId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, membership: Membership) -> &BTreeSet<UnitId> {
        match membership {
            Membership::Running => &self.running,
            Membership::Paused => &self.paused,
        }
    }

    fn set_mut(&mut self, membership: Membership) -> &mut BTreeSet<UnitId> {
        match membership {
            Membership::Running => &mut self.running,
            Membership::Paused => &mut self.paused,
        }
    }

    pub fn contains(&self, membership: Membership, unit: UnitId) -> bool {
        self.set(membership).contains(&unit)
    }

    /// Idempotent add: inserting a present handle never creates a second entry.
    pub fn insert(&mut self, membership: Membership, unit: UnitId) {
        self.set_mut(membership).insert(unit);
    }

    /// No-op if the handle is absent.
    pub fn remove(&mut self, membership: Membership, unit: UnitId) {
        self.set_mut(membership).remove(&unit);
    }

    /// Moves `unit` into `dest`, leaving it in exactly the destination set.
    pub fn move_to(&mut self, dest: Membership, unit: UnitId) {
        self.set_mut(dest.opposite()).remove(&unit);
        self.set_mut(dest).insert(unit);
    }

    /// The set `unit` currently belongs to, if any.
    pub fn membership(&self, unit: UnitId) -> Option<Membership> {
        if self.running.contains(&unit) {
            Some(Membership::Running)
        } else if self.paused.contains(&unit) {
            Some(Membership::Paused)
        } else {
            None
        }
    }

    pub fn len(&self, membership: Membership) -> usize {
        self.set(membership).len()
    }

    /// Sorted snapshot of one set, for diagnostics.
    pub fn units(&self, membership: Membership) -> Vec<UnitId> {
        self.set(membership).iter().copied().collect()
    }
}
