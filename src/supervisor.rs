//! Creates the fixed-size pool of worker units.

use std::sync::{mpsc, Arc};
use std::thread;

use log::{info, warn};

use crate::controller::{Controller, LockPoisoned};
use crate::registry::UnitId;

/// Spawns `count` worker threads, each running `workload(index)`, and
/// registers every created unit as running before returning.
///
/// The PAUSE/RESUME handlers are already installed process-wide by the
/// controller's constructor, so every worker starts interruptible. A unit
/// whose thread cannot be created is reported and skipped; the remaining
/// units are still created.
pub fn spawn_pool<F>(
    controller: &Controller,
    count: usize,
    workload: F,
) -> Result<Vec<UnitId>, LockPoisoned>
where
    F: Fn(usize) + Send + Sync + 'static,
{
    let workload = Arc::new(workload);
    let (handle_tx, handle_rx) = mpsc::channel();

    let mut spawned = 0;
    for index in 0..count {
        let handle_tx = handle_tx.clone();
        let workload = Arc::clone(&workload);
        let result = thread::Builder::new()
            .name(format!("unit-{index}"))
            .spawn(move || {
                // Report the handle before any work runs, and drop the sender
                // so the supervisor is not kept waiting for the workload.
                let _ = handle_tx.send(UnitId::current());
                drop(handle_tx);
                workload(index);
            });
        match result {
            Ok(_) => spawned += 1,
            Err(err) => warn!("failed to create unit {index}: {err}"),
        }
    }
    drop(handle_tx);

    let mut units = Vec::with_capacity(spawned);
    while let Ok(unit) = handle_rx.recv() {
        controller.register_running(unit)?;
        units.push(unit);
    }
    info!("created {} of {count} requested units", units.len());
    Ok(units)
}
