use std::sync::{mpsc, Arc, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use threadgate::{spawn_pool, Controller, Membership, ResumeError, StopError, UnitId};

type PrimaryJob = Box<dyn FnOnce(&Controller) + Send>;

/// Signal dispositions and the pause handshake are process-wide, so every
/// test shares one controller. A dedicated thread owns the primary role and
/// executes jobs sent to it, which lets tests exercise the primary
/// park/release path from the thread that is actually the primary.
struct Harness {
    controller: Arc<Controller>,
    jobs: mpsc::Sender<PrimaryJob>,
}

impl Harness {
    fn get() -> &'static Harness {
        static INSTANCE: OnceLock<Harness> = OnceLock::new();
        INSTANCE.get_or_init(Harness::new)
    }

    fn new() -> Self {
        let (controller_tx, controller_rx) = mpsc::channel();
        let (job_tx, job_rx) = mpsc::channel::<PrimaryJob>();

        thread::Builder::new()
            .name("primary".into())
            .spawn(move || {
                let controller = Arc::new(Controller::new().expect("installing signal handlers"));
                controller_tx
                    .send(Arc::clone(&controller))
                    .expect("delivering the controller to the harness");
                for job in job_rx {
                    job(&controller);
                }
            })
            .expect("spawning the primary thread");

        let controller = controller_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("primary thread failed to start");
        Harness {
            controller,
            jobs: job_tx,
        }
    }

    fn on_primary(&self, job: impl FnOnce(&Controller) + Send + 'static) {
        self.jobs.send(Box::new(job)).expect("primary thread is gone");
    }
}

/// Workload that never finishes: sleeps in small slices so pause signals
/// always find the unit at an interruptible point.
fn idle_workload(_index: usize) {
    loop {
        thread::sleep(Duration::from_millis(5));
    }
}

fn pool(count: usize) -> (&'static Harness, Vec<UnitId>) {
    let harness = Harness::get();
    let units = spawn_pool(&harness.controller, count, idle_workload)
        .expect("registering units");
    assert_eq!(units.len(), count, "pool creation lost units");
    (harness, units)
}

#[test]
fn fresh_pool_is_fully_running() {
    let (harness, units) = pool(20);
    for &unit in &units {
        assert_eq!(
            harness.controller.membership(unit).unwrap(),
            Some(Membership::Running),
            "freshly created unit {unit} is not running"
        );
    }
}

#[test]
fn stop_resume_round_trip() {
    let (harness, units) = pool(1);
    let unit = units[0];
    let controller = &harness.controller;

    controller.stop(unit).expect("stopping a running unit");
    assert_eq!(controller.membership(unit).unwrap(), Some(Membership::Paused));

    controller.resume(unit).expect("resuming a paused unit");
    assert_eq!(controller.membership(unit).unwrap(), Some(Membership::Running));

    // A resumed unit is stoppable again.
    controller.stop(unit).expect("stopping a resumed unit");
    assert_eq!(controller.membership(unit).unwrap(), Some(Membership::Paused));

    controller.resume(unit).expect("final cleanup resume");
}

#[test]
fn redundant_transitions_are_rejected() {
    let (harness, units) = pool(1);
    let unit = units[0];
    let controller = &harness.controller;

    assert_eq!(controller.resume(unit), Err(ResumeError::AlreadyRunning));
    assert_eq!(controller.membership(unit).unwrap(), Some(Membership::Running));

    controller.stop(unit).expect("stopping a running unit");
    assert_eq!(controller.stop(unit), Err(StopError::AlreadyPaused));
    assert_eq!(controller.membership(unit).unwrap(), Some(Membership::Paused));

    controller.resume(unit).expect("resuming a paused unit");
    assert_eq!(controller.resume(unit), Err(ResumeError::AlreadyRunning));
    assert_eq!(controller.membership(unit).unwrap(), Some(Membership::Running));
}

#[test]
fn stop_then_immediate_resume_never_strands_the_unit() {
    let (harness, units) = pool(1);
    let unit = units[0];
    let controller = &harness.controller;

    // If a resume could outrun the pause taking effect, some iteration would
    // leave the unit parked forever and the next stop would hang on the
    // rendezvous instead of completing.
    for round in 0..25 {
        controller
            .stop(unit)
            .unwrap_or_else(|err| panic!("stop failed in round {round}: {err}"));
        controller
            .resume(unit)
            .unwrap_or_else(|err| panic!("resume failed in round {round}: {err}"));
    }
    assert_eq!(controller.membership(unit).unwrap(), Some(Membership::Running));
}

#[test]
fn end_to_end_three_unit_scenario() {
    let (harness, units) = pool(3);
    let controller = &harness.controller;

    for &unit in &units {
        assert_eq!(controller.membership(unit).unwrap(), Some(Membership::Running));
    }

    controller.stop(units[0]).expect("stopping unit 0");
    assert_eq!(
        controller.membership(units[0]).unwrap(),
        Some(Membership::Paused)
    );
    let snapshot = harness.controller.snapshot().unwrap();
    assert!(snapshot.units(Membership::Paused).contains(&units[0]));
    assert!(!snapshot.units(Membership::Running).contains(&units[0]));
    assert_eq!(
        controller.membership(units[1]).unwrap(),
        Some(Membership::Running)
    );
    assert_eq!(
        controller.membership(units[2]).unwrap(),
        Some(Membership::Running)
    );

    controller.resume(units[0]).expect("resuming unit 0");
    for &unit in &units {
        assert_eq!(controller.membership(unit).unwrap(), Some(Membership::Running));
    }
}

#[test]
fn primary_parks_until_a_worker_releases_it() {
    let harness = Harness::get();
    let controller = Arc::clone(&harness.controller);
    let primary = controller.primary();

    let (ready_tx, ready_rx) = mpsc::channel();
    let (parked_tx, parked_rx) = mpsc::channel();
    harness.on_primary(move |c| {
        let started = Instant::now();
        ready_tx.send(()).expect("reporting readiness");
        c.stop(c.primary()).expect("parking the primary");
        parked_tx
            .send(started.elapsed())
            .expect("reporting the release");
    });

    ready_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("primary never reached its parking job");
    thread::sleep(Duration::from_millis(150));

    controller.resume(primary).expect("releasing the primary");
    let parked_for = parked_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("primary was never released");
    assert!(
        parked_for >= Duration::from_millis(100),
        "primary returned after {parked_for:?} without waiting for its release"
    );

    // The primary is asymmetric: it never appears in the registry.
    assert_eq!(controller.membership(primary).unwrap(), None);
}
