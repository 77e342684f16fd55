use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use log::{info, warn};

use threadgate::{spawn_pool, Controller, Ticker};

/// Demo driver: pauses and releases a pool of worker threads in a fixed
/// sequence, including parking the primary thread until a worker releases it.
#[derive(Parser, Debug)]
#[command(author, version, about = "Suspend/resume demo for a pool of worker threads")]
struct Args {
    /// Number of worker units to create
    #[arg(short, long, default_value_t = 20)]
    workers: usize,

    /// How long each workload runs before finishing, in milliseconds
    #[arg(long, default_value_t = 500)]
    hold_ms: u64,

    /// Start the interval notifier with this tick period, in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let controller =
        Arc::new(Controller::new().map_err(|err| eyre!("installing signal handlers: {err}"))?);

    let _ticker = args
        .tick_ms
        .map(|ms| Ticker::start(Duration::from_millis(ms)))
        .transpose()
        .map_err(|err| eyre!("starting the tick notifier: {err}"))?;

    let primary = controller.primary();
    let hold = Duration::from_millis(args.hold_ms);
    let pool_controller = Arc::clone(&controller);
    let units = spawn_pool(&controller, args.workers, move |index| {
        thread::sleep(hold);
        // Simulated work between the pause window and releasing the primary.
        let mut acc = 0u64;
        for i in 0..1_000_000u64 {
            acc = acc.wrapping_add(i);
        }
        info!("unit {index} finished its workload (acc={acc})");
        if let Err(err) = pool_controller.resume(pool_controller.primary()) {
            warn!("unit {index} could not release the primary: {err}");
        }
    })
    .map_err(|err| eyre!("{err}"))?;

    for (index, &unit) in units.iter().enumerate() {
        controller
            .stop(unit)
            .wrap_err_with(|| format!("stopping unit {index}"))?;
        println!("unit[{index}] stopped");
    }
    let (running, paused) = controller.census().map_err(|err| eyre!("{err}"))?;
    println!("all units stopped: running={running} paused={paused}");

    for (index, &unit) in units.iter().enumerate() {
        controller
            .resume(unit)
            .wrap_err_with(|| format!("resuming unit {index}"))?;
        println!("unit[{index}] resumed");
        controller.stop(primary).wrap_err("parking the primary")?;
        println!("primary released by unit[{index}]");
    }

    if args.tick_ms.is_some() {
        println!("observed {} timer ticks", Ticker::ticks());
    }
    Ok(())
}
