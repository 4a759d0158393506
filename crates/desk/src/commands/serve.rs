//! `desk serve` -- run the escalation and analytics loops until Ctrl+C.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

use desk_engine::{ScheduleConfig, Scheduler};

use crate::cli::ServeArgs;
use crate::context::RuntimeContext;
use crate::{CTRLC_RECEIVED, SERVING};

fn to_std(d: chrono::Duration, flag: &str) -> Result<Duration> {
    match d.to_std() {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => bail!("--{} must be positive", flag),
    }
}

/// Execute the `desk serve` command.
pub fn run(ctx: &RuntimeContext, args: &ServeArgs) -> Result<()> {
    let engine = Arc::new(ctx.open_engine()?);

    let config = ScheduleConfig {
        sweep_interval: match args.sweep_interval {
            Some(d) => to_std(d, "sweep-interval")?,
            None => Duration::from_secs(ctx.config.escalation.sweep_interval_secs),
        },
        analytics_interval: match args.analytics_interval {
            Some(d) => to_std(d, "analytics-interval")?,
            None => Duration::from_secs(ctx.config.analytics.interval_secs),
        },
    };

    SERVING.store(true, Ordering::SeqCst);
    let scheduler =
        Scheduler::start(engine, config).context("failed to start background loops")?;
    if !ctx.quiet {
        eprintln!(
            "desk serving: sweep every {}s, analytics every {}s (Ctrl+C to stop)",
            config.sweep_interval.as_secs(),
            config.analytics_interval.as_secs()
        );
    }

    while !CTRLC_RECEIVED.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }

    info!("shutting down");
    scheduler.shutdown();
    Ok(())
}
