//! Background loops for the escalation sweep and the analytics rollup.
//!
//! Each loop runs on its own named thread, ticks once immediately and then
//! every interval, and stops when [`Scheduler::shutdown`] closes its channel.
//! A sweep interrupted by process exit is safe to run again from scratch.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::engine::Engine;

/// Intervals for the two loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub sweep_interval: Duration,
    pub analytics_interval: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(300),
            analytics_interval: Duration::from_secs(3600),
        }
    }
}

struct Worker {
    name: &'static str,
    stop: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

/// Handle to the running background loops.
pub struct Scheduler {
    workers: Vec<Worker>,
}

impl Scheduler {
    /// Spawns both loops.
    pub fn start(engine: Arc<Engine>, config: ScheduleConfig) -> std::io::Result<Self> {
        let mut scheduler = Self {
            workers: Vec::with_capacity(2),
        };

        let sweep_engine = Arc::clone(&engine);
        scheduler.spawn("desk-escalation", config.sweep_interval, move || {
            if let Err(e) = sweep_engine.sweep() {
                warn!(error = %e, "escalation sweep failed");
            }
        })?;

        scheduler.spawn("desk-analytics", config.analytics_interval, move || {
            rollup_today(&engine);
        })?;

        info!(
            sweep_secs = config.sweep_interval.as_secs(),
            analytics_secs = config.analytics_interval.as_secs(),
            "scheduler started"
        );
        Ok(scheduler)
    }

    fn spawn<F>(&mut self, name: &'static str, interval: Duration, tick: F) -> std::io::Result<()>
    where
        F: Fn() + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::Builder::new().name(name.to_string()).spawn(move || {
            loop {
                tick();
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => continue,
                    // A message or a dropped sender both mean stop.
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!(thread = name, "background loop stopped");
        })?;
        self.workers.push(Worker { name, stop, handle });
        Ok(())
    }

    /// Signals every loop and waits for the threads to exit.
    pub fn shutdown(self) {
        for worker in &self.workers {
            let _ = worker.stop.send(());
        }
        for worker in self.workers {
            if worker.handle.join().is_err() {
                warn!(thread = worker.name, "background loop panicked");
            }
        }
        info!("scheduler stopped");
    }
}

/// Recomputes today's snapshot for every active tenant.
fn rollup_today(engine: &Engine) {
    let today = Utc::now().date_naive();
    let tenants = match engine.directory().list_tenants() {
        Ok(tenants) => tenants,
        Err(e) => {
            warn!(error = %e, "cannot list tenants for analytics rollup");
            return;
        }
    };
    for tenant in tenants.into_iter().filter(|t| t.is_active) {
        if let Err(e) = engine.compute_snapshot(&tenant.id, today) {
            warn!(tenant_id = %tenant.id, error = %e, "analytics rollup failed");
        }
    }
}
