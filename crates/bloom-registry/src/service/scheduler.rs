//! Background Job Scheduler
//!
//! Two kinds of fixed-delay jobs run on the tokio runtime:
//!
//! - **Purge**: one job, sweeps the purgatory every `purge_interval`.
//!   Failures and panics are logged; the job keeps its schedule.
//! - **Persistence**: one job per `TriggerCriteria`. All of them share one
//!   mutex and the registry's `UpdateCounter`. A tick freezes only when the
//!   counter exceeds the job's threshold, resetting the counter first.
//!   A freeze that runs out of resources (or panics) stops that job.
//!
//! Blocking work runs on the blocking pool. Shutdown cancels pending sleeps
//! but never interrupts a tick already running.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{SchedulerConfig, TriggerCriteria};
use crate::error::RuntimeError;
use crate::ports::SnapshotFreezer;

use super::purgatory::Purgatory;
use super::update_counter::UpdateCounter;

/// Result of one persistence tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Counter at or below the threshold; nothing written
    Skipped { updates: u64 },
    /// Snapshot written
    Frozen { updates: u64, filters: usize },
    /// Freeze failed; retried on a later tick
    Failed,
    /// Freeze cannot succeed again; the job stops
    Terminated,
}

/// Threshold check plus freeze, shared by the persistence jobs
pub struct PersistenceTrigger {
    criteria: TriggerCriteria,
    counter: Arc<UpdateCounter>,
    freezer: Arc<dyn SnapshotFreezer>,
    lock: Arc<Mutex<()>>,
}

impl PersistenceTrigger {
    pub fn new(
        criteria: TriggerCriteria,
        counter: Arc<UpdateCounter>,
        freezer: Arc<dyn SnapshotFreezer>,
        lock: Arc<Mutex<()>>,
    ) -> Self {
        Self {
            criteria,
            counter,
            freezer,
            lock,
        }
    }

    pub fn criteria(&self) -> TriggerCriteria {
        self.criteria
    }

    /// Run one tick under the shared persistence mutex.
    pub async fn run_once(&self) -> TickOutcome {
        let _guard = self.lock.lock().await;

        let pending = self.counter.get();
        if pending <= self.criteria.updates_threshold {
            return TickOutcome::Skipped { updates: pending };
        }
        let updates = self.counter.take();

        let started = Instant::now();
        let freezer = self.freezer.clone();
        match tokio::task::spawn_blocking(move || freezer.freeze()).await {
            Ok(Ok(filters)) => {
                info!(
                    filters,
                    updates,
                    threshold = self.criteria.updates_threshold,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "[scheduler] Filters frozen"
                );
                TickOutcome::Frozen { updates, filters }
            }
            Ok(Err(e)) if e.is_resource_exhausted() => {
                error!(error = %e, "[scheduler] Freeze exhausted resources, stopping job");
                TickOutcome::Terminated
            }
            Ok(Err(e)) => {
                warn!(error = %e, updates, "[scheduler] Freeze failed");
                TickOutcome::Failed
            }
            Err(e) => {
                error!(error = %e, "[scheduler] Freeze panicked, stopping job");
                TickOutcome::Terminated
            }
        }
    }
}

/// Handle to the running background jobs.
///
/// Dropping the scheduler without `shutdown` also stops the jobs after
/// their current tick, but does not wait for them.
pub struct JobScheduler {
    shutdown_tx: watch::Sender<bool>,
    jobs: Vec<JoinHandle<()>>,
}

impl JobScheduler {
    /// Spawn the purge job and one persistence job per trigger on the
    /// current tokio runtime.
    pub fn start(
        config: &SchedulerConfig,
        purgatory: Arc<Purgatory>,
        freezer: Arc<dyn SnapshotFreezer>,
        counter: Arc<UpdateCounter>,
    ) -> Result<Self, RuntimeError> {
        let handle = Handle::try_current().map_err(|_| RuntimeError::NoAsyncRuntime)?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut jobs = Vec::with_capacity(config.triggers.len() + 1);

        jobs.push(handle.spawn(purge_job(
            purgatory,
            config.purge_interval,
            shutdown_rx.clone(),
        )));

        let lock = Arc::new(Mutex::new(()));
        for criteria in &config.triggers {
            let trigger =
                PersistenceTrigger::new(*criteria, counter.clone(), freezer.clone(), lock.clone());
            jobs.push(handle.spawn(persistence_job(trigger, shutdown_rx.clone())));
        }

        info!(
            purge_interval_ms = config.purge_interval.as_millis() as u64,
            persistence_jobs = config.triggers.len(),
            "[scheduler] Background jobs started"
        );
        Ok(Self { shutdown_tx, jobs })
    }

    /// Number of jobs still running
    pub fn running_jobs(&self) -> usize {
        self.jobs.iter().filter(|job| !job.is_finished()).count()
    }

    /// Stop scheduling new ticks and wait for every job to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        for job in self.jobs {
            if let Err(e) = job.await {
                error!(error = %e, "[scheduler] Job ended abnormally");
            }
        }
        info!("[scheduler] Background jobs stopped");
    }
}

/// Sleep for `delay`. Returns false if shutdown was signalled first.
async fn wait_next_tick(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }
    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = shutdown.changed() => false,
    }
}

async fn purge_job(
    purgatory: Arc<Purgatory>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    while wait_next_tick(interval, &mut shutdown).await {
        let purgatory = purgatory.clone();
        match tokio::task::spawn_blocking(move || purgatory.purge()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "[scheduler] Purge failed"),
            Err(e) => error!(error = %e, "[scheduler] Purge panicked"),
        }
    }
    debug!("[scheduler] Purge job stopped");
}

async fn persistence_job(trigger: PersistenceTrigger, mut shutdown: watch::Receiver<bool>) {
    let criteria = trigger.criteria();
    while wait_next_tick(criteria.checking_period, &mut shutdown).await {
        if trigger.run_once().await == TickOutcome::Terminated {
            break;
        }
    }
    debug!(
        threshold = criteria.updates_threshold,
        "[scheduler] Persistence job stopped"
    );
}
