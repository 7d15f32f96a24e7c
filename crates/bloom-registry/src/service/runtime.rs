//! Registry Runtime
//!
//! Wires the registry to its background machinery:
//!
//! 1. validate configuration
//! 2. build the registry and the purgatory
//! 3. open the data directory and recover the last snapshot
//! 4. start the purge and persistence jobs
//!
//! `shutdown` reverses it: stop the jobs, freeze once more, release the
//! directory.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::{PersistenceConfig, RegistryConfig};
use crate::error::{PersistenceError, RuntimeError};
use crate::ports::FilterFactory;

use super::persistence::PersistenceManager;
use super::purgatory::{EvictionPolicy, Purgatory};
use super::registry::FilterRegistry;
use super::scheduler::JobScheduler;

/// A running registry with persistence and background jobs
pub struct Runtime {
    registry: Arc<FilterRegistry>,
    persistence: Arc<PersistenceManager>,
    scheduler: JobScheduler,
}

impl Runtime {
    /// Start a registry. Must be called inside a tokio runtime.
    ///
    /// Opening the directory and reading the snapshot run on the blocking
    /// pool, so any runtime flavor works.
    pub async fn start(
        config: &RegistryConfig,
        factory: Arc<dyn FilterFactory>,
    ) -> Result<Self, RuntimeError> {
        config.validate()?;

        let registry = Arc::new(FilterRegistry::new(factory));
        let (persistence, recovered) = {
            let registry = registry.clone();
            let persistence_config = config.persistence.clone();
            tokio::task::spawn_blocking(move || open_and_recover(&persistence_config, registry))
                .await
                .map_err(|e| {
                    error!(error = %e, "[runtime] Snapshot recovery panicked");
                    RuntimeError::TaskFailed(e.to_string())
                })??
        };

        let purgatory = Arc::new(Purgatory::new(registry.clone(), EvictionPolicy::Expired));
        let scheduler = match JobScheduler::start(
            &config.scheduler,
            purgatory,
            persistence.clone(),
            registry.update_counter(),
        ) {
            Ok(scheduler) => scheduler,
            Err(e) => {
                persistence.close();
                return Err(e);
            }
        };

        info!(
            data_dir = %config.persistence.data_dir.display(),
            recovered,
            "[runtime] Filter registry started"
        );
        Ok(Self {
            registry,
            persistence,
            scheduler,
        })
    }

    pub fn registry(&self) -> &Arc<FilterRegistry> {
        &self.registry
    }

    pub fn persistence(&self) -> &Arc<PersistenceManager> {
        &self.persistence
    }

    /// Stop the jobs, write a final snapshot and release the directory.
    ///
    /// The directory is released even if the final freeze fails.
    pub async fn shutdown(self) -> Result<usize, RuntimeError> {
        self.scheduler.shutdown().await;

        let persistence = self.persistence.clone();
        let frozen = tokio::task::spawn_blocking(move || persistence.freeze_all_filters())
            .await
            .map_err(|e| {
                error!(error = %e, "[runtime] Final freeze panicked");
                RuntimeError::TaskFailed(e.to_string())
            });

        self.persistence.close();

        let frozen = frozen??;
        info!(frozen, "[runtime] Filter registry stopped");
        Ok(frozen)
    }
}

/// Lock the data directory and load its snapshot, releasing the lock if
/// recovery fails.
fn open_and_recover(
    config: &PersistenceConfig,
    registry: Arc<FilterRegistry>,
) -> Result<(Arc<PersistenceManager>, usize), PersistenceError> {
    let persistence = Arc::new(PersistenceManager::open(&config.data_dir, registry)?);
    match persistence.recover_from_snapshot(config.allow_recover_from_corrupted) {
        Ok(recovered) => Ok((persistence, recovered)),
        Err(e) => {
            persistence.close();
            Err(e)
        }
    }
}
