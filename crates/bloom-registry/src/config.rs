//! # Registry Configuration
//!
//! Built once at startup and passed into constructors; nothing reads
//! configuration from global state. Every section deserializes with serde
//! and falls back to its defaults for missing fields. Durations are
//! expressed in milliseconds.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Complete registry configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Snapshot storage.
    pub persistence: PersistenceConfig,
    /// Background jobs.
    pub scheduler: SchedulerConfig,
}

impl RegistryConfig {
    /// Reject settings the scheduler cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.persistence.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyDataDir);
        }
        if self.scheduler.purge_interval.is_zero() {
            return Err(ConfigError::ZeroPurgeInterval);
        }
        if let Some(index) = self
            .scheduler
            .triggers
            .iter()
            .position(|t| t.checking_period.is_zero())
        {
            return Err(ConfigError::ZeroCheckingPeriod { index });
        }
        Ok(())
    }
}

/// Snapshot storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Directory holding the snapshot and its `LOCK` file.
    pub data_dir: PathBuf,
    /// Keep the filters read before a corrupt frame instead of failing.
    pub allow_recover_from_corrupted: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            allow_recover_from_corrupted: false,
        }
    }
}

/// Background job configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay between purge sweeps.
    #[serde(with = "duration_ms")]
    pub purge_interval: Duration,
    /// One persistence job per entry.
    pub triggers: Vec<TriggerCriteria>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            purge_interval: Duration::from_millis(300),
            triggers: vec![
                TriggerCriteria::new(Duration::from_secs(900), 1),
                TriggerCriteria::new(Duration::from_secs(300), 10),
                TriggerCriteria::new(Duration::from_secs(60), 10_000),
            ],
        }
    }
}

/// Freeze when more than `updates_threshold` updates accumulated, checked
/// every `checking_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCriteria {
    #[serde(with = "duration_ms")]
    pub checking_period: Duration,
    pub updates_threshold: u64,
}

impl TriggerCriteria {
    pub fn new(checking_period: Duration, updates_threshold: u64) -> Self {
        Self {
            checking_period,
            updates_threshold,
        }
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
