//! # Bloom Registry
//!
//! A process-wide registry of named Bloom filters with expiration, durable
//! snapshots and background maintenance.
//!
//! ## Architecture
//!
//! This crate follows Hexagonal Architecture (Ports & Adapters):
//!
//! - **Domain Layer** (`domain/`): Pure filter logic, no I/O
//!   - `BloomFilter`: Core probabilistic data structure
//!   - `ExpirableBloomFilter`: Bloom filter with write/access expiration
//!   - `FilterConfig` / `FilterConfigBuilder`: Validated creation parameters
//!
//! - **Ports Layer** (`ports/`): Trait definitions
//!   - `Filter` / `FilterFactory`: Capability contract of a filter
//!   - `RegistryListener`: Creation and removal observer
//!   - `TimeSource`, `SnapshotFreezer`: Driven ports
//!
//! - **Adapters Layer** (`adapters/`): External connections
//!   - `log`: Checksummed snapshot frames, `LogReader` / `LogWriter`
//!   - `lock`: `DirectoryLock` on the data directory
//!   - `infra`: Clocks and CRC-32C
//!
//! - **Service Layer** (`service/`): Orchestration
//!   - `FilterRegistry`, `Purgatory`, `PersistenceManager`, `JobScheduler`
//!   - `Runtime`: Startup (lock, recover, schedule) and orderly shutdown
//!
//! ## Invariants
//!
//! - At most one filter per name; create-without-overwrite never replaces
//! - No false negatives: an inserted value always tests positive
//! - Eviction removes a filter only if it is still the one observed expired
//! - The snapshot on disk is always a complete, synced log
//!
//! ## Usage Example
//!
//! ```ignore
//! use bloom_registry::{
//!     ExpirableBloomFilterFactory, FilterConfigBuilder, RegistryConfig, Runtime,
//!     SystemTimeSource,
//! };
//! use std::sync::Arc;
//!
//! let factory = Arc::new(ExpirableBloomFilterFactory::new(Arc::new(SystemTimeSource)));
//! let runtime = Runtime::start(&RegistryConfig::default(), factory).await?;
//!
//! let config = FilterConfigBuilder::new("sessions").fpp(0.001).build()?;
//! runtime.registry().create_filter(&config, false)?;
//! runtime.registry().set("sessions", "user-42")?;
//! assert!(runtime.registry().might_contain("sessions", "user-42")?);
//!
//! runtime.shutdown().await?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

// Re-exports for convenience
pub use adapters::infra::{ManualClock, SystemTimeSource};
pub use adapters::lock::{DirectoryLock, LockError};
pub use adapters::log::{FilterRecord, LogReader, LogWriter, NextRecord};
pub use config::{PersistenceConfig, RegistryConfig, SchedulerConfig, TriggerCriteria};
pub use domain::{BloomFilter, ExpirableBloomFilterFactory, FilterConfig, FilterConfigBuilder};
pub use error::{
    ConfigError, CorruptFrame, FilterError, PersistenceError, RegistryError, RuntimeError,
};
pub use ports::{Filter, FilterFactory, FilterInfo, RegistryListener, SnapshotFreezer, TimeSource};
pub use service::{
    EvictionPolicy, FilterRegistry, JobScheduler, PersistenceManager, Purgatory, Runtime,
    UpdateCounter,
};
