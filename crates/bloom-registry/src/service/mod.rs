//! Service Layer
//!
//! Application services built on the domain and ports:
//! - `FilterRegistry`: the name → filter map and its listeners
//! - `Purgatory`: eviction of expired filters
//! - `PersistenceManager`: snapshot directory, freeze and recovery
//! - `JobScheduler`: purge and persistence background jobs
//! - `Runtime`: wires all of the above together

pub mod persistence;
pub mod purgatory;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod update_counter;

pub use persistence::{PersistenceManager, SNAPSHOT_FILE, SNAPSHOT_TMP_FILE};
pub use purgatory::{EvictionPolicy, Purgatory};
pub use registry::{CreateOutcome, FilterRegistry};
pub use runtime::Runtime;
pub use scheduler::{JobScheduler, PersistenceTrigger, TickOutcome};
pub use update_counter::UpdateCounter;
