//! Ports Layer
//!
//! Defines the interfaces (traits) the registry is built against:
//! - `Filter` / `FilterFactory`: capability contract of a probabilistic set
//! - `RegistryListener`: observer of filter creation and removal
//! - `TimeSource`: clock used for expiration (driven port)
//! - `SnapshotFreezer`: sink the persistence jobs freeze into (driven port)

pub mod filter;
pub mod listener;
pub mod outbound;

pub use filter::{Filter, FilterFactory, FilterInfo};
pub use listener::RegistryListener;
pub use outbound::{SnapshotFreezer, TimeSource, Timestamp};
