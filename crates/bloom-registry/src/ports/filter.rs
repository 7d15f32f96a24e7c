//! Filter capability contract
//!
//! The registry, the snapshot log and the purgatory only ever see filters
//! through these traits; the Bloom filter in `domain` is one implementation.

use std::fmt;
use std::sync::Arc;

use crate::domain::FilterConfig;
use crate::error::FilterError;

use super::outbound::Timestamp;

/// A named approximate-membership structure managed by the registry.
///
/// Filters are shared as `Arc<dyn Filter>` between the registry, request
/// handlers and background jobs, so every method takes `&self`.
pub trait Filter: Send + Sync + fmt::Debug {
    /// Insert a value. Returns true if the filter state changed.
    ///
    /// Filters with sliding expiration extend their expiry on every call.
    fn insert(&self, value: &str) -> bool;

    /// Test whether a value might be present (false positives possible).
    fn might_contain(&self, value: &str) -> bool;

    fn expected_insertions(&self) -> usize;

    fn fpp(&self) -> f64;

    fn created_at(&self) -> Timestamp;

    fn expires_at(&self) -> Timestamp;

    /// Whether the filter's lifetime has lapsed.
    fn is_expired(&self) -> bool;

    /// Whether the filter may still be served. Same predicate as expiration
    /// until a filter type gives invalidity its own meaning.
    fn is_valid(&self) -> bool {
        !self.is_expired()
    }

    /// Serialize the filter body. Paired with `FilterFactory::deserialize`.
    fn serialize(&self) -> Result<Vec<u8>, FilterError>;

    /// Snapshot of the introspection fields
    fn info(&self) -> FilterInfo {
        FilterInfo {
            expected_insertions: self.expected_insertions(),
            fpp: self.fpp(),
            created_at: self.created_at(),
            expires_at: self.expires_at(),
        }
    }
}

/// Creates filters from configuration and restores them from snapshot bodies.
pub trait FilterFactory: Send + Sync {
    fn create(&self, config: &FilterConfig) -> Result<Arc<dyn Filter>, FilterError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Arc<dyn Filter>, FilterError>;
}

/// Introspection values of a filter, as reported to the request layer
#[derive(Clone, Debug, PartialEq)]
pub struct FilterInfo {
    pub expected_insertions: usize,
    pub fpp: f64,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}
