//! Purgatory: eviction of expired filters
//!
//! A sweep scans a snapshot of the registry and removes every filter the
//! policy condemns. Removal is conditional on identity, so a filter that was
//! overwritten between the scan and the removal survives the sweep.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::RegistryError;
use crate::ports::Filter;

use super::registry::FilterRegistry;

/// Which filters a sweep removes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Filters whose lifetime has lapsed
    #[default]
    Expired,
    /// Filters no longer valid to serve
    Invalid,
}

impl EvictionPolicy {
    fn condemns(self, filter: &dyn Filter) -> bool {
        match self {
            EvictionPolicy::Expired => filter.is_expired(),
            EvictionPolicy::Invalid => !filter.is_valid(),
        }
    }
}

/// Periodic sweeper over a registry
pub struct Purgatory {
    registry: Arc<FilterRegistry>,
    policy: EvictionPolicy,
}

impl Purgatory {
    pub fn new(registry: Arc<FilterRegistry>, policy: EvictionPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Run one sweep. Returns the number of filters removed.
    ///
    /// A listener failure stops the sweep and is returned; filters removed
    /// before it stay removed.
    pub fn purge(&self) -> Result<usize, RegistryError> {
        let mut removed = 0;

        for (name, filter) in self.registry.entries() {
            if !self.policy.condemns(filter.as_ref()) {
                continue;
            }
            match self.registry.remove_if_same(&name, &filter) {
                Ok(true) => {
                    debug!(name = %name, "[purgatory] Filter purged");
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    warn!(name = %name, error = %e, "[purgatory] Listener failed during purge");
                    return Err(e);
                }
            }
        }

        if removed > 0 {
            info!(removed, policy = ?self.policy, "[purgatory] Purge complete");
        }
        Ok(removed)
    }
}
