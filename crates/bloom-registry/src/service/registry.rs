//! Filter Registry
//!
//! The single owner of the name → filter mapping. Every lifecycle mutation
//! (create, overwrite, remove, eviction, recovery) goes through here.
//!
//! ## Concurrency
//!
//! - Map operations are atomic per key (`DashMap` shard locks)
//! - Listener dispatch runs after the shard lock is released, on the
//!   calling thread
//! - Iteration is weakly consistent: a snapshot of entries taken shard by
//!   shard, which may or may not reflect concurrent mutations

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::adapters::log::FilterRecord;
use crate::domain::FilterConfig;
use crate::error::RegistryError;
use crate::ports::{Filter, FilterFactory, RegistryListener};

use super::update_counter::UpdateCounter;

/// Result of `FilterRegistry::create_filter`
#[derive(Clone, Debug)]
pub struct CreateOutcome {
    pub filter: Arc<dyn Filter>,
    /// False when an existing filter was returned unchanged
    pub created: bool,
}

#[derive(Clone, Copy)]
enum Event {
    Created,
    Removed,
}

impl Event {
    fn as_str(self) -> &'static str {
        match self {
            Event::Created => "creation",
            Event::Removed => "removal",
        }
    }
}

/// Concurrent registry of named filters
pub struct FilterRegistry {
    filters: DashMap<String, Arc<dyn Filter>>,
    factory: Arc<dyn FilterFactory>,
    listeners: RwLock<Vec<Arc<dyn RegistryListener>>>,
    updates: Arc<UpdateCounter>,
}

impl FilterRegistry {
    pub fn new(factory: Arc<dyn FilterFactory>) -> Self {
        Self {
            filters: DashMap::new(),
            factory,
            listeners: RwLock::new(Vec::new()),
            updates: Arc::new(UpdateCounter::new()),
        }
    }

    /// Factory used to create and restore filters
    pub fn factory(&self) -> &Arc<dyn FilterFactory> {
        &self.factory
    }

    /// Counter of state changes since the last snapshot
    pub fn update_counter(&self) -> Arc<UpdateCounter> {
        self.updates.clone()
    }

    /// Create the filter named by `config`.
    ///
    /// Without `overwrite`, an existing filter is returned untouched and no
    /// event fires. With `overwrite`, a fresh filter always replaces the
    /// entry and a single creation event fires.
    pub fn create_filter(
        &self,
        config: &FilterConfig,
        overwrite: bool,
    ) -> Result<CreateOutcome, RegistryError> {
        let name = config.name();

        let filter = if overwrite {
            let filter = self.factory.create(config)?;
            self.filters.insert(name.to_string(), filter.clone());
            filter
        } else {
            // Shard guard is dropped at the end of this match, before dispatch
            match self.filters.entry(name.to_string()) {
                Entry::Occupied(existing) => {
                    return Ok(CreateOutcome {
                        filter: existing.get().clone(),
                        created: false,
                    });
                }
                Entry::Vacant(slot) => {
                    let filter = self.factory.create(config)?;
                    slot.insert(filter.clone());
                    filter
                }
            }
        };

        self.updates.increment();
        debug!(name, overwrite, "[registry] Filter created");
        self.notify(Event::Created, name, &filter)?;

        Ok(CreateOutcome {
            filter,
            created: true,
        })
    }

    pub fn get_filter(&self, name: &str) -> Option<Arc<dyn Filter>> {
        self.filters.get(name).map(|entry| entry.value().clone())
    }

    /// Like `get_filter`, but absence is an error
    pub fn safe_get_filter(&self, name: &str) -> Result<Arc<dyn Filter>, RegistryError> {
        self.get_filter(name)
            .ok_or_else(|| RegistryError::FilterNotFound(name.to_string()))
    }

    /// Remove a filter unconditionally. Fires a removal event only if an
    /// entry existed.
    pub fn remove(&self, name: &str) -> Result<Option<Arc<dyn Filter>>, RegistryError> {
        let Some((name, filter)) = self.filters.remove(name) else {
            return Ok(None);
        };

        self.updates.increment();
        debug!(name = %name, "[registry] Filter removed");
        self.notify(Event::Removed, &name, &filter)?;
        Ok(Some(filter))
    }

    /// Remove `name` only if it still maps to `expected` (same allocation).
    ///
    /// Returns false, silently, when the entry is gone or was replaced since
    /// the caller observed it.
    pub fn remove_if_same(
        &self,
        name: &str,
        expected: &Arc<dyn Filter>,
    ) -> Result<bool, RegistryError> {
        let Some((name, filter)) = self
            .filters
            .remove_if(name, |_, current| Arc::ptr_eq(current, expected))
        else {
            return Ok(false);
        };

        self.updates.increment();
        debug!(name = %name, "[registry] Filter evicted");
        self.notify(Event::Removed, &name, &filter)?;
        Ok(true)
    }

    /// Bulk insert recovered records. Recovery is not a live creation, so
    /// no events fire and the update counter is left alone.
    pub fn add_filters<I>(&self, records: I) -> usize
    where
        I: IntoIterator<Item = FilterRecord>,
    {
        let mut added = 0;
        for record in records {
            self.filters.insert(record.name, record.filter);
            added += 1;
        }
        info!(added, "[registry] Filters restored");
        added
    }

    pub fn list_names(&self) -> Vec<String> {
        self.filters.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn size(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Weakly consistent snapshot of all entries
    pub fn entries(&self) -> Vec<(String, Arc<dyn Filter>)> {
        self.filters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    // =========================================================================
    // Value operations
    // =========================================================================

    /// Insert `value` into the named filter. Returns whether it changed.
    pub fn set(&self, name: &str, value: &str) -> Result<bool, RegistryError> {
        let filter = self.safe_get_filter(name)?;
        let changed = filter.insert(value);
        if changed {
            self.updates.increment();
        }
        Ok(changed)
    }

    pub fn multi_set(&self, name: &str, values: &[String]) -> Result<Vec<bool>, RegistryError> {
        let filter = self.safe_get_filter(name)?;
        let results: Vec<bool> = values.iter().map(|v| filter.insert(v)).collect();
        let changed = results.iter().filter(|&&c| c).count() as u64;
        if changed > 0 {
            self.updates.add(changed);
        }
        Ok(results)
    }

    pub fn might_contain(&self, name: &str, value: &str) -> Result<bool, RegistryError> {
        Ok(self.safe_get_filter(name)?.might_contain(value))
    }

    pub fn multi_might_contain(
        &self,
        name: &str,
        values: &[String],
    ) -> Result<Vec<bool>, RegistryError> {
        let filter = self.safe_get_filter(name)?;
        Ok(values.iter().map(|v| filter.might_contain(v)).collect())
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Register a listener; listeners are notified in registration order
    pub fn add_listener(&self, listener: Arc<dyn RegistryListener>) {
        self.listeners.write().push(listener);
    }

    /// Unregister a listener by identity. Returns whether it was registered.
    pub fn remove_listener(&self, listener: &Arc<dyn RegistryListener>) -> bool {
        let mut listeners = self.listeners.write();
        match listeners.iter().position(|l| Arc::ptr_eq(l, listener)) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    fn notify(
        &self,
        event: Event,
        name: &str,
        filter: &Arc<dyn Filter>,
    ) -> Result<(), RegistryError> {
        // Dispatch over a snapshot so listeners may (un)register freely
        let listeners: Vec<_> = self.listeners.read().clone();
        for listener in listeners {
            let result = match event {
                Event::Created => listener.on_filter_created(name, filter),
                Event::Removed => listener.on_filter_removed(name, filter),
            };
            result.map_err(|source| RegistryError::Listener {
                event: event.as_str(),
                name: name.to_string(),
                source,
            })?;
        }
        Ok(())
    }
}
