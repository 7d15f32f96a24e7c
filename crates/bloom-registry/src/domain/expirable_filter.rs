//! Bloom filter with a bounded lifetime
//!
//! A filter expires at `created_at + valid_period_after_write`. When
//! `valid_period_after_access` is set, every insert or lookup pushes the
//! expiry out to at least `now + valid_period_after_access`.

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::ports::{Filter, FilterFactory, TimeSource, Timestamp};

use super::bloom_filter::BloomFilter;
use super::config::FilterConfig;

/// Bloom filter with expiration bookkeeping
pub struct ExpirableBloomFilter {
    bloom: RwLock<BloomFilter>,
    expected_insertions: usize,
    fpp: f64,
    created_at: Timestamp,
    expires_at: AtomicU64,
    valid_period_after_access: Option<Duration>,
    clock: Arc<dyn TimeSource>,
}

/// On-disk body of an `ExpirableBloomFilter`
#[derive(Serialize, Deserialize)]
struct PersistedFilter<'a> {
    expected_insertions: u64,
    fpp: f64,
    created_at: Timestamp,
    expires_at: Timestamp,
    valid_period_after_access_ms: Option<u64>,
    bloom: Cow<'a, BloomFilter>,
}

impl ExpirableBloomFilter {
    /// Create an empty filter sized for `config`, starting its lifetime now
    pub fn new(config: &FilterConfig, clock: Arc<dyn TimeSource>) -> Self {
        let created_at = clock.now_millis();
        let expires_at = created_at.saturating_add(millis(config.valid_period_after_write()));

        Self {
            bloom: RwLock::new(BloomFilter::new_with_fpr(
                config.expected_insertions(),
                config.fpp(),
            )),
            expected_insertions: config.expected_insertions(),
            fpp: config.fpp(),
            created_at,
            expires_at: AtomicU64::new(expires_at),
            valid_period_after_access: config.valid_period_after_access(),
            clock,
        }
    }

    /// Restore a filter from bytes produced by `Filter::serialize`
    pub fn from_bytes(bytes: &[u8], clock: Arc<dyn TimeSource>) -> Result<Self, FilterError> {
        let persisted: PersistedFilter<'static> = bincode::deserialize(bytes)
            .map_err(|e| FilterError::SerializationError(e.to_string()))?;

        let bloom = persisted.bloom.into_owned();
        if !bloom.is_consistent() {
            return Err(FilterError::SerializationError(
                "bloom filter bit length does not match its size".to_string(),
            ));
        }

        Ok(Self {
            bloom: RwLock::new(bloom),
            expected_insertions: persisted.expected_insertions as usize,
            fpp: persisted.fpp,
            created_at: persisted.created_at,
            expires_at: AtomicU64::new(persisted.expires_at),
            valid_period_after_access: persisted
                .valid_period_after_access_ms
                .map(Duration::from_millis),
            clock,
        })
    }

    pub fn valid_period_after_access(&self) -> Option<Duration> {
        self.valid_period_after_access
    }

    /// Number of state-changing inserts so far
    pub fn elements_inserted(&self) -> usize {
        self.bloom.read().elements_inserted()
    }

    fn touch(&self) {
        if let Some(period) = self.valid_period_after_access {
            let extended = self.clock.now_millis().saturating_add(millis(period));
            self.expires_at.fetch_max(extended, Ordering::AcqRel);
        }
    }
}

impl Filter for ExpirableBloomFilter {
    fn insert(&self, value: &str) -> bool {
        let changed = self.bloom.write().insert(value.as_bytes());
        self.touch();
        changed
    }

    fn might_contain(&self, value: &str) -> bool {
        let found = self.bloom.read().contains(value.as_bytes());
        self.touch();
        found
    }

    fn expected_insertions(&self) -> usize {
        self.expected_insertions
    }

    fn fpp(&self) -> f64 {
        self.fpp
    }

    fn created_at(&self) -> Timestamp {
        self.created_at
    }

    fn expires_at(&self) -> Timestamp {
        self.expires_at.load(Ordering::Acquire)
    }

    fn is_expired(&self) -> bool {
        self.clock.now_millis() >= self.expires_at()
    }

    fn serialize(&self) -> Result<Vec<u8>, FilterError> {
        let bloom = self.bloom.read();
        let persisted = PersistedFilter {
            expected_insertions: self.expected_insertions as u64,
            fpp: self.fpp,
            created_at: self.created_at,
            expires_at: self.expires_at(),
            valid_period_after_access_ms: self.valid_period_after_access.map(millis),
            bloom: Cow::Borrowed(&*bloom),
        };
        bincode::serialize(&persisted).map_err(|e| FilterError::SerializationError(e.to_string()))
    }
}

impl std::fmt::Debug for ExpirableBloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpirableBloomFilter")
            .field("expected_insertions", &self.expected_insertions)
            .field("fpp", &self.fpp)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at())
            .field("valid_period_after_access", &self.valid_period_after_access)
            .finish()
    }
}

/// Factory producing `ExpirableBloomFilter`s that share one clock
#[derive(Clone)]
pub struct ExpirableBloomFilterFactory {
    clock: Arc<dyn TimeSource>,
}

impl ExpirableBloomFilterFactory {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self { clock }
    }
}

impl FilterFactory for ExpirableBloomFilterFactory {
    fn create(&self, config: &FilterConfig) -> Result<Arc<dyn Filter>, FilterError> {
        Ok(Arc::new(ExpirableBloomFilter::new(config, self.clock.clone())))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Arc<dyn Filter>, FilterError> {
        Ok(Arc::new(ExpirableBloomFilter::from_bytes(
            bytes,
            self.clock.clone(),
        )?))
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
