//! Shared count of registry mutations since the last snapshot

use std::sync::atomic::{AtomicU64, Ordering};

/// Single shared accumulator of state-changing operations.
///
/// Incremented by the registry; drained only by the persistence job.
#[derive(Debug, Default)]
pub struct UpdateCounter {
    updates: AtomicU64,
}

impl UpdateCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        self.updates.fetch_add(n, Ordering::AcqRel);
    }

    pub fn get(&self) -> u64 {
        self.updates.load(Ordering::Acquire)
    }

    /// Reset to zero, returning the count drained.
    ///
    /// Updates racing with the reset land either in the returned value or in
    /// the next cycle, never in both and never nowhere.
    pub fn take(&self) -> u64 {
        self.updates.swap(0, Ordering::AcqRel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_take_resets() {
        let counter = UpdateCounter::new();
        counter.increment();
        counter.add(4);

        assert_eq!(counter.get(), 5);
        assert_eq!(counter.take(), 5);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let counter = Arc::new(UpdateCounter::new());
        let drained = Arc::new(AtomicU64::new(0));

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let counter = counter.clone();
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        counter.increment();
                    }
                })
            })
            .collect();
        for _ in 0..100 {
            drained.fetch_add(counter.take(), Ordering::Relaxed);
        }
        for worker in workers {
            worker.join().unwrap();
        }

        let total = drained.load(Ordering::Relaxed) + counter.take();
        assert_eq!(total, 40_000);
    }
}
