//! # Filter Lifecycle Flows
//!
//! A filter is created, written to, read from, outlives or outlasts its
//! validity period, and is purged.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bloom_registry::{
        EvictionPolicy, ExpirableBloomFilterFactory, FilterConfigBuilder, FilterRegistry,
        ManualClock, Purgatory, RegistryError,
    };
    use rand::Rng;

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn setup() -> (Arc<FilterRegistry>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let factory = Arc::new(ExpirableBloomFilterFactory::new(clock.clone()));
        (Arc::new(FilterRegistry::new(factory)), clock)
    }

    // =========================================================================
    // FLOWS
    // =========================================================================

    #[test]
    fn test_expired_filter_is_purged() {
        let (registry, clock) = setup();
        let config = FilterConfigBuilder::new("A")
            .expected_insertions(1_000)
            .fpp(0.01)
            .valid_period_after_write(Duration::from_secs(3))
            .build()
            .unwrap();
        registry.create_filter(&config, false).unwrap();

        assert!(registry.set("A", "x").unwrap());
        assert!(registry.might_contain("A", "x").unwrap());

        clock.advance(Duration::from_secs(3));
        let purged = Purgatory::new(registry.clone(), EvictionPolicy::Expired)
            .purge()
            .unwrap();

        assert_eq!(purged, 1);
        let err = registry.might_contain("A", "x").unwrap_err();
        assert!(matches!(err, RegistryError::FilterNotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_access_keeps_filter_alive() {
        let (registry, clock) = setup();
        let config = FilterConfigBuilder::new("sliding")
            .expected_insertions(100)
            .fpp(0.01)
            .valid_period_after_write(Duration::from_secs(2))
            .valid_period_after_access(Duration::from_secs(2))
            .build()
            .unwrap();
        registry.create_filter(&config, false).unwrap();
        let purgatory = Purgatory::new(registry.clone(), EvictionPolicy::Invalid);

        for _ in 0..5 {
            clock.advance(Duration::from_secs(1));
            registry.might_contain("sliding", "lookup").unwrap();
            assert_eq!(purgatory.purge().unwrap(), 0);
        }

        clock.advance(Duration::from_secs(2));
        assert_eq!(purgatory.purge().unwrap(), 1);
    }

    #[test]
    fn test_no_false_negatives_for_random_values() {
        let (registry, _) = setup();
        let config = FilterConfigBuilder::new("random")
            .expected_insertions(5_000)
            .fpp(0.001)
            .build()
            .unwrap();
        registry.create_filter(&config, false).unwrap();

        let mut rng = rand::thread_rng();
        let values: Vec<String> = (0..5_000)
            .map(|_| format!("{:016x}", rng.gen::<u64>()))
            .collect();
        registry.multi_set("random", &values).unwrap();

        let found = registry.multi_might_contain("random", &values).unwrap();
        assert!(found.into_iter().all(|f| f));
    }

    #[test]
    fn test_invalid_create_parameters_are_bad_requests() {
        let (registry, _) = setup();

        let err = FilterConfigBuilder::new("bad").fpp(1.5).build().unwrap_err();
        assert_eq!(RegistryError::from(err).status_code(), 400);
        assert_eq!(registry.size(), 0);
    }
}
