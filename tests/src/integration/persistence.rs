//! # Persistence Flows
//!
//! Snapshots written by one registry are read back by another, across
//! truncation, corruption and directory locking.

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use bloom_registry::service::SNAPSHOT_FILE;
    use bloom_registry::{
        CorruptFrame, ExpirableBloomFilterFactory, FilterConfigBuilder, FilterRegistry,
        LockError, ManualClock, PersistenceConfig, PersistenceError, PersistenceManager,
        RegistryConfig, Runtime, SchedulerConfig, TriggerCriteria,
    };

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    fn registry(clock: &Arc<ManualClock>) -> Arc<FilterRegistry> {
        Arc::new(FilterRegistry::new(Arc::new(
            ExpirableBloomFilterFactory::new(clock.clone()),
        )))
    }

    fn fill(registry: &FilterRegistry, count: usize) {
        for i in 0..count {
            let name = format!("filter-{}", i);
            let config = FilterConfigBuilder::new(name.as_str())
                .expected_insertions(500)
                .fpp(0.01)
                .build()
                .unwrap();
            registry.create_filter(&config, false).unwrap();
            registry.set(&name, &format!("member-{}", i)).unwrap();
        }
    }

    fn freeze(dir: &Path, source: Arc<FilterRegistry>) -> usize {
        let manager = PersistenceManager::open(dir, source).unwrap();
        let frozen = manager.freeze_all_filters().unwrap();
        manager.close();
        frozen
    }

    fn sorted(mut names: Vec<String>) -> Vec<String> {
        names.sort();
        names
    }

    // =========================================================================
    // FLOWS
    // =========================================================================

    #[test]
    fn test_freeze_clear_recover_yields_same_entries() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let source = registry(&clock);
        fill(&source, 25);

        assert_eq!(freeze(dir.path(), source.clone()), 25);

        let target = registry(&clock);
        let manager = PersistenceManager::open(dir.path(), target.clone()).unwrap();
        assert_eq!(manager.recover_from_snapshot(false).unwrap(), 25);

        assert_eq!(sorted(target.list_names()), sorted(source.list_names()));
        for i in 0..25 {
            let name = format!("filter-{}", i);
            assert!(target.might_contain(&name, &format!("member-{}", i)).unwrap());
            assert_eq!(
                target.get_filter(&name).unwrap().info(),
                source.get_filter(&name).unwrap().info()
            );
        }
    }

    #[test]
    fn test_truncated_snapshot_keeps_complete_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let source = registry(&clock);
        fill(&source, 4);
        freeze(dir.path(), source);

        let path = dir.path().join(SNAPSHOT_FILE);
        let bytes = fs::read(&path).unwrap();
        let first_frame = 9 + u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
        // Cut inside the second frame's header
        fs::write(&path, &bytes[..first_frame + 5]).unwrap();

        let target = registry(&clock);
        let manager = PersistenceManager::open(dir.path(), target.clone()).unwrap();

        assert_eq!(manager.recover_from_snapshot(false).unwrap(), 1);
        assert_eq!(target.size(), 1);
    }

    #[test]
    fn test_corruption_policy() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let source = registry(&clock);
        fill(&source, 3);
        freeze(dir.path(), source);

        let path = dir.path().join(SNAPSHOT_FILE);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x55;
        fs::write(&path, bytes).unwrap();

        let strict = registry(&clock);
        let manager = PersistenceManager::open(dir.path(), strict.clone()).unwrap();
        let err = manager.recover_from_snapshot(false).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Corrupted(CorruptFrame::ChecksumMismatch { .. })
        ));
        assert_eq!(strict.size(), 0);
        manager.close();

        let lenient = registry(&clock);
        let manager = PersistenceManager::open(dir.path(), lenient.clone()).unwrap();
        assert_eq!(manager.recover_from_snapshot(true).unwrap(), 2);
        assert_eq!(lenient.size(), 2);
    }

    #[test]
    fn test_directory_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let holder = PersistenceManager::open(dir.path(), registry(&clock)).unwrap();

        let err = PersistenceManager::open(dir.path(), registry(&clock)).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Lock(LockError::AlreadyLocked { .. })
        ));

        drop(holder);
        assert!(PersistenceManager::open(dir.path(), registry(&clock)).is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_runtime_persists_in_background() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(0));
        let config = RegistryConfig {
            persistence: PersistenceConfig {
                data_dir: dir.path().to_path_buf(),
                allow_recover_from_corrupted: false,
            },
            scheduler: SchedulerConfig {
                purge_interval: Duration::from_millis(20),
                triggers: vec![TriggerCriteria::new(Duration::from_millis(20), 2)],
            },
        };

        let runtime = Runtime::start(
            &config,
            Arc::new(ExpirableBloomFilterFactory::new(clock.clone())),
        )
        .await
        .unwrap();
        fill(runtime.registry(), 3);

        // 3 creates + 3 sets exceed the threshold of 2
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(dir.path().join(SNAPSHOT_FILE).exists());
        assert_eq!(runtime.registry().update_counter().get(), 0);

        runtime.shutdown().await.unwrap();

        let target = registry(&clock);
        let manager = PersistenceManager::open(dir.path(), target.clone()).unwrap();
        assert_eq!(manager.recover_from_snapshot(false).unwrap(), 3);
    }
}
