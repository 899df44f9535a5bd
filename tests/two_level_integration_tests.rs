//! Integration Tests for the two-level cache
//!
//! Exercises the public API against a real persistence directory. Every test
//! owns a fresh temporary directory.

use std::sync::Arc;
use std::thread::{self, sleep};
use std::time::Duration;

use tempfile::TempDir;
use two_level_cache::{CacheError, Config, EvictionPolicy, TwoLevelCache};

const KEY_PREFIX: &str = "key-";
const VALUE_PREFIX: &str = "value-";

// == Helper Functions ==

fn key(i: usize) -> String {
    format!("{}{}", KEY_PREFIX, i)
}

fn value(i: usize) -> String {
    format!("{}{}", VALUE_PREFIX, i)
}

fn capacity_cache(dir: &TempDir, memory: u64, persisted: u64) -> TwoLevelCache<String, String> {
    TwoLevelCache::builder()
        .memory_maximum_size(memory)
        .persistence_maximum_size(persisted)
        .persistence_directory(dir.path())
        .build()
        .unwrap()
}

fn fill(cache: &TwoLevelCache<String, String>, count: usize) {
    for i in 0..count {
        cache.put(key(i), value(i)).unwrap();
    }
}

// == Capacity Bound ==

#[test]
fn test_overflow_fills_both_tiers() {
    let dir = TempDir::new().unwrap();
    let cache = capacity_cache(&dir, 10, 10);

    fill(&cache, 19);

    assert_eq!(cache.size().unwrap(), 19);
    assert_eq!(cache.persisted_len().unwrap(), 9);
    for i in 0..19 {
        assert_eq!(cache.get(&key(i)).unwrap(), Some(value(i)));
    }
}

#[test]
fn test_capacity_evicts_oldest_records() {
    let dir = TempDir::new().unwrap();
    let cache = capacity_cache(&dir, 10, 10);

    fill(&cache, 23);

    assert_eq!(cache.size().unwrap(), 20);
    for i in 0..3 {
        assert_eq!(cache.get(&key(i)).unwrap(), None, "{} should be evicted", key(i));
    }
    for i in 3..23 {
        assert_eq!(cache.get(&key(i)).unwrap(), Some(value(i)));
    }
    assert_eq!(cache.stats().capacity_evictions, 3);
}

// == Manual Invalidation ==

#[test]
fn test_manual_invalidation() {
    let dir = TempDir::new().unwrap();
    let cache = capacity_cache(&dir, 10, 10);
    fill(&cache, 19);

    let mut expected = 19;
    for i in 0..4 {
        cache.invalidate(&key(i * 4)).unwrap();
        expected -= 1;
        assert_eq!(cache.size().unwrap(), expected);
        assert_eq!(cache.get(&key(i * 4)).unwrap(), None);
    }

    cache.invalidate_all().unwrap();
    assert_eq!(cache.size().unwrap(), 0);
    assert_eq!(cache.persisted_len().unwrap(), 0);
}

// == Time Bound ==

#[test]
fn test_time_expiry_empties_both_tiers() {
    let dir = TempDir::new().unwrap();
    let window = Duration::from_millis(500);
    let cache: TwoLevelCache<String, String> = TwoLevelCache::builder()
        .memory_maximum_size(5)
        .expire_after_access(window)
        .expire_after_write(window)
        .persistence_directory(dir.path())
        .build()
        .unwrap();

    fill(&cache, 9);
    assert_eq!(cache.size().unwrap(), 9);
    assert_eq!(cache.persisted_len().unwrap(), 4);

    for i in 0..4 {
        sleep(Duration::from_millis(600));
        // Expired in memory, so every read reaches the disk tier
        assert_eq!(cache.get(&key(4 + i)).unwrap(), None);
    }
    cache.wait_for_sweeps();

    assert_eq!(cache.size().unwrap(), 0);
    assert!(cache.stats().expired_records >= 4);
}

#[test]
fn test_records_inside_window_survive_sweeps() {
    let dir = TempDir::new().unwrap();
    let cache: TwoLevelCache<String, String> = TwoLevelCache::builder()
        .memory_maximum_size(0)
        .expire_after_write(Duration::from_secs(60))
        .persistence_directory(dir.path())
        .build()
        .unwrap();

    fill(&cache, 5);
    cache.wait_for_sweeps();

    assert_eq!(cache.persisted_len().unwrap(), 5);
    assert_eq!(cache.get(&key(0)).unwrap(), Some(value(0)));
}

// == Get Or Compute ==

#[test]
fn test_get_or_compute() {
    let dir = TempDir::new().unwrap();
    let cache = capacity_cache(&dir, 1, 10);

    let computed = cache.get_or_compute(key(1), || value(1)).unwrap();
    assert_eq!(computed, value(1));

    // Push key-1 to disk, then read it back through the supplier path
    cache.put(key(2), value(2)).unwrap();
    assert_eq!(cache.persisted_len().unwrap(), 1);

    let promoted = cache
        .get_or_compute(key(1), || panic!("value is cached"))
        .unwrap();
    assert_eq!(promoted, value(1));
    assert_eq!(cache.size().unwrap(), 2);
}

// == Persistence Directory ==

#[test]
fn test_records_survive_restart() {
    let dir = TempDir::new().unwrap();
    {
        let cache = capacity_cache(&dir, 0, 10);
        fill(&cache, 3);
    }

    let cache = capacity_cache(&dir, 0, 10);
    assert_eq!(cache.persisted_len().unwrap(), 3);
    for i in 0..3 {
        assert_eq!(cache.get(&key(i)).unwrap(), Some(value(i)));
    }
}

#[test]
fn test_directory_is_owned_exclusively() {
    let dir = TempDir::new().unwrap();
    let first = capacity_cache(&dir, 10, 10);

    let second: Result<TwoLevelCache<String, String>, _> = TwoLevelCache::builder()
        .persistence_directory(dir.path())
        .build();
    assert!(matches!(second, Err(CacheError::Configuration(_))));

    drop(first);
    let third = capacity_cache(&dir, 10, 10);
    assert_eq!(third.size().unwrap(), 0);
}

#[test]
fn test_oversized_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let cache = capacity_cache(&dir, 10, 10);

    let result = cache.put("x".repeat(200), value(0));
    assert!(matches!(result, Err(CacheError::InvalidKey(_))));
}

// == Configuration ==

#[test]
fn test_capacity_with_expiry_is_rejected() {
    let dir = TempDir::new().unwrap();
    let result: Result<TwoLevelCache<String, String>, _> = TwoLevelCache::builder()
        .persistence_maximum_size(10)
        .expire_after_write(Duration::from_millis(500))
        .persistence_directory(dir.path())
        .build();

    match result {
        Err(CacheError::Configuration(message)) => {
            assert!(message.contains("Simultaneous max size and time eviction"))
        }
        _ => panic!("expected a configuration error"),
    }
}

#[test]
fn test_config_maps_onto_builder() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        memory_max_entries: 2,
        persistence_max_entries: Some(3),
        persistence_dir: dir.path().to_path_buf(),
        ..Config::default()
    };

    let cache: TwoLevelCache<String, String> = config.builder().build().unwrap();
    assert_eq!(cache.policy(), EvictionPolicy::CapacityBound { max_entries: 3 });

    fill(&cache, 10);
    assert_eq!(cache.size().unwrap(), 5);
}

// == Concurrency ==

#[test]
fn test_invalidate_races_expiry_sweep() {
    let dir = TempDir::new().unwrap();
    let cache: TwoLevelCache<String, String> = TwoLevelCache::builder()
        .memory_maximum_size(0)
        .expire_after_write(Duration::from_millis(20))
        .expire_after_access(Duration::from_millis(20))
        .persistence_directory(dir.path())
        .build()
        .unwrap();

    for round in 0..20 {
        let k = key(round);
        cache.put(k.clone(), value(round)).unwrap();
        cache.wait_for_sweeps();
        sleep(Duration::from_millis(30));

        // The miss queues a sweep for the expired record; invalidate deletes
        // the same file while the sweep worker runs
        assert_eq!(cache.get(&key(1_000)).unwrap(), None);
        cache.invalidate(&k).unwrap();
        assert_eq!(cache.get(&k).unwrap(), None);
    }
    cache.wait_for_sweeps();

    let stats = cache.stats();
    assert_eq!(stats.sweep_failures, 0);
    assert_eq!(cache.persisted_len().unwrap(), 0);
}

#[test]
fn test_concurrent_access_with_sweeps() {
    let dir = TempDir::new().unwrap();
    let cache: Arc<TwoLevelCache<String, String>> = Arc::new(
        TwoLevelCache::builder()
            .memory_maximum_size(4)
            .expire_after_write(Duration::from_millis(20))
            .expire_after_access(Duration::from_millis(20))
            .persistence_directory(dir.path())
            .build()
            .unwrap(),
    );

    let workers: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..50 {
                    let k = key((t * 7 + i) % 16);
                    cache.put(k.clone(), value(i)).unwrap();
                    cache.get(&k).unwrap();
                    if i % 5 == 0 {
                        cache.invalidate(&k).unwrap();
                    }
                    if i % 10 == 0 {
                        sleep(Duration::from_millis(5));
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    cache.wait_for_sweeps();

    assert_eq!(cache.stats().sweep_failures, 0);
    sleep(Duration::from_millis(50));
    cache.get(&key(99)).unwrap();
    cache.wait_for_sweeps();
    assert_eq!(cache.size().unwrap(), 0);
}
