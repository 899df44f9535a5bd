//! Property-Based Tests for the cache tiers
//!
//! Uses proptest to check tier invariants over random operation sequences.
//! The facade tests run against the in-memory stub store.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{LruMemoryCache, MemoryTier};
use crate::error::CacheError;
use crate::eviction::EvictionPolicy;
use crate::persist::stub::StubStore;
use crate::persist::PersistenceStore;
use crate::two_level::TwoLevelCache;

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "k[0-9]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9 ]{0,16}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: String },
    Get { key: String },
    Invalidate { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Put { key, value }),
        2 => key_strategy().prop_map(|key| CacheOp::Get { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Invalidate { key }),
    ]
}

fn stub_cache(
    store: &Arc<StubStore>,
    memory_max: u64,
    persistence_max: Option<u64>,
) -> TwoLevelCache<String, String> {
    let store: Arc<dyn PersistenceStore> = store.clone();
    let mut builder = TwoLevelCache::builder()
        .memory_maximum_size(memory_max)
        .persistence_store(store);
    if let Some(max) = persistence_max {
        builder = builder.persistence_maximum_size(max);
    }
    builder.build().unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // The memory tier never holds more entries than its bound, and every
    // insert of a new key is balanced by a size eviction once it is full.
    #[test]
    fn prop_memory_bound_respected(
        max in 0u64..8,
        ops in prop::collection::vec((key_strategy(), value_strategy()), 1..60)
    ) {
        let mut tier: LruMemoryCache<String, String> = LruMemoryCache::new(Some(max));
        for (key, value) in ops {
            let before = tier.len();
            let replacing = tier.get(&key).is_some();
            tier.insert(key, value);
            prop_assert!(tier.len() as u64 <= max);

            let evicted = tier
                .drain_removals()
                .iter()
                .filter(|n| n.cause.was_evicted())
                .count();
            let grown = tier.len() + evicted;
            prop_assert_eq!(grown, if replacing { before } else { before + 1 });
        }
    }

    // With an unbounded disk tier nothing is lost: every key reads back the
    // last value put, no matter which tier holds it.
    #[test]
    fn prop_overflow_preserves_latest_value(
        memory_max in 0u64..4,
        ops in prop::collection::vec(cache_op_strategy(), 1..60)
    ) {
        let store = Arc::new(StubStore::new());
        let cache = stub_cache(&store, memory_max, None);
        let mut model: HashMap<String, String> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Put { key, value } => {
                    cache.put(key.clone(), value.clone()).unwrap();
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(cache.get(&key).unwrap(), model.get(&key).cloned());
                }
                CacheOp::Invalidate { key } => {
                    cache.invalidate(&key).unwrap();
                    model.remove(&key);
                }
            }
        }

        for (key, value) in &model {
            let found = cache.get(key).unwrap();
            prop_assert_eq!(found.as_ref(), Some(value));
        }
    }

    // The disk tier never exceeds its capacity bound.
    #[test]
    fn prop_persisted_count_within_capacity(
        max in 1u64..6,
        ops in prop::collection::vec((key_strategy(), value_strategy()), 1..60)
    ) {
        let store = Arc::new(StubStore::new());
        let cache = stub_cache(&store, 0, Some(max));

        for (key, value) in ops {
            cache.put(key, value).unwrap();
            prop_assert!(cache.persisted_len().unwrap() as u64 <= max);
        }
    }

    // A capacity bound combined with any expiry window is rejected; any
    // other combination with a non-zero bound is accepted.
    #[test]
    fn prop_capacity_and_expiry_are_exclusive(
        max in prop::option::of(0u64..100),
        access in prop::option::of(1u64..10_000),
        write in prop::option::of(1u64..10_000)
    ) {
        let result = EvictionPolicy::from_parts(
            max,
            access.map(Duration::from_millis),
            write.map(Duration::from_millis),
        );
        let expiring = access.is_some() || write.is_some();

        match max {
            Some(0) => prop_assert!(matches!(result, Err(CacheError::Configuration(_)))),
            Some(_) if expiring => {
                prop_assert!(matches!(result, Err(CacheError::Configuration(_))))
            }
            _ => prop_assert!(result.is_ok()),
        }
    }
}
