//! Builder for [`TwoLevelCache`].
//!
//! ## Example
//!
//! ```no_run
//! use std::time::Duration;
//! use two_level_cache::TwoLevelCacheBuilder;
//!
//! let cache = TwoLevelCacheBuilder::<String, String>::new()
//!     .memory_maximum_size(1_000)
//!     .expire_after_write(Duration::from_secs(300))
//!     .persistence_directory("/var/cache/my-app")
//!     .build()?;
//!
//! cache.put("greeting".to_string(), "hello".to_string())?;
//! # Ok::<(), two_level_cache::CacheError>(())
//! ```

use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::cache::{LruMemoryCache, MemoryTier, RemovalListener, RemovalNotification};
use crate::error::{CacheError, Result};
use crate::eviction::EvictionPolicy;
use crate::persist::{DiskStore, PersistenceStore};
use crate::two_level::TwoLevelCache;

// == Builder ==
/// Collects the options of a [`TwoLevelCache`] and validates them on
/// [`build`](Self::build).
///
/// Expiry windows apply to both tiers. A persistence capacity bound cannot be
/// combined with either expiry window.
pub struct TwoLevelCacheBuilder<K, V> {
    memory_maximum_size: Option<u64>,
    persistence_maximum_size: Option<u64>,
    expire_after_access: Option<Duration>,
    expire_after_write: Option<Duration>,
    persistence_directory: Option<PathBuf>,
    removal_listener: Option<RemovalListener<K, V>>,
    initial_capacity: usize,
    write_through: bool,
    memory_tier: Option<Box<dyn MemoryTier<K, V>>>,
    persistence_store: Option<Arc<dyn PersistenceStore>>,
}

impl<K, V> Default for TwoLevelCacheBuilder<K, V> {
    fn default() -> Self {
        Self {
            memory_maximum_size: None,
            persistence_maximum_size: None,
            expire_after_access: None,
            expire_after_write: None,
            persistence_directory: None,
            removal_listener: None,
            initial_capacity: 0,
            write_through: false,
            memory_tier: None,
            persistence_store: None,
        }
    }
}

impl<K, V> TwoLevelCacheBuilder<K, V>
where
    K: Serialize + Eq + Hash + Clone + Send + 'static,
    V: Serialize + DeserializeOwned + PartialEq + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum number of entries held in memory before overflowing to disk.
    pub fn memory_maximum_size(mut self, size: u64) -> Self {
        self.memory_maximum_size = Some(size);
        self
    }

    /// Maximum number of records kept on disk.
    pub fn persistence_maximum_size(mut self, size: u64) -> Self {
        self.persistence_maximum_size = Some(size);
        self
    }

    /// Expires entries not read or written within `duration`.
    pub fn expire_after_access(mut self, duration: Duration) -> Self {
        self.expire_after_access = Some(duration);
        self
    }

    /// Expires entries not written within `duration`.
    pub fn expire_after_write(mut self, duration: Duration) -> Self {
        self.expire_after_write = Some(duration);
        self
    }

    /// Sets the directory holding persisted records.
    ///
    /// The directory must not be used for anything else. Without this option
    /// a fresh directory under the system temp dir is used.
    pub fn persistence_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.persistence_directory = Some(path.into());
        self
    }

    /// Registers a callback for every memory-tier removal.
    pub fn removal_listener<F>(mut self, listener: F) -> Self
    where
        F: Fn(&RemovalNotification<K, V>) + Send + Sync + 'static,
    {
        self.removal_listener = Some(RemovalListener::new(listener));
        self
    }

    /// Preallocates memory-tier storage.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Also persists every `put` immediately instead of only on overflow.
    pub fn write_through(mut self, enabled: bool) -> Self {
        self.write_through = enabled;
        self
    }

    /// Replaces the default LRU memory tier. Memory size and initial
    /// capacity options are then ignored.
    pub fn memory_tier(mut self, tier: Box<dyn MemoryTier<K, V>>) -> Self {
        self.memory_tier = Some(tier);
        self
    }

    /// Replaces the default filesystem store.
    pub fn persistence_store(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.persistence_store = Some(store);
        self
    }

    // == Build ==
    /// Validates the options and starts the cache.
    ///
    /// # Errors
    /// [`CacheError::Configuration`] when a persistence capacity bound is
    /// combined with an expiry window, the bound is zero, a custom store is
    /// combined with a persistence directory, or the directory is already
    /// owned by another cache.
    pub fn build(self) -> Result<TwoLevelCache<K, V>> {
        let policy = EvictionPolicy::from_parts(
            self.persistence_maximum_size,
            self.expire_after_access,
            self.expire_after_write,
        )?;

        let store: Arc<dyn PersistenceStore> =
            match (self.persistence_store, self.persistence_directory) {
                (Some(_), Some(_)) => {
                    return Err(CacheError::Configuration(
                        "A custom persistence store cannot be combined with a persistence directory"
                            .to_string(),
                    ))
                }
                (Some(store), None) => store,
                (None, Some(dir)) => Arc::new(DiskStore::open(dir)?),
                (None, None) => Arc::new(DiskStore::open_temporary()?),
            };

        let memory = match self.memory_tier {
            Some(tier) => tier,
            None => Box::new(
                LruMemoryCache::with_capacity(self.memory_maximum_size, self.initial_capacity)
                    .with_expiry(self.expire_after_write, self.expire_after_access),
            ),
        };

        info!(
            policy = ?policy,
            memory_maximum_size = ?self.memory_maximum_size,
            write_through = self.write_through,
            root = %store.root_directory().display(),
            "Two-level cache built"
        );

        TwoLevelCache::new(policy, memory, store, self.removal_listener, self.write_through)
    }
}
