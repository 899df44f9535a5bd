//! Two-Level Cache Module
//!
//! Public facade combining the memory tier with the persistence tier.
//!
//! Entries live in memory until the memory tier evicts them for size, at
//! which point they overflow to disk. Disk records are governed by one
//! [`EvictionPolicy`]: a capacity bound enforced before each write, or expiry
//! windows enforced by background sweeps triggered on reads and writes.

use std::hash::Hash;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{trace, warn};

use crate::builder::TwoLevelCacheBuilder;
use crate::cache::{CacheStats, MemoryTier, RemovalCause, RemovalListener, RemovalNotification};
use crate::error::Result;
use crate::eviction::{CapacityEvictor, EvictionPolicy};
use crate::persist::codec::{decode_value, encode_value};
use crate::persist::{PersistenceStore, RecordKey};
use crate::tasks::ExpirySweepScheduler;

// == Two Level Cache ==
/// Memory cache with a disk overflow tier.
///
/// All operations take `&self`; share the cache between threads with an
/// `Arc`. Disk I/O runs on the calling thread, except expiry sweeps which
/// run on a dedicated worker.
pub struct TwoLevelCache<K, V> {
    policy: EvictionPolicy,
    memory: Mutex<Box<dyn MemoryTier<K, V>>>,
    store: Arc<dyn PersistenceStore>,
    capacity: Option<CapacityEvictor>,
    sweeper: ExpirySweepScheduler,
    listener: Option<RemovalListener<K, V>>,
    stats: Arc<Mutex<CacheStats>>,
    write_through: bool,
}

impl<K, V> TwoLevelCache<K, V>
where
    K: Serialize + Eq + Hash + Clone + Send + 'static,
    V: Serialize + DeserializeOwned + PartialEq + Clone + Send + 'static,
{
    /// Starts configuring a new cache.
    pub fn builder() -> TwoLevelCacheBuilder<K, V> {
        TwoLevelCacheBuilder::new()
    }

    pub(crate) fn new(
        policy: EvictionPolicy,
        memory: Box<dyn MemoryTier<K, V>>,
        store: Arc<dyn PersistenceStore>,
        listener: Option<RemovalListener<K, V>>,
        write_through: bool,
    ) -> Result<Self> {
        let stats = Arc::new(Mutex::new(CacheStats::new()));
        let sweeper = ExpirySweepScheduler::spawn(Arc::clone(&store), Arc::clone(&stats))?;
        let capacity = policy
            .max_entries()
            .map(|max| CapacityEvictor::new(Arc::clone(&store), max));

        Ok(Self {
            policy,
            memory: Mutex::new(memory),
            store,
            capacity,
            sweeper,
            listener,
            stats,
            write_through,
        })
    }

    fn memory(&self) -> MutexGuard<'_, Box<dyn MemoryTier<K, V>>> {
        self.memory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats_mut(&self) -> MutexGuard<'_, CacheStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // == Put ==
    /// Stores a value in the memory tier.
    ///
    /// Entries the memory tier evicts to make room are persisted before this
    /// returns; with write-through enabled the value itself is persisted too.
    /// An older record of the same key is deleted, or overwritten when
    /// write-through is on. Persistence failures, including a capacity
    /// eviction that could not delete its victim, are returned to the caller.
    pub fn put(&self, key: K, value: V) -> Result<()> {
        let record_key = RecordKey::for_key(&key)?;

        // Memory expiry must never fall back to an overwritten value
        if !self.write_through {
            self.store.delete(&record_key)?;
        }

        let removals = {
            let mut memory = self.memory();
            memory.insert(key, value.clone());
            memory.drain_removals()
        };
        self.dispatch(removals)?;

        if self.write_through {
            self.persist_value(&record_key, &value)?;
        }
        Ok(())
    }

    // == Get ==
    /// Looks `key` up in memory, then on disk.
    ///
    /// A disk hit is returned without being promoted into memory. When an
    /// access expiry window is configured every disk read schedules a sweep,
    /// hit or miss.
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        if let Some(value) = self.get_from_memory(key)? {
            return Ok(Some(value));
        }
        self.find_persisted(key)
    }

    // == Get Or Compute ==
    /// Returns the cached value for `key`, computing it on a miss.
    ///
    /// A value found on disk is moved back into memory and its record
    /// removed. A computed value is stored in memory like a `put`.
    pub fn get_or_compute<F>(&self, key: K, supplier: F) -> Result<V>
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get_from_memory(&key)? {
            return Ok(value);
        }

        let record_key = RecordKey::for_key(&key)?;
        let (value, promoted) = match self.find_persisted(&key)? {
            Some(value) => (value, true),
            None => (supplier(), false),
        };

        if promoted {
            self.store.delete(&record_key)?;
        }

        let removals = {
            let mut memory = self.memory();
            memory.insert(key, value.clone());
            memory.drain_removals()
        };
        self.dispatch(removals)?;

        if self.write_through && !promoted {
            self.persist_value(&record_key, &value)?;
        }
        Ok(value)
    }

    // == Invalidate ==
    /// Removes `key` from both tiers. The record file is deleted immediately.
    pub fn invalidate(&self, key: &K) -> Result<()> {
        let record_key = RecordKey::for_key(key)?;

        let removals = {
            let mut memory = self.memory();
            memory.remove(key);
            memory.drain_removals()
        };
        self.dispatch(removals)?;

        self.store.delete(&record_key)?;
        Ok(())
    }

    /// Removes every entry from both tiers.
    pub fn invalidate_all(&self) -> Result<()> {
        let removals = {
            let mut memory = self.memory();
            memory.clear();
            memory.drain_removals()
        };
        self.dispatch(removals)?;

        for record in self.store.list_entries()? {
            self.store.remove_record(&record.path)?;
        }
        Ok(())
    }

    // == Size ==
    /// Live memory entries plus persisted records.
    ///
    /// A key held in memory whose older value is still on disk counts twice.
    pub fn size(&self) -> Result<usize> {
        let (in_memory, removals) = {
            let mut memory = self.memory();
            memory.purge_expired();
            (memory.len(), memory.drain_removals())
        };
        self.dispatch(removals)?;

        Ok(in_memory + self.persisted_len()?)
    }

    /// Number of records in the persistence tier.
    pub fn persisted_len(&self) -> Result<usize> {
        Ok(self.store.list_entries()?.len())
    }

    /// Snapshot of the cache counters.
    pub fn stats(&self) -> CacheStats {
        self.stats_mut().clone()
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub fn persistence_directory(&self) -> &Path {
        self.store.root_directory()
    }

    /// Blocks until every expiry sweep scheduled so far has finished.
    pub fn wait_for_sweeps(&self) {
        self.sweeper.wait_idle();
    }

    /// Stops the sweep worker after it finishes queued sweeps.
    ///
    /// The cache stays usable; later sweeps are reported as scheduling
    /// failures and not run.
    pub fn shutdown(&self) {
        self.sweeper.shutdown();
    }

    fn get_from_memory(&self, key: &K) -> Result<Option<V>> {
        let (hit, removals) = {
            let mut memory = self.memory();
            let hit = memory.get(key);
            (hit, memory.drain_removals())
        };
        self.dispatch(removals)?;

        if hit.is_some() {
            self.stats_mut().record_memory_hit();
        }
        Ok(hit)
    }

    // == Find Persisted ==
    fn find_persisted(&self, key: &K) -> Result<Option<V>> {
        let record_key = RecordKey::for_key(key)?;
        let bytes = self.store.read(&record_key)?;

        if let Some(window) = self.policy.expire_after_access() {
            self.sweeper.schedule_sweep(window);
        }

        match bytes {
            Some(bytes) => {
                let value = decode_value(&bytes)?;
                self.stats_mut().record_disk_hit();
                Ok(Some(value))
            }
            None => {
                self.stats_mut().record_miss();
                Ok(None)
            }
        }
    }

    // == Persist Value ==
    /// Writes `value` to disk unless an equal value is already persisted.
    fn persist_value(&self, record_key: &RecordKey, value: &V) -> Result<()> {
        let existing = self.store.read(record_key)?;

        if let Some(bytes) = &existing {
            match decode_value::<V>(bytes) {
                Ok(persisted) if persisted == *value => {
                    trace!(key = %record_key, "Object is already persisted");
                    self.stats_mut().record_skipped_write();
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => warn!(
                    key = %record_key,
                    error = %e,
                    "Persisted value is unreadable, overwriting"
                ),
            }
        }

        let bytes = encode_value(value)?;

        // Overwrites do not add a record
        if let (Some(evictor), None) = (&self.capacity, &existing) {
            let evicted = evictor.maybe_evict_for_incoming_write()?;
            if evicted > 0 {
                self.stats_mut().record_capacity_evictions(evicted as u64);
            }
        }

        self.store.write(record_key, &bytes)?;
        self.stats_mut().record_persisted_write();

        if let Some(window) = self.policy.expire_after_write() {
            self.sweeper.schedule_sweep(window);
        }
        Ok(())
    }

    // == Dispatch Removals ==
    /// Notifies the listener and demotes size evictions to disk.
    ///
    /// Every notification is delivered even if a demotion fails; the first
    /// failure is returned.
    fn dispatch(&self, removals: Vec<RemovalNotification<K, V>>) -> Result<()> {
        let mut first_error = None;

        for notification in removals {
            if let Some(listener) = &self.listener {
                listener.notify(&notification);
            }
            if notification.cause != RemovalCause::Size {
                continue;
            }

            self.stats_mut().record_demotion();
            let demoted = RecordKey::for_key(&notification.key)
                .and_then(|record_key| self.persist_value(&record_key, &notification.value));
            if let Err(e) = demoted {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
