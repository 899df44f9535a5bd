//! Memory Tier Module
//!
//! Bounded in-memory map with LRU eviction and expiry windows. Removals are
//! queued as notifications so the owner can react to them outside its lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::cache::{CacheEntry, LruTracker, RemovalCause, RemovalNotification};

// == Memory Tier Trait ==
/// The hot tier of a two-level cache.
///
/// Implementations own their eviction algorithm. Every entry they drop must
/// be reported through [`drain_removals`](MemoryTier::drain_removals).
pub trait MemoryTier<K, V>: Send {
    /// Returns the live value for `key`, refreshing its recency.
    fn get(&mut self, key: &K) -> Option<V>;

    /// Stores `value`, evicting other entries if the tier is full.
    fn insert(&mut self, key: K, value: V);

    /// Removes `key`, returning its value if present.
    fn remove(&mut self, key: &K) -> Option<V>;

    /// Removes every entry.
    fn clear(&mut self);

    /// Drops entries that outlived their expiry window. Returns how many.
    fn purge_expired(&mut self) -> usize;

    /// Number of entries currently held, expired or not.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes the notifications queued since the last call.
    fn drain_removals(&mut self) -> Vec<RemovalNotification<K, V>>;
}

// == LRU Memory Cache ==
/// Default memory tier: HashMap storage with LRU tracking and expiry.
#[derive(Debug)]
pub struct LruMemoryCache<K, V> {
    /// Key-value storage
    entries: HashMap<K, CacheEntry<V>>,
    /// LRU access tracker
    lru: LruTracker<K>,
    /// Maximum number of entries, unbounded when None
    max_entries: Option<u64>,
    expire_after_write: Option<Duration>,
    expire_after_access: Option<Duration>,
    /// Removals not yet drained by the owner
    pending: Vec<RemovalNotification<K, V>>,
}

impl<K, V> LruMemoryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates an empty tier holding at most `max_entries` entries.
    pub fn new(max_entries: Option<u64>) -> Self {
        Self::with_capacity(max_entries, 0)
    }

    /// Creates an empty tier with storage preallocated for `initial_capacity`.
    pub fn with_capacity(max_entries: Option<u64>, initial_capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(initial_capacity),
            lru: LruTracker::with_capacity(initial_capacity),
            max_entries,
            expire_after_write: None,
            expire_after_access: None,
            pending: Vec::new(),
        }
    }

    /// Sets the expiry windows applied to every entry.
    pub fn with_expiry(
        mut self,
        after_write: Option<Duration>,
        after_access: Option<Duration>,
    ) -> Self {
        self.expire_after_write = after_write;
        self.expire_after_access = after_access;
        self
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        entry.is_expired_at(now, self.expire_after_write, self.expire_after_access)
    }

    fn take(&mut self, key: &K, cause: RemovalCause) -> Option<V> {
        let entry = self.entries.remove(key)?;
        self.lru.remove(key);
        self.pending
            .push(RemovalNotification::new(key.clone(), entry.value.clone(), cause));
        Some(entry.value)
    }

    fn purge_expired_entries(&mut self) -> usize {
        if self.expire_after_write.is_none() && self.expire_after_access.is_none() {
            return 0;
        }

        let now = Instant::now();
        let expired_keys: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, entry)| self.is_expired(entry, now))
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            self.take(&key, RemovalCause::Expired);
        }
        count
    }

    // == Enforce Bound ==
    /// Evicts least recently used entries until the bound holds.
    fn enforce_bound(&mut self) {
        let Some(max) = self.max_entries else {
            return;
        };
        if self.entries.len() as u64 > max {
            self.purge_expired_entries();
        }
        while self.entries.len() as u64 > max {
            match self.lru.evict_oldest() {
                Some(victim) => {
                    if let Some(entry) = self.entries.remove(&victim) {
                        self.pending
                            .push(RemovalNotification::new(victim, entry.value, RemovalCause::Size));
                    }
                }
                None => break,
            }
        }
    }
}

impl<K, V> MemoryTier<K, V> for LruMemoryCache<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Clone + Send,
{
    fn get(&mut self, key: &K) -> Option<V> {
        let now = Instant::now();
        let expired = self.is_expired(self.entries.get(key)?, now);
        if expired {
            self.take(key, RemovalCause::Expired);
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        entry.touch();
        let value = entry.value.clone();
        self.lru.touch(key);
        Some(value)
    }

    fn insert(&mut self, key: K, value: V) {
        let previous = self.entries.insert(key.clone(), CacheEntry::new(value));
        if let Some(previous) = previous {
            self.pending.push(RemovalNotification::new(
                key.clone(),
                previous.value,
                RemovalCause::Replaced,
            ));
        }
        self.lru.touch(&key);
        self.enforce_bound();
    }

    fn remove(&mut self, key: &K) -> Option<V> {
        self.take(key, RemovalCause::Explicit)
    }

    fn clear(&mut self) {
        for (key, entry) in self.entries.drain() {
            self.pending
                .push(RemovalNotification::new(key, entry.value, RemovalCause::Explicit));
        }
        self.lru.clear();
    }

    fn purge_expired(&mut self) -> usize {
        self.purge_expired_entries()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn drain_removals(&mut self) -> Vec<RemovalNotification<K, V>> {
        std::mem::take(&mut self.pending)
    }
}
