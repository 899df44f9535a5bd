//! Capacity bound enforcement for the persistence tier.
//!
//! Runs synchronously on the writing thread, right before a record is
//! written. The oldest-modified record is deleted to make room.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::debug;

use crate::error::{CacheError, Result};
use crate::persist::{PersistedRecord, PersistenceStore};

/// Canonical eviction order: modification time, then write sequence, then path.
pub fn eviction_order(a: &PersistedRecord, b: &PersistedRecord) -> Ordering {
    (a.modified, a.sequence, &a.path).cmp(&(b.modified, b.sequence, &b.path))
}

// == Capacity Evictor ==
/// Keeps the number of persisted records within `max_entries`.
#[derive(Debug, Clone)]
pub struct CapacityEvictor {
    store: Arc<dyn PersistenceStore>,
    max_entries: u64,
}

impl CapacityEvictor {
    pub fn new(store: Arc<dyn PersistenceStore>, max_entries: u64) -> Self {
        Self { store, max_entries }
    }

    pub fn max_entries(&self) -> u64 {
        self.max_entries
    }

    // == Maybe Evict ==
    /// Frees room for one incoming record if the tier is at its bound.
    ///
    /// Normally deletes at most one record. If the directory already holds
    /// more than the bound, the oldest records are deleted until one slot is
    /// free. A victim that is already gone counts as evicted.
    ///
    /// Returns the number of records reclaimed. Fails with
    /// [`CacheError::Eviction`] if a victim cannot be deleted.
    pub fn maybe_evict_for_incoming_write(&self) -> Result<usize> {
        let mut records = self.store.list_entries()?;
        let count = records.len() as u64;
        if count < self.max_entries {
            return Ok(0);
        }

        let excess = (count - self.max_entries + 1) as usize;
        records.sort_by(eviction_order);

        for record in records.into_iter().take(excess) {
            match self.store.remove_record(&record.path) {
                Ok(removed) => debug!(
                    path = %record.path.display(),
                    already_gone = !removed,
                    max_entries = self.max_entries,
                    "Evicted oldest persisted record"
                ),
                Err(source) => {
                    return Err(CacheError::Eviction {
                        path: record.path,
                        source,
                    })
                }
            }
        }

        Ok(excess)
    }
}
