//! Cache Statistics Module
//!
//! Tracks hits and misses per tier, persistence writes and disk reclamation.

use chrono::{DateTime, Utc};
use serde::Serialize;

// == Cache Stats ==
/// Tracks two-level cache performance metrics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    /// Reads served by the memory tier
    pub memory_hits: u64,
    /// Reads served by the persistence tier
    pub disk_hits: u64,
    /// Reads found in neither tier
    pub misses: u64,
    /// Memory-tier entries evicted for size and demoted to disk
    pub demotions: u64,
    /// Records actually written to disk
    pub persisted_writes: u64,
    /// Writes skipped because the persisted value was already equal
    pub skipped_writes: u64,
    /// Records deleted to honour the persistence capacity bound
    pub capacity_evictions: u64,
    /// Records deleted by expiry sweeps
    pub expired_records: u64,
    /// Sweep tasks that ran to completion
    pub sweeps_completed: u64,
    /// Per-file deletions or whole sweeps that failed
    pub sweep_failures: u64,
    /// Completion time of the most recent sweep
    pub last_sweep_at: Option<DateTime<Utc>>,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the combined hit rate of both tiers.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.memory_hits + self.disk_hits;
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    pub fn record_memory_hit(&mut self) {
        self.memory_hits += 1;
    }

    pub fn record_disk_hit(&mut self) {
        self.disk_hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_demotion(&mut self) {
        self.demotions += 1;
    }

    pub fn record_persisted_write(&mut self) {
        self.persisted_writes += 1;
    }

    pub fn record_skipped_write(&mut self) {
        self.skipped_writes += 1;
    }

    pub fn record_capacity_evictions(&mut self, count: u64) {
        self.capacity_evictions += count;
    }

    // == Record Sweep ==
    /// Folds the outcome of one finished sweep into the counters.
    pub fn record_sweep(&mut self, deleted: u64, failures: u64) {
        self.expired_records += deleted;
        self.sweep_failures += failures;
        self.sweeps_completed += 1;
        self.last_sweep_at = Some(Utc::now());
    }

    /// Counts a sweep that could not run at all.
    pub fn record_sweep_failure(&mut self) {
        self.sweep_failures += 1;
    }
}
