//! Cache Entry Module
//!
//! Defines the structure for individual memory-tier entries with expiry support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// Represents a single memory-tier entry with value and timing metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// When the value was last written
    pub written_at: Instant,
    /// When the value was last read or written
    pub accessed_at: Instant,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped with the current time.
    pub fn new(value: V) -> Self {
        let now = Instant::now();
        Self {
            value,
            written_at: now,
            accessed_at: now,
        }
    }

    // == Touch ==
    /// Records a read of the entry.
    pub fn touch(&mut self) {
        self.accessed_at = Instant::now();
    }

    // == Is Expired ==
    /// Checks the entry against the configured expiry windows.
    ///
    /// Boundary condition: an entry is expired once the elapsed time is greater
    /// than or equal to a window, so a zero window expires immediately.
    pub fn is_expired(
        &self,
        after_write: Option<Duration>,
        after_access: Option<Duration>,
    ) -> bool {
        self.is_expired_at(Instant::now(), after_write, after_access)
    }

    /// Same as [`is_expired`](Self::is_expired) against an explicit clock reading.
    pub fn is_expired_at(
        &self,
        now: Instant,
        after_write: Option<Duration>,
        after_access: Option<Duration>,
    ) -> bool {
        let write_expired = after_write
            .map(|window| now.saturating_duration_since(self.written_at) >= window)
            .unwrap_or(false);
        let access_expired = after_access
            .map(|window| now.saturating_duration_since(self.accessed_at) >= window)
            .unwrap_or(false);
        write_expired || access_expired
    }
}
