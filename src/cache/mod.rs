//! Cache Module
//!
//! Memory tier of the two-level cache: entries, LRU tracking, removal
//! notifications and statistics.

mod entry;
mod lru;
mod memory;
mod removal;
mod stats;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use memory::{LruMemoryCache, MemoryTier};
pub use removal::{RemovalCause, RemovalListener, RemovalNotification};
pub use stats::CacheStats;
