//! Two-Level Cache - An in-memory cache with a disk overflow tier
//!
//! Entries evicted from memory for size are persisted to a directory and
//! served from there. Persisted records are bounded either by count or by
//! expiry windows swept in the background.

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod eviction;
pub mod persist;
pub mod shell;
pub mod tasks;
pub mod two_level;

pub use builder::TwoLevelCacheBuilder;
pub use cache::{CacheStats, RemovalCause, RemovalNotification};
pub use config::Config;
pub use error::{CacheError, Result};
pub use eviction::EvictionPolicy;
pub use two_level::TwoLevelCache;
