//! Configuration Module
//!
//! Loads the command-line shell's cache configuration from environment variables.

use std::env;
use std::hash::Hash;
use std::path::PathBuf;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::builder::TwoLevelCacheBuilder;

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of entries held in memory
    pub memory_max_entries: u64,
    /// Maximum number of records kept on disk
    pub persistence_max_entries: Option<u64>,
    /// Expire-after-access window in milliseconds
    pub expire_after_access_ms: Option<u64>,
    /// Expire-after-write window in milliseconds
    pub expire_after_write_ms: Option<u64>,
    /// Directory holding persisted records
    pub persistence_dir: PathBuf,
    /// Persist every put immediately
    pub write_through: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMORY_MAX_ENTRIES` - Memory-tier capacity (default: 1000)
    /// - `PERSISTENCE_MAX_ENTRIES` - Disk-tier capacity (default: unbounded)
    /// - `EXPIRE_AFTER_ACCESS_MS` - Access expiry window (default: none)
    /// - `EXPIRE_AFTER_WRITE_MS` - Write expiry window (default: none)
    /// - `PERSISTENCE_DIR` - Record directory (default: ./two-level-cache)
    /// - `WRITE_THROUGH` - `true` to persist every put (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            memory_max_entries: parse_var("MEMORY_MAX_ENTRIES")
                .unwrap_or(defaults.memory_max_entries),
            persistence_max_entries: parse_var("PERSISTENCE_MAX_ENTRIES"),
            expire_after_access_ms: parse_var("EXPIRE_AFTER_ACCESS_MS"),
            expire_after_write_ms: parse_var("EXPIRE_AFTER_WRITE_MS"),
            persistence_dir: env::var("PERSISTENCE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.persistence_dir),
            write_through: parse_var("WRITE_THROUGH").unwrap_or(defaults.write_through),
        }
    }

    /// Applies this configuration to a fresh builder.
    ///
    /// Policy coherence is checked when the builder is built.
    pub fn builder<K, V>(&self) -> TwoLevelCacheBuilder<K, V>
    where
        K: Serialize + Eq + Hash + Clone + Send + 'static,
        V: Serialize + DeserializeOwned + PartialEq + Clone + Send + 'static,
    {
        let mut builder = TwoLevelCacheBuilder::new()
            .memory_maximum_size(self.memory_max_entries)
            .persistence_directory(self.persistence_dir.clone())
            .write_through(self.write_through);

        if let Some(max) = self.persistence_max_entries {
            builder = builder.persistence_maximum_size(max);
        }
        if let Some(ms) = self.expire_after_access_ms {
            builder = builder.expire_after_access(Duration::from_millis(ms));
        }
        if let Some(ms) = self.expire_after_write_ms {
            builder = builder.expire_after_write(Duration::from_millis(ms));
        }
        builder
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            memory_max_entries: 1000,
            persistence_max_entries: None,
            expire_after_access_ms: None,
            expire_after_write_ms: None,
            persistence_dir: PathBuf::from("./two-level-cache"),
            write_through: false,
        }
    }
}
