//! Error types for the two-level cache
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the two-level cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Builder options that cannot be combined, or an unusable persistence root
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Capacity reclamation could not delete the selected record
    #[error("Couldn't evict cache file {} when maximum size is reached: {source}", path.display())]
    Eviction {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Underlying read/write/delete/list failed
    #[error("Persistence I/O error: {0}")]
    Persistence(#[from] io::Error),

    /// Key or value could not be (de)serialized
    #[error("Codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Key cannot be mapped onto a record file name
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Background sweep lane is not accepting work
    #[error("Sweep scheduling error: {0}")]
    SweepScheduling(String),
}

// == Result Type Alias ==
/// Convenience Result type for the two-level cache.
pub type Result<T> = std::result::Result<T, CacheError>;
