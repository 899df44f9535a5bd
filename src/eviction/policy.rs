//! Disk-tier eviction policy and the guard that builds it.

use std::time::Duration;

use crate::error::{CacheError, Result};

// == Eviction Policy ==
/// How the persistence tier reclaims records.
///
/// A capacity bound and expiry windows never coexist. The two expiry windows
/// may be combined with each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Records stay until invalidated
    #[default]
    Unbounded,
    /// At most `max_entries` records; the oldest-modified goes first
    CapacityBound { max_entries: u64 },
    /// Records older than a window are swept in the background
    TimeBound {
        after_access: Option<Duration>,
        after_write: Option<Duration>,
    },
}

impl EvictionPolicy {
    // == Guard ==
    /// Validates the optional policy parameters and combines them.
    ///
    /// Fails when a capacity bound is combined with either expiry window, or
    /// when the capacity bound is zero.
    pub fn from_parts(
        max_entries: Option<u64>,
        after_access: Option<Duration>,
        after_write: Option<Duration>,
    ) -> Result<Self> {
        match (max_entries, after_access, after_write) {
            (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(CacheError::Configuration(
                "Simultaneous max size and time eviction strategy is not allowed".to_string(),
            )),
            (Some(0), None, None) => Err(CacheError::Configuration(
                "Persistence maximum size must be greater than zero".to_string(),
            )),
            (Some(max_entries), None, None) => Ok(Self::CapacityBound { max_entries }),
            (None, None, None) => Ok(Self::Unbounded),
            (None, after_access, after_write) => Ok(Self::TimeBound {
                after_access,
                after_write,
            }),
        }
    }

    /// Capacity bound, if this policy has one.
    pub fn max_entries(&self) -> Option<u64> {
        match self {
            Self::CapacityBound { max_entries } => Some(*max_entries),
            _ => None,
        }
    }

    /// Window swept after every persisted-record read.
    pub fn expire_after_access(&self) -> Option<Duration> {
        match self {
            Self::TimeBound { after_access, .. } => *after_access,
            _ => None,
        }
    }

    /// Window swept after every actual write to disk.
    pub fn expire_after_write(&self) -> Option<Duration> {
        match self {
            Self::TimeBound { after_write, .. } => *after_write,
            _ => None,
        }
    }
}
