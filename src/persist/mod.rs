//! Persistence Module
//!
//! The disk tier: a raw byte store addressed by record keys, one file per key.
//! File modification times are the only metadata; there is no index file.

pub mod codec;
mod disk;

#[cfg(test)]
pub(crate) mod stub;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

pub use codec::{RecordKey, MAX_KEY_LENGTH, RECORD_EXTENSION};
pub use disk::DiskStore;

// == Persisted Record ==
/// One record file found in the persistence root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRecord {
    /// Absolute path of the record file
    pub path: PathBuf,
    /// Last-modified time, the record's age anchor
    pub modified: SystemTime,
    /// Write order within this process, 0 for records written before it started
    pub sequence: u64,
}

impl PersistedRecord {
    /// Age of the record at `now`; zero if the timestamp lies in the future.
    pub fn age_at(&self, now: SystemTime) -> std::time::Duration {
        now.duration_since(self.modified).unwrap_or_default()
    }
}

// == Persistence Store Trait ==
/// Raw byte storage behind the disk tier.
///
/// A store exclusively owns its root directory. Deleting something that is
/// already gone is not an error: `delete` and `remove_record` return
/// `Ok(false)` in that case.
pub trait PersistenceStore: Send + Sync + fmt::Debug {
    /// Replaces the record for `key` with `bytes`.
    fn write(&self, key: &RecordKey, bytes: &[u8]) -> io::Result<()>;

    /// Loads the record for `key`, `None` when absent.
    fn read(&self, key: &RecordKey) -> io::Result<Option<Vec<u8>>>;

    /// Deletes the record for `key`. Returns whether a file was removed.
    fn delete(&self, key: &RecordKey) -> io::Result<bool>;

    /// Deletes a record by the path reported in [`list_entries`](Self::list_entries).
    fn remove_record(&self, path: &Path) -> io::Result<bool>;

    /// Enumerates every record currently stored.
    fn list_entries(&self) -> io::Result<Vec<PersistedRecord>>;

    /// Root directory this store owns.
    fn root_directory(&self) -> &Path;
}
