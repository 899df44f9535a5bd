//! Filesystem persistence store.
//!
//! One file per record under an exclusively owned root directory. Writes go
//! to a temporary file first and are renamed into place, so a record is
//! either fully present or absent.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, info, warn};

use super::{PersistedRecord, PersistenceStore, RecordKey};
use crate::error::{CacheError, Result};

/// Roots currently owned by a live store in this process.
static CLAIMED_DIRECTORIES: Mutex<BTreeSet<PathBuf>> = Mutex::new(BTreeSet::new());

/// Distinguishes temporary roots created by the same process.
static TEMPORARY_ROOTS: AtomicU64 = AtomicU64::new(0);

// == Directory Claim ==
/// Exclusive in-process ownership of a persistence root, released on drop.
#[derive(Debug)]
struct DirectoryClaim {
    path: PathBuf,
}

impl DirectoryClaim {
    fn acquire(path: &Path) -> Result<Self> {
        let mut claimed = CLAIMED_DIRECTORIES
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !claimed.insert(path.to_path_buf()) {
            return Err(CacheError::Configuration(format!(
                "Persistence directory {} is already owned by another cache",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

impl Drop for DirectoryClaim {
    fn drop(&mut self) {
        CLAIMED_DIRECTORIES
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.path);
    }
}

// == Disk Store ==
/// [`PersistenceStore`] backed by plain files.
#[derive(Debug)]
pub struct DiskStore {
    /// Canonical root directory
    root: PathBuf,
    /// Last write sequence handed out
    sequence: AtomicU64,
    /// Write sequence of every record written by this store
    written: Mutex<HashMap<PathBuf, u64>>,
    _claim: DirectoryClaim,
}

impl DiskStore {
    // == Constructor ==
    /// Opens a store rooted at `root`, creating the directory if needed.
    ///
    /// Fails with a configuration error if another live store in this
    /// process already owns the same directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root)?;
        let root = fs::canonicalize(root)?;
        let claim = DirectoryClaim::acquire(&root)?;

        info!(root = %root.display(), "Persistence store opened");

        Ok(Self {
            root,
            sequence: AtomicU64::new(0),
            written: Mutex::new(HashMap::new()),
            _claim: claim,
        })
    }

    /// Opens a store in a fresh directory under the system temp dir.
    pub fn open_temporary() -> Result<Self> {
        let root = std::env::temp_dir().join(format!(
            "two-level-cache-{}-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_millis(),
            TEMPORARY_ROOTS.fetch_add(1, Ordering::Relaxed)
        ));
        Self::open(root)
    }

    fn record_path(&self, key: &RecordKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    fn written(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, u64>> {
        self.written.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PersistenceStore for DiskStore {
    fn write(&self, key: &RecordKey, bytes: &[u8]) -> io::Result<()> {
        let path = self.record_path(key);
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        // Fixed-width name: unique per write and short enough for any key
        let tmp = self.root.join(format!("write-{:020}.tmp", sequence));

        fs::write(&tmp, bytes)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        self.written().insert(path, sequence);
        Ok(())
    }

    fn read(&self, key: &RecordKey) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.record_path(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn delete(&self, key: &RecordKey) -> io::Result<bool> {
        self.remove_record(&self.record_path(key))
    }

    fn remove_record(&self, path: &Path) -> io::Result<bool> {
        let removed = match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e),
        };
        self.written().remove(path);
        Ok(removed)
    }

    fn list_entries(&self) -> io::Result<Vec<PersistedRecord>> {
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let path = entry.path();

            let metadata = match entry.metadata() {
                Ok(metadata) => metadata,
                // Deleted between read_dir and stat
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };
            if metadata.is_dir() {
                continue;
            }

            if RecordKey::from_path(&path).is_none() {
                if path.extension().map_or(false, |ext| ext == "tmp") {
                    debug!(path = %path.display(), "Skipping in-flight record write");
                } else {
                    warn!(path = %path.display(), "Foreign file in persistence directory");
                }
                continue;
            }

            let sequence = self.written().get(&path).copied().unwrap_or(0);
            records.push(PersistedRecord {
                path,
                modified: metadata.modified()?,
                sequence,
            });
        }

        Ok(records)
    }

    fn root_directory(&self) -> &Path {
        &self.root
    }
}
