//! In-memory [`PersistenceStore`] for unit tests, with failure injection.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use super::{PersistedRecord, PersistenceStore, RecordKey};

#[derive(Debug)]
struct StubRecord {
    bytes: Vec<u8>,
    modified: SystemTime,
    sequence: u64,
}

#[derive(Debug)]
pub struct StubStore {
    root: PathBuf,
    records: Mutex<BTreeMap<PathBuf, StubRecord>>,
    undeletable: Mutex<HashSet<PathBuf>>,
    writes: AtomicUsize,
    sequence: AtomicU64,
}

impl StubStore {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/stub"),
            records: Mutex::new(BTreeMap::new()),
            undeletable: Mutex::new(HashSet::new()),
            writes: AtomicUsize::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn path_for(&self, key: &RecordKey) -> PathBuf {
        self.root.join(key.file_name())
    }

    /// Inserts a record whose modification time lies `age` in the past.
    pub fn insert_aged(&self, key: &RecordKey, bytes: &[u8], age: Duration) {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.records.lock().unwrap().insert(
            self.path_for(key),
            StubRecord {
                bytes: bytes.to_vec(),
                modified: SystemTime::now() - age,
                sequence,
            },
        );
    }

    /// Makes every later delete of `key` fail with `PermissionDenied`.
    pub fn deny_delete(&self, key: &RecordKey) {
        self.undeletable.lock().unwrap().insert(self.path_for(key));
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.records.lock().unwrap().contains_key(&self.path_for(key))
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

impl PersistenceStore for StubStore {
    fn write(&self, key: &RecordKey, bytes: &[u8]) -> io::Result<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.insert_aged(key, bytes, Duration::ZERO);
        Ok(())
    }

    fn read(&self, key: &RecordKey) -> io::Result<Option<Vec<u8>>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .get(&self.path_for(key))
            .map(|r| r.bytes.clone()))
    }

    fn delete(&self, key: &RecordKey) -> io::Result<bool> {
        self.remove_record(&self.path_for(key))
    }

    fn remove_record(&self, path: &Path) -> io::Result<bool> {
        if self.undeletable.lock().unwrap().contains(path) {
            return Err(io::Error::from(io::ErrorKind::PermissionDenied));
        }
        Ok(self.records.lock().unwrap().remove(path).is_some())
    }

    fn list_entries(&self) -> io::Result<Vec<PersistedRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .map(|(path, r)| PersistedRecord {
                path: path.clone(),
                modified: r.modified,
                sequence: r.sequence,
            })
            .collect())
    }

    fn root_directory(&self) -> &Path {
        &self.root
    }
}
