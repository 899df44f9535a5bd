//! Record naming and value encoding.
//!
//! Keys are serialized to JSON and hex encoded, which gives every key a
//! deterministic, filesystem-safe file stem. Values are stored as JSON.

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Maximum serialized key length in bytes; twice this plus the extension
/// stays under common 255-byte file name limits.
pub const MAX_KEY_LENGTH: usize = 120;

/// Extension carried by every record file.
pub const RECORD_EXTENSION: &str = "cache";

// == Record Key ==
/// File stem identifying one persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(String);

impl RecordKey {
    /// Derives the record key for a cache key.
    pub fn for_key<K: Serialize + ?Sized>(key: &K) -> Result<Self> {
        let bytes = serde_json::to_vec(key)?;
        if bytes.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidKey(format!(
                "Serialized key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        Ok(Self(hex::encode(bytes)))
    }

    /// Recovers the record key from a record file path, if it is one.
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.extension()? != RECORD_EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        hex::decode(stem).ok()?;
        Some(Self(stem.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the record file inside the persistence root.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, RECORD_EXTENSION)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Values ==
/// Serializes a value into record bytes.
pub fn encode_value<V: Serialize>(value: &V) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Deserializes record bytes into a value.
pub fn decode_value<V: DeserializeOwned>(bytes: &[u8]) -> Result<V> {
    Ok(serde_json::from_slice(bytes)?)
}
