//! Removal notifications emitted by the memory tier.

use std::fmt;
use std::sync::Arc;

/// Why an entry left the memory tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Removed by `invalidate` / `invalidate_all`
    Explicit,
    /// Overwritten by a `put` for the same key
    Replaced,
    /// Evicted to stay within the memory bound; demoted to disk
    Size,
    /// Outlived an expiry window
    Expired,
}

impl RemovalCause {
    /// True when the cache removed the entry on its own.
    pub fn was_evicted(self) -> bool {
        matches!(self, RemovalCause::Size | RemovalCause::Expired)
    }
}

/// A removed entry together with its cause.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalNotification<K, V> {
    pub key: K,
    pub value: V,
    pub cause: RemovalCause,
}

impl<K, V> RemovalNotification<K, V> {
    pub fn new(key: K, value: V, cause: RemovalCause) -> Self {
        Self { key, value, cause }
    }
}

/// Callback invoked for every memory-tier removal.
///
/// Runs on the thread that triggered the removal, after internal locks are
/// released.
pub struct RemovalListener<K, V>(Arc<dyn Fn(&RemovalNotification<K, V>) + Send + Sync>);

impl<K, V> RemovalListener<K, V> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&RemovalNotification<K, V>) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn notify(&self, notification: &RemovalNotification<K, V>) {
        (self.0)(notification)
    }
}

impl<K, V> Clone for RemovalListener<K, V> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<K, V> fmt::Debug for RemovalListener<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RemovalListener")
    }
}
