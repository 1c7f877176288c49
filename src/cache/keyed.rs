//! Keyed memoization with per-key single flight.
//!
//! [`KeyedCache`] keeps entries in a moka cache and optionally mirrors them to a
//! [`DiskStore`]. Lookups for one key are serialized by that key's lock only; unrelated
//! keys never wait on each other.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::store::DiskStore;

/// Whether a value came from the cache or was produced by this call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheStatus::Hit)
    }
}

/// A cached value with its insertion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stored<V> {
    pub stored_at: DateTime<Utc>,
    pub value: V,
}

/// Hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Map of key → async mutex. Entries are dropped once no task holds or waits on them.
#[derive(Default)]
pub struct KeyLocks {
    locks: Mutex<HashMap<[u8; 32], Arc<tokio::sync::Mutex<()>>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lease(&self, key: [u8; 32]) -> KeyLease<'_> {
        let lock = Arc::clone(self.locks.lock().entry(key).or_default());
        KeyLease {
            locks: self,
            key,
            lock,
        }
    }

    /// Number of keys currently locked or contended.
    pub fn active(&self) -> usize {
        self.locks.lock().len()
    }
}

struct KeyLease<'a> {
    locks: &'a KeyLocks,
    key: [u8; 32],
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for KeyLease<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.locks.lock();
        // Map + this lease; any waiter holds a third clone.
        if Arc::strong_count(&self.lock) <= 2 {
            locks.remove(&self.key);
        }
    }
}

/// Memory (+ optional disk) cache keyed by 32-byte digests.
pub struct KeyedCache<V> {
    name: &'static str,
    memory: Cache<[u8; 32], Arc<Stored<V>>>,
    disk: Option<DiskStore>,
    locks: KeyLocks,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> KeyedCache<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// In-memory only.
    pub fn in_memory(name: &'static str) -> Self {
        Self::build(name, None)
    }

    /// Memory in front of a [`DiskStore`].
    pub fn persistent(name: &'static str, disk: DiskStore) -> Self {
        Self::build(name, Some(disk))
    }

    fn build(name: &'static str, disk: Option<DiskStore>) -> Self {
        Self {
            name,
            // Unbounded: entries leave only through `invalidate` or freshness checks.
            memory: Cache::builder().build(),
            disk,
            locks: KeyLocks::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.disk.is_some()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Looks a key up in memory, then on disk. Does not take the key lock.
    pub fn peek(&self, key: &[u8; 32]) -> Option<Arc<Stored<V>>> {
        if let Some(stored) = self.memory.get(key) {
            return Some(stored);
        }

        let disk = self.disk.as_ref()?;
        match disk.load::<Stored<V>>(key) {
            Ok(Some(stored)) => {
                let stored = Arc::new(stored);
                self.memory.insert(*key, Arc::clone(&stored));
                Some(stored)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(cache = self.name, error = %e, "unreadable cache entry, treating as miss");
                None
            }
        }
    }

    /// Stores a value under `key` in memory and, if configured, on disk.
    pub fn insert(&self, key: [u8; 32], value: V) {
        let stored = Arc::new(Stored {
            stored_at: Utc::now(),
            value,
        });

        if let Some(disk) = &self.disk
            && let Err(e) = disk.store(&key, stored.as_ref())
        {
            warn!(cache = self.name, error = %e, "failed to persist cache entry");
        }
        self.memory.insert(key, stored);
    }

    /// Drops `key` from memory and disk.
    pub fn invalidate(&self, key: &[u8; 32]) {
        self.memory.invalidate(key);
        if let Some(disk) = &self.disk
            && let Err(e) = disk.remove(key)
        {
            warn!(cache = self.name, error = %e, "failed to remove cache entry");
        }
    }

    /// Returns the cached value for `key` if `is_fresh` accepts it; otherwise runs
    /// `produce` while holding the key's lock and caches an `Ok` result.
    ///
    /// Concurrent callers for one key wait for the in-flight producer and then see its
    /// stored value. Errors are returned to the producing caller and not cached.
    pub async fn get_or_try_insert_with<F, Fut, E>(
        &self,
        key: [u8; 32],
        is_fresh: impl Fn(&Stored<V>) -> bool,
        produce: F,
    ) -> Result<(V, CacheStatus), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let lease = self.locks.lease(key);
        let _guard = lease.lock.lock().await;

        if let Some(stored) = self.peek(&key).filter(|stored| is_fresh(stored)) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(cache = self.name, "cache hit");
            return Ok((stored.value.clone(), CacheStatus::Hit));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(cache = self.name, "cache miss");
        let value = produce().await?;
        self.insert(key, value.clone());
        Ok((value, CacheStatus::Miss))
    }

    /// Number of keys with an in-flight or waiting caller.
    pub fn active_keys(&self) -> usize {
        self.locks.active()
    }
}

impl<V> std::fmt::Debug for KeyedCache<V>
where
    V: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedCache")
            .field("name", &self.name)
            .field("entries", &self.memory.entry_count())
            .field("persistent", &self.disk.is_some())
            .finish()
    }
}
