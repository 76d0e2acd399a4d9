//! In-memory [`CacheStore`] backed by Moka.

use std::time::{Duration, Instant};

use bytes::Bytes;
use moka::{Expiry, sync::Cache};
use tracing::debug;

use super::{CacheEntryOptions, CacheStore, StoreError};
use crate::request::BoxFuture;

/// Default maximum number of entries.
const DEFAULT_MAX_CAPACITY: u64 = 10_000;

#[derive(Clone)]
struct StoredEntry {
    payload: Bytes,
    sliding: Option<Duration>,
    deadline: Option<Instant>,
}

impl StoredEntry {
    // Remaining lifetime as seen at `now`: the sliding window, capped by the
    // absolute deadline when both are set.
    fn time_to_live(&self, now: Instant) -> Option<Duration> {
        let remaining = self.deadline.map(|d| d.saturating_duration_since(now));
        match (self.sliding, remaining) {
            (Some(window), Some(left)) => Some(window.min(left)),
            (Some(window), None) => Some(window),
            (None, left) => left,
        }
    }
}

struct EntryExpiry;

impl Expiry<String, StoredEntry> for EntryExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &StoredEntry,
        created_at: Instant,
    ) -> Option<Duration> {
        entry.time_to_live(created_at)
    }

    fn expire_after_read(
        &self,
        _key: &String,
        entry: &StoredEntry,
        read_at: Instant,
        duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        if entry.sliding.is_some() {
            entry.time_to_live(read_at)
        } else {
            duration_until_expiry
        }
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &StoredEntry,
        updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        entry.time_to_live(updated_at)
    }
}

/// A process-local cache store with absolute and sliding expiration.
///
/// Cloning is cheap; clones share the same entries.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use courier::{CacheStore, MemoryCacheStore};
///
/// let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
/// ```
#[derive(Clone)]
pub struct MemoryCacheStore {
    inner: Cache<String, StoredEntry>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Create a store holding at most `max_capacity` entries.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(EntryExpiry)
            .build();
        Self { inner }
    }

    /// Whether `key` currently holds an unexpired payload.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Approximate number of live entries.
    ///
    /// Note: This may lag behind recent writes until pending maintenance runs.
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCacheStore")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str) -> BoxFuture<Result<Option<Bytes>, StoreError>> {
        let payload = self.inner.get(key).map(|entry| entry.payload);
        Box::pin(std::future::ready(Ok(payload)))
    }

    fn set(
        &self,
        key: &str,
        value: Bytes,
        options: CacheEntryOptions,
    ) -> BoxFuture<Result<(), StoreError>> {
        let entry = StoredEntry {
            payload: value,
            sliding: options.sliding_expiration,
            deadline: options
                .absolute_expiration_relative_to_now
                .map(|ttl| Instant::now() + ttl),
        };
        debug!(key, bytes = entry.payload.len(), "cache set");
        self.inner.insert(key.to_owned(), entry);
        Box::pin(std::future::ready(Ok(())))
    }

    fn remove(&self, key: &str) -> BoxFuture<Result<(), StoreError>> {
        self.inner.invalidate(key);
        Box::pin(std::future::ready(Ok(())))
    }
}
