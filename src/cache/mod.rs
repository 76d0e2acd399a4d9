//! Caching layer — the store contract, cacheable requests and group invalidation.
//!
//! The crate never owns cached data. Payloads and group-membership sets live in a
//! [`CacheStore`]; the [`CachingBehavior`](crate::behaviors::CachingBehavior) reads
//! and writes it on the request path, and the invalidation notifications in this
//! module remove entries from it on the write path.
//!
//! ## Groups
//!
//! A cache group is a JSON array of cache keys stored in the cache store under the
//! group key itself. Every cache write that declares a group adds its key to that
//! set; publishing [`CacheGroupInvalidationNotification`] removes every member and
//! then the group key.

use std::time::Duration;

use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::request::{BoxFuture, Request};

mod group;
mod invalidation;
mod memory;

pub use invalidation::{
    CacheGroupInvalidationHandler, CacheGroupInvalidationNotification, CacheInvalidationHandler,
    CacheInvalidationNotification,
};
pub use memory::MemoryCacheStore;

pub(crate) use group::GroupLocks;

/// Errors surfaced by a [`CacheStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),

    #[error("cache store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Expiration policy for one cache entry.
///
/// When both are set, a sliding window never extends an entry past its absolute
/// deadline. When neither is set the entry does not expire unless the store
/// applies a default of its own.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheEntryOptions {
    pub absolute_expiration_relative_to_now: Option<Duration>,
    pub sliding_expiration: Option<Duration>,
}

impl CacheEntryOptions {
    /// Expire `ttl` after the write, regardless of access.
    pub fn absolute(ttl: Duration) -> Self {
        Self {
            absolute_expiration_relative_to_now: Some(ttl),
            sliding_expiration: None,
        }
    }

    /// Expire after `window` without reads.
    pub fn sliding(window: Duration) -> Self {
        Self {
            absolute_expiration_relative_to_now: None,
            sliding_expiration: Some(window),
        }
    }
}

/// Byte-oriented key-value store with per-key expiration.
///
/// All operations are asynchronous and independently retryable by the caller;
/// nothing in this crate retries them.
pub trait CacheStore: Send + Sync + 'static {
    /// Fetch the payload stored under `key`, or `None` when absent or expired.
    fn get(&self, key: &str) -> BoxFuture<Result<Option<Bytes>, StoreError>>;

    /// Store `value` under `key`, replacing any previous payload.
    fn set(
        &self,
        key: &str,
        value: Bytes,
        options: CacheEntryOptions,
    ) -> BoxFuture<Result<(), StoreError>>;

    /// Remove `key`. Removing an absent key succeeds.
    fn remove(&self, key: &str) -> BoxFuture<Result<(), StoreError>>;
}

/// A [`Request`] whose response can be served from the cache.
///
/// The response must round-trip through JSON exactly.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use courier::{CacheableRequest, Request};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Widget {
///     id: u64,
///     name: String,
/// }
///
/// struct GetWidget {
///     id: u64,
/// }
///
/// impl Request for GetWidget {
///     type Response = Widget;
/// }
///
/// impl CacheableRequest for GetWidget {
///     fn cache_key(&self) -> String {
///         format!("widget:{}", self.id)
///     }
///
///     fn cache_group_key(&self) -> Option<String> {
///         Some("widgets".to_string())
///     }
///
///     fn absolute_expiration_relative_to_now(&self) -> Option<Duration> {
///         Some(Duration::from_secs(60))
///     }
/// }
/// ```
pub trait CacheableRequest: Request<Response: Serialize + DeserializeOwned> {
    /// Key of the cached response. Must be stable for a logical query.
    fn cache_key(&self) -> String;

    /// Group the key belongs to, for bulk invalidation.
    fn cache_group_key(&self) -> Option<String> {
        None
    }

    /// Time-to-live of the cached response. `None` means no expiration.
    fn absolute_expiration_relative_to_now(&self) -> Option<Duration> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_constructors() {
        let abs = CacheEntryOptions::absolute(Duration::from_secs(5));
        assert_eq!(abs.absolute_expiration_relative_to_now, Some(Duration::from_secs(5)));
        assert_eq!(abs.sliding_expiration, None);

        let sliding = CacheEntryOptions::sliding(Duration::from_secs(2));
        assert_eq!(sliding.sliding_expiration, Some(Duration::from_secs(2)));
        assert_eq!(CacheEntryOptions::default().sliding_expiration, None);
    }

    #[test]
    fn store_error_messages() {
        let err = StoreError::Unavailable("connection refused".into());
        assert_eq!(err.to_string(), "cache store unavailable: connection refused");
    }
}
