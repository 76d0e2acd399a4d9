//! Group-membership sets stored inside the cache store.
//!
//! Adding a key is a read-modify-write of the whole set. Within one process the
//! update is serialized per group by [`GroupLocks`], so concurrent misses for
//! different keys of the same group cannot drop each other's membership.
//! Processes sharing a store still race; closing that gap needs an atomic set
//! primitive in the store itself.

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::{CacheEntryOptions, CacheStore};
use crate::{MediatorError, context::Context};

/// Decode a stored group payload. An empty payload is an empty set.
pub(crate) fn decode(payload: &[u8]) -> Result<HashSet<String>, MediatorError> {
    if payload.is_empty() {
        return Ok(HashSet::new());
    }
    Ok(serde_json::from_slice(payload)?)
}

pub(crate) fn encode(members: &HashSet<String>) -> Result<Bytes, MediatorError> {
    Ok(Bytes::from(serde_json::to_vec(members)?))
}

/// One async lock per group key, shared by every caching behavior of a mediator.
#[derive(Default)]
pub(crate) struct GroupLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl GroupLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, group_key: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.get(group_key) {
            return Arc::clone(lock.value());
        }
        Arc::clone(self.locks.entry(group_key.to_owned()).or_default().value())
    }

    /// Add `cache_key` to the set stored under `group_key`.
    ///
    /// The set is written back only when the key was not already a member.
    /// Returns whether a write happened.
    pub(crate) async fn track_member(
        &self,
        store: &dyn CacheStore,
        group_key: &str,
        cache_key: &str,
        options: CacheEntryOptions,
        ctx: &Context,
    ) -> Result<bool, MediatorError> {
        let lock = self.lock_for(group_key);
        let _held = ctx.guard(async { Ok::<_, MediatorError>(lock.lock().await) }).await?;
        add_member(store, group_key, cache_key, options, ctx).await
    }
}

async fn add_member(
    store: &dyn CacheStore,
    group_key: &str,
    cache_key: &str,
    options: CacheEntryOptions,
    ctx: &Context,
) -> Result<bool, MediatorError> {
    let mut members = match ctx.guard(store.get(group_key)).await? {
        Some(payload) => decode(&payload)?,
        None => HashSet::new(),
    };

    if !members.insert(cache_key.to_owned()) {
        return Ok(false);
    }

    ctx.guard(store.set(group_key, encode(&members)?, options))
        .await?;
    Ok(true)
}
