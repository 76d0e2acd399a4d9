//! Invalidation notifications and their store-backed handlers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{CacheStore, group};
use crate::{
    MediatorError,
    context::Context,
    notification::{Notification, NotificationHandler},
    request::BoxFuture,
};

/// Invalidate a single cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInvalidationNotification {
    pub cache_key: String,
}

impl CacheInvalidationNotification {
    pub fn new(cache_key: impl Into<String>) -> Self {
        Self {
            cache_key: cache_key.into(),
        }
    }
}

impl Notification for CacheInvalidationNotification {}

/// Invalidate every entry registered under a cache group, and the group itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheGroupInvalidationNotification {
    pub cache_group_key: String,
}

impl CacheGroupInvalidationNotification {
    pub fn new(cache_group_key: impl Into<String>) -> Self {
        Self {
            cache_group_key: cache_group_key.into(),
        }
    }
}

impl Notification for CacheGroupInvalidationNotification {}

/// Removes the notified key from the store. Idempotent.
pub struct CacheInvalidationHandler {
    store: Arc<dyn CacheStore>,
}

impl CacheInvalidationHandler {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }
}

impl NotificationHandler<CacheInvalidationNotification> for CacheInvalidationHandler {
    fn handle(
        &self,
        notification: Arc<CacheInvalidationNotification>,
        ctx: Context,
    ) -> BoxFuture<Result<(), MediatorError>> {
        let store = Arc::clone(&self.store);
        Box::pin(async move {
            info!(cache_key = %notification.cache_key, "invalidating cache entry");
            ctx.guard(store.remove(&notification.cache_key)).await
        })
    }
}

/// Removes every member of the notified group, then the group key.
///
/// An absent or empty group is a no-op. Member removal keeps going after a
/// failure and the group key removal is always attempted; the first error is
/// returned once cleanup is done.
///
/// Cancellation is the exception: every removal races the call's token, so once
/// it fires no further removal starts and the group key stays in the store.
/// Members that survive remain listed in the group, and publishing the same
/// notification again finishes the job.
pub struct CacheGroupInvalidationHandler {
    store: Arc<dyn CacheStore>,
}

impl CacheGroupInvalidationHandler {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }
}

impl NotificationHandler<CacheGroupInvalidationNotification> for CacheGroupInvalidationHandler {
    fn handle(
        &self,
        notification: Arc<CacheGroupInvalidationNotification>,
        ctx: Context,
    ) -> BoxFuture<Result<(), MediatorError>> {
        let store = Arc::clone(&self.store);
        Box::pin(async move {
            let group_key = notification.cache_group_key.as_str();
            info!(cache_group_key = %group_key, "invalidating cache group");

            let payload = match ctx.guard(store.get(group_key)).await? {
                Some(payload) if !payload.is_empty() => payload,
                _ => return Ok(()),
            };

            let mut first_error = None;
            match group::decode(&payload) {
                Ok(members) => {
                    for cache_key in &members {
                        if let Err(err) = ctx.guard(store.remove(cache_key)).await {
                            warn!(cache_key = %cache_key, error = %err, "failed to remove group member");
                            first_error.get_or_insert(err);
                        }
                    }
                }
                Err(err) => {
                    warn!(cache_group_key = %group_key, error = %err, "unreadable cache group");
                    first_error = Some(err);
                }
            }

            if let Err(err) = ctx.guard(store.remove(group_key)).await {
                first_error.get_or_insert(err);
            }

            match first_error {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }
}
