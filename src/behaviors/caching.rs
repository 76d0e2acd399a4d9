use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use crate::{
    MediatorError,
    cache::{CacheEntryOptions, CacheStore, CacheableRequest, GroupLocks},
    context::Context,
    pipeline::{Next, PipelineBehavior},
    request::BoxFuture,
};

/// Cache-aside around the rest of the pipeline for a [`CacheableRequest`].
///
/// A hit is served from the store without calling `next`. A miss calls `next`,
/// stores the JSON-encoded response under the request's cache key and, when the
/// request declares a group, records the key in that group.
pub struct CachingBehavior<R> {
    store: Arc<dyn CacheStore>,
    groups: Arc<GroupLocks>,
    _request: PhantomData<fn(R)>,
}

impl<R> CachingBehavior<R> {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self::with_group_locks(store, Arc::new(GroupLocks::new()))
    }

    pub(crate) fn with_group_locks(store: Arc<dyn CacheStore>, groups: Arc<GroupLocks>) -> Self {
        Self {
            store,
            groups,
            _request: PhantomData,
        }
    }
}

/// Type-erased constructor stored at registration time. Every behavior built
/// by one mediator shares `groups`.
pub(crate) fn caching_behavior<R: CacheableRequest>(
    store: Arc<dyn CacheStore>,
    groups: Arc<GroupLocks>,
) -> Arc<dyn PipelineBehavior<R>> {
    Arc::new(CachingBehavior::<R>::with_group_locks(store, groups))
}

impl<R: CacheableRequest> PipelineBehavior<R> for CachingBehavior<R> {
    fn handle(
        &self,
        request: Arc<R>,
        ctx: Context,
        next: Next<R>,
    ) -> BoxFuture<Result<R::Response, MediatorError>> {
        let store = Arc::clone(&self.store);
        let groups = Arc::clone(&self.groups);
        Box::pin(async move {
            let name = ctx.request_name();
            let cache_key = request.cache_key();

            if let Some(payload) = ctx.guard(store.get(&cache_key)).await? {
                info!(request = name, cache_key = %cache_key, "cache hit");
                return Ok(serde_json::from_slice(&payload)?);
            }
            info!(request = name, cache_key = %cache_key, "cache miss");

            let group_key = request.cache_group_key();
            let options = CacheEntryOptions {
                absolute_expiration_relative_to_now: request.absolute_expiration_relative_to_now(),
                sliding_expiration: None,
            };

            let response = next.run(request, ctx.clone()).await?;
            if ctx.is_cancelled() {
                return Err(MediatorError::Cancelled);
            }

            let payload = Bytes::from(serde_json::to_vec(&response)?);
            ctx.guard(store.set(&cache_key, payload, options)).await?;

            if let Some(group_key) = group_key {
                let written = groups
                    .track_member(store.as_ref(), &group_key, &cache_key, options, &ctx)
                    .await?;
                debug!(
                    cache_key = %cache_key,
                    cache_group_key = %group_key,
                    written,
                    "cache group updated"
                );
            }

            Ok(response)
        })
    }
}
