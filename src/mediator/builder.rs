use std::sync::Arc;

use dashmap::DashMap;
use tracing::{info, warn};

use super::{Inner, Mediator};
use crate::{
    behaviors::caching_behavior,
    cache::{
        CacheGroupInvalidationHandler, CacheGroupInvalidationNotification,
        CacheInvalidationHandler, CacheInvalidationNotification, CacheStore, CacheableRequest,
        GroupLocks,
    },
    config::MediatorOptions,
    metrics::{MetricsSink, NoopMetrics},
    notification::{Notification, NotificationHandler},
    pipeline::PipelineBehavior,
    registry::{NotificationRegistration, RequestRegistration, TypeMap},
    request::{Request, RequestHandler, short_type_name},
    validation::Validator,
};

/// Collects handlers, validators, behaviors and subscribers, then freezes them
/// into a [`Mediator`].
///
/// Registration happens once, up front. Nothing can be added to a built
/// mediator.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use courier::{Mediator, MediatorOptions, MemoryCacheStore, metrics::InMemoryMetrics};
///
/// let mediator = Mediator::builder()
///     .options(MediatorOptions::from_env())
///     .metrics(Arc::new(InMemoryMetrics::new()))
///     .cache_store(Arc::new(MemoryCacheStore::new()))
///     .build();
/// ```
pub struct MediatorBuilder {
    requests: TypeMap,
    notifications: TypeMap,
    options: MediatorOptions,
    metrics: Arc<dyn MetricsSink>,
    store: Option<Arc<dyn CacheStore>>,
}

impl MediatorBuilder {
    pub fn new() -> Self {
        Self {
            requests: TypeMap::new(),
            notifications: TypeMap::new(),
            options: MediatorOptions::default(),
            metrics: Arc::new(NoopMetrics),
            store: None,
        }
    }

    /// Switch built-in behaviors on or off.
    #[must_use]
    pub fn options(mut self, options: MediatorOptions) -> Self {
        self.options = options;
        self
    }

    /// Sink for the counters and histograms emitted by built-in behaviors.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Cache store used by the caching behavior and the invalidation handlers.
    ///
    /// Building with a store subscribes [`CacheInvalidationHandler`] and
    /// [`CacheGroupInvalidationHandler`] to their notifications.
    #[must_use]
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register the handler for `R`. A later registration replaces an earlier one.
    #[must_use]
    pub fn handler<R: Request>(mut self, handler: impl RequestHandler<R>) -> Self {
        self.requests.update::<RequestRegistration<R>>(|registration| {
            if registration.handler.replace(Arc::new(handler)).is_some() {
                warn!(
                    request = short_type_name::<R>(),
                    "replacing previously registered handler"
                );
            }
            registration.caching = None;
        });
        self
    }

    /// Register the handler for a cacheable `R` and put the caching behavior in
    /// front of it.
    ///
    /// Caching only applies when a cache store is configured and caching is
    /// enabled in the options.
    #[must_use]
    pub fn cacheable_handler<R: CacheableRequest>(self, handler: impl RequestHandler<R>) -> Self {
        let mut builder = self.handler::<R>(handler);
        builder
            .requests
            .update::<RequestRegistration<R>>(|registration| {
                registration.caching = Some(caching_behavior::<R>);
            });
        builder
    }

    /// Add a validator for `R`. All validators of a type run on every call.
    #[must_use]
    pub fn validator<R: Request>(mut self, validator: impl Validator<R>) -> Self {
        self.requests
            .update::<RequestRegistration<R>>(|registration| {
                registration.validators.push(Arc::new(validator));
            });
        self
    }

    /// Append a custom behavior for `R`, inside the built-in ones.
    #[must_use]
    pub fn behavior<R: Request>(mut self, behavior: impl PipelineBehavior<R>) -> Self {
        self.requests
            .update::<RequestRegistration<R>>(|registration| {
                registration.behaviors.push(Arc::new(behavior));
            });
        self
    }

    /// Subscribe a handler to notifications of type `N`.
    #[must_use]
    pub fn notification_handler<N: Notification>(
        mut self,
        handler: impl NotificationHandler<N>,
    ) -> Self {
        self.notifications
            .update::<NotificationRegistration<N>>(|registration| {
                registration.handlers.push(Arc::new(handler));
            });
        self
    }

    pub fn build(mut self) -> Mediator {
        if let Some(store) = self.store.clone() {
            self = self
                .notification_handler::<CacheInvalidationNotification>(
                    CacheInvalidationHandler::new(Arc::clone(&store)),
                )
                .notification_handler::<CacheGroupInvalidationNotification>(
                    CacheGroupInvalidationHandler::new(store),
                );
        }

        info!(
            logging = self.options.logging,
            validation = self.options.validation,
            caching = self.options.caching,
            cache_store = self.store.is_some(),
            "mediator built"
        );

        Mediator {
            inner: Arc::new(Inner {
                requests: self.requests,
                notifications: self.notifications,
                options: self.options,
                metrics: self.metrics,
                store: self.store,
                groups: Arc::new(GroupLocks::new()),
                plans: DashMap::new(),
            }),
        }
    }
}

impl Default for MediatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
