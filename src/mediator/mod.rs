//! The dispatcher: typed request dispatch and notification fan-out.
//!
//! [`Mediator::send`] resolves the single handler registered for the request's
//! concrete type, wraps it in the behavior pipeline and awaits the result. The
//! pipeline for each request type is built on first use and cached, so later
//! calls only pay for a map lookup.
//!
//! [`Mediator::publish`] delivers a notification to every subscriber of its
//! type concurrently. Having no subscribers is not an error.

use std::any::{Any, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    MediatorError,
    behaviors::{LoggingBehavior, ValidationBehavior},
    cache::{CacheStore, GroupLocks},
    config::MediatorOptions,
    context::Context,
    metrics::MetricsSink,
    notification::Notification,
    pipeline::{Continuation, PipelineBehavior, chain},
    registry::{NotificationRegistration, RequestRegistration, TypeMap},
    request::{Request, short_type_name},
};

mod builder;

pub use builder::MediatorBuilder;

// The built pipeline for one request type.
struct Plan<R: Request> {
    run: Continuation<R>,
}

struct Inner {
    requests: TypeMap,
    notifications: TypeMap,
    options: MediatorOptions,
    metrics: Arc<dyn MetricsSink>,
    store: Option<Arc<dyn CacheStore>>,
    groups: Arc<GroupLocks>,
    plans: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

/// Dispatches requests to their handler and notifications to their subscribers.
///
/// A `Mediator` is immutable once built and cheap to clone; clones share the
/// registrations and the plan cache.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use courier::{Mediator, Request, context::Context, handler_fn};
///
/// struct Add(i64, i64);
///
/// impl Request for Add {
///     type Response = i64;
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let mediator = Mediator::builder()
///     .handler::<Add>(handler_fn(|req: Arc<Add>, _ctx: Context| async move { Ok(req.0 + req.1) }))
///     .build();
///
/// assert_eq!(mediator.send(Add(2, 3)).await.unwrap(), 5);
/// # }
/// ```
#[derive(Clone)]
pub struct Mediator {
    inner: Arc<Inner>,
}

impl Mediator {
    pub fn builder() -> MediatorBuilder {
        MediatorBuilder::new()
    }

    pub fn options(&self) -> MediatorOptions {
        self.inner.options
    }

    /// Number of request types whose pipeline has been built so far.
    pub fn cached_plans(&self) -> usize {
        self.inner.plans.len()
    }

    /// Dispatch `request` to its handler through the behavior pipeline.
    ///
    /// # Errors
    ///
    /// - [`MediatorError::HandlerNotFound`] when no handler is registered for `R`.
    /// - [`MediatorError::ValidationFailed`] when a validator rejects the request.
    /// - Any error raised by the handler, a behavior or the cache store, unchanged.
    pub async fn send<R: Request>(&self, request: R) -> Result<R::Response, MediatorError> {
        self.send_with(request, CancellationToken::new()).await
    }

    /// Like [`send`](Self::send), but abandons the call with
    /// [`MediatorError::Cancelled`] once `cancellation` fires.
    ///
    /// The token is carried in the call's [`Context`]. The handler and every
    /// cache-store operation race against it, and the resulting `Cancelled`
    /// unwinds through each behavior, so logging still records the outcome.
    pub async fn send_with<R: Request>(
        &self,
        request: R,
        cancellation: CancellationToken,
    ) -> Result<R::Response, MediatorError> {
        let plan = self.plan::<R>()?;
        let ctx = Context::new(short_type_name::<R>(), cancellation);
        (plan.run)(Arc::new(request), ctx).await
    }

    /// Deliver `notification` to every registered subscriber.
    ///
    /// Subscribers run concurrently and all of them run even when one fails.
    ///
    /// # Errors
    ///
    /// Returns the first subscriber error, after every subscriber has finished.
    pub async fn publish<N: Notification>(&self, notification: N) -> Result<(), MediatorError> {
        self.publish_with(notification, CancellationToken::new()).await
    }

    /// Like [`publish`](Self::publish), with a caller-supplied cancellation token.
    pub async fn publish_with<N: Notification>(
        &self,
        notification: N,
        cancellation: CancellationToken,
    ) -> Result<(), MediatorError> {
        let name = short_type_name::<N>();
        let handlers = match self.inner.notifications.get::<NotificationRegistration<N>>() {
            Some(registration) if !registration.handlers.is_empty() => {
                registration.handlers.clone()
            }
            _ => {
                debug!(notification = name, "no subscribers");
                return Ok(());
            }
        };

        let ctx = Context::new(name, cancellation.clone());
        let notification = Arc::new(notification);
        let deliveries = join_all(
            handlers
                .iter()
                .map(|handler| handler.handle(Arc::clone(&notification), ctx.clone())),
        );

        let results = tokio::select! {
            biased;
            _ = cancellation.cancelled() => Err(MediatorError::Cancelled),
            results = deliveries => Ok(results),
        }?;

        let mut first_error = None;
        for err in results.into_iter().filter_map(Result::err) {
            warn!(notification = name, error = %err, "notification handler failed");
            first_error.get_or_insert(err);
        }
        first_error.map_or(Ok(()), Err)
    }

    // Cached pipeline for `R`, built on first use. Concurrent first calls may
    // both build; the first insert wins and the other plan is dropped.
    fn plan<R: Request>(&self) -> Result<Arc<Plan<R>>, MediatorError> {
        let type_id = TypeId::of::<R>();
        let cached = self
            .inner
            .plans
            .get(&type_id)
            .map(|entry| Arc::clone(entry.value()));

        let erased = match cached {
            Some(plan) => plan,
            None => {
                let built: Arc<dyn Any + Send + Sync> = Arc::new(self.build_plan::<R>()?);
                Arc::clone(self.inner.plans.entry(type_id).or_insert(built).value())
            }
        };

        erased.downcast::<Plan<R>>().map_err(|_| {
            MediatorError::InvalidRequest(format!(
                "dispatch plan for {} has an unexpected type",
                short_type_name::<R>()
            ))
        })
    }

    fn build_plan<R: Request>(&self) -> Result<Plan<R>, MediatorError> {
        let inner = &self.inner;
        let name = short_type_name::<R>();
        let registration = inner.requests.get::<RequestRegistration<R>>();
        let handler = registration
            .and_then(|registration| registration.handler.clone())
            .ok_or(MediatorError::HandlerNotFound { request: name })?;

        let mut behaviors: Vec<Arc<dyn PipelineBehavior<R>>> = Vec::new();
        if inner.options.logging {
            behaviors.push(Arc::new(LoggingBehavior::<R>::new(Arc::clone(&inner.metrics))));
        }
        if inner.options.validation {
            let validators = registration
                .map(|registration| registration.validators.clone())
                .unwrap_or_default();
            behaviors.push(Arc::new(ValidationBehavior::new(
                validators,
                Arc::clone(&inner.metrics),
            )));
        }
        if inner.options.caching {
            let factory = registration.and_then(|registration| registration.caching);
            if let (Some(factory), Some(store)) = (factory, &inner.store) {
                behaviors.push(factory(Arc::clone(store), Arc::clone(&inner.groups)));
            }
        }
        if let Some(registration) = registration {
            behaviors.extend(registration.behaviors.iter().cloned());
        }

        debug!(request = name, behaviors = behaviors.len(), "dispatch plan built");
        Ok(Plan {
            run: chain(handler, &behaviors),
        })
    }
}

impl std::fmt::Debug for Mediator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mediator")
            .field("options", &self.inner.options)
            .field("cache_store", &self.inner.store.is_some())
            .field("cached_plans", &self.inner.plans.len())
            .finish()
    }
}
