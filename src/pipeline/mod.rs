//! Behavior pipeline — composable before/after logic around a request handler.
//!
//! This module defines the core types for building an ordered behavior stack.
//! Each behavior wraps the next layer, enabling request inspection, short-circuit
//! responses, and response decoration without coupling handlers to infrastructure
//! concerns.
//!
//! ## Core types
//!
//! - [`PipelineBehavior`] — trait implemented by all behaviors.
//! - [`Next`] — continuation into the remaining chain; call [`Next::run`] to
//!   advance to the next layer.
//! - [`Continuation`] — type-erased, cheaply-cloneable callable produced by
//!   [`chain`].
//! - [`behavior_fn`] — adapts an async closure into a [`PipelineBehavior`].
//!
//! ## Ordering
//!
//! [`chain`] folds the behavior list right to left around the handler, so the
//! first behavior in the list is the outermost: "before" code runs in list order
//! and "after" code runs in reverse order.

use std::future::Future;
use std::sync::Arc;

use crate::{
    MediatorError,
    context::Context,
    request::{BoxFuture, Request, RequestHandler},
};

/// A type-erased, reference-counted step of the pipeline.
///
/// The innermost continuation invokes the handler; every other one invokes a
/// behavior with the continuation beneath it as its [`Next`].
pub type Continuation<R> = Arc<
    dyn Fn(Arc<R>, Context) -> BoxFuture<Result<<R as Request>::Response, MediatorError>>
        + Send
        + Sync
        + 'static,
>;

/// The remainder of the pipeline below the current behavior.
///
/// `Next` is consumed by [`run`](Self::run), so a behavior cannot invoke the
/// rest of the chain more than once per call. Dropping it without calling
/// `run` short-circuits the pipeline.
pub struct Next<R: Request> {
    inner: Continuation<R>,
}

impl<R: Request> Next<R> {
    pub(crate) fn new(inner: Continuation<R>) -> Self {
        Self { inner }
    }

    /// Invokes the next behavior (or the handler) and returns its result.
    ///
    /// # Arguments
    ///
    /// - `request` — the request being dispatched.
    /// - `ctx` — the per-call [`Context`] to pass down the chain.
    pub async fn run(self, request: Arc<R>, ctx: Context) -> Result<R::Response, MediatorError> {
        (self.inner)(request, ctx).await
    }
}

/// The core trait for all pipeline behaviors.
///
/// Implementors receive the request, the call [`Context`] and a [`Next`]
/// continuation. They may:
///
/// - **Pass through** — return `next.run(request, ctx).await` unchanged.
/// - **Decorate** — call `next`, inspect or transform the result, and return it.
/// - **Short-circuit** — return without calling `next`; inner behaviors and the
///   handler never run, but outer behaviors still see the returned result.
///
/// # Contract
///
/// - Implementations **must** be `Send + Sync` because one instance serves every
///   concurrent call for its request type.
/// - Implementations **must not** swallow [`MediatorError::Cancelled`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use courier::{
///     MediatorError, Request,
///     context::Context,
///     pipeline::{Next, PipelineBehavior},
///     request::BoxFuture,
/// };
///
/// struct PassThrough;
///
/// impl<R: Request> PipelineBehavior<R> for PassThrough {
///     fn handle(
///         &self,
///         request: Arc<R>,
///         ctx: Context,
///         next: Next<R>,
///     ) -> BoxFuture<Result<R::Response, MediatorError>> {
///         Box::pin(async move { next.run(request, ctx).await })
///     }
/// }
/// ```
pub trait PipelineBehavior<R: Request>: Send + Sync + 'static {
    /// Handle the request and optionally delegate to the rest of the chain.
    fn handle(
        &self,
        request: Arc<R>,
        ctx: Context,
        next: Next<R>,
    ) -> BoxFuture<Result<R::Response, MediatorError>>;
}

/// A [`PipelineBehavior`] backed by an async closure. Built with [`behavior_fn`].
pub struct BehaviorFn<F> {
    f: F,
}

/// Wrap an async closure as a [`PipelineBehavior`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use courier::{Request, context::Context, pipeline::{Next, behavior_fn}};
///
/// struct Ping;
///
/// impl Request for Ping {
///     type Response = String;
/// }
///
/// let shout = behavior_fn(|req: Arc<Ping>, ctx: Context, next: Next<Ping>| async move {
///     next.run(req, ctx).await.map(|s| s.to_uppercase())
/// });
/// ```
pub fn behavior_fn<F>(f: F) -> BehaviorFn<F> {
    BehaviorFn { f }
}

impl<R, F, Fut> PipelineBehavior<R> for BehaviorFn<F>
where
    R: Request,
    F: Fn(Arc<R>, Context, Next<R>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R::Response, MediatorError>> + Send + 'static,
{
    fn handle(
        &self,
        request: Arc<R>,
        ctx: Context,
        next: Next<R>,
    ) -> BoxFuture<Result<R::Response, MediatorError>> {
        Box::pin((self.f)(request, ctx, next))
    }
}

/// Fold `behaviors` around `handler` into a single callable.
///
/// The innermost continuation races the handler against the call's cancellation
/// token, so a cancelled call ends with [`MediatorError::Cancelled`] flowing back
/// out through every behavior. The slice is walked back to front in place; the
/// first behavior ends up outermost.
pub fn chain<R: Request>(
    handler: Arc<dyn RequestHandler<R>>,
    behaviors: &[Arc<dyn PipelineBehavior<R>>],
) -> Continuation<R> {
    let mut next: Continuation<R> = Arc::new(
        move |request: Arc<R>, ctx: Context| -> BoxFuture<Result<R::Response, MediatorError>> {
            let handled = handler.handle(request, ctx.clone());
            Box::pin(async move { ctx.guard(handled).await })
        },
    );

    for behavior in behaviors.iter().rev() {
        let behavior = Arc::clone(behavior);
        let inner = next;
        next = Arc::new(move |request: Arc<R>, ctx: Context| {
            behavior.handle(request, ctx, Next::new(Arc::clone(&inner)))
        });
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::handler_fn;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    struct Lookup(&'static str);

    impl Request for Lookup {
        type Response = String;
    }

    type Trace = Arc<Mutex<Vec<String>>>;

    fn ctx() -> Context {
        Context::new("Lookup", CancellationToken::new())
    }

    fn counting_handler(calls: Arc<AtomicUsize>) -> Arc<dyn RequestHandler<Lookup>> {
        Arc::new(handler_fn(move |req: Arc<Lookup>, _ctx: Context| {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(format!("handled {}", req.0))
            }
        }))
    }

    fn tracing_behavior(name: &'static str, trace: Trace) -> Arc<dyn PipelineBehavior<Lookup>> {
        Arc::new(behavior_fn(move |req: Arc<Lookup>, ctx: Context, next: Next<Lookup>| {
            let trace = Arc::clone(&trace);
            async move {
                trace.lock().unwrap().push(format!("{name}:before"));
                let result = next.run(req, ctx).await;
                trace.lock().unwrap().push(format!("{name}:after"));
                result
            }
        }))
    }

    #[tokio::test]
    async fn empty_chain_calls_handler_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let run = chain(counting_handler(Arc::clone(&calls)), &[]);
        let out = run(Arc::new(Lookup("x")), ctx()).await.unwrap();
        assert_eq!(out, "handled x");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn behaviors_nest_in_registration_order() {
        let trace: Trace = Arc::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let behaviors = vec![
            tracing_behavior("a", Arc::clone(&trace)),
            tracing_behavior("b", Arc::clone(&trace)),
            tracing_behavior("c", Arc::clone(&trace)),
        ];
        let run = chain(counting_handler(Arc::clone(&calls)), &behaviors);
        run(Arc::new(Lookup("x")), ctx()).await.unwrap();

        let trace = trace.lock().unwrap().clone();
        assert_eq!(
            trace,
            vec![
                "a:before", "b:before", "c:before", "c:after", "b:after", "a:after"
            ]
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn short_circuit_skips_inner_but_runs_outer_after() {
        let trace: Trace = Arc::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let inner_trace = Arc::clone(&trace);
        let short: Arc<dyn PipelineBehavior<Lookup>> =
            Arc::new(behavior_fn(move |_req: Arc<Lookup>, _ctx: Context, _next: Next<Lookup>| {
                let trace = Arc::clone(&inner_trace);
                async move {
                    trace.lock().unwrap().push("short".to_string());
                    Ok("short-circuited".to_string())
                }
            }));
        let behaviors = vec![
            tracing_behavior("outer", Arc::clone(&trace)),
            short,
            tracing_behavior("inner", Arc::clone(&trace)),
        ];
        let run = chain(counting_handler(Arc::clone(&calls)), &behaviors);
        let out = run(Arc::new(Lookup("x")), ctx()).await.unwrap();

        assert_eq!(out, "short-circuited");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            trace.lock().unwrap().clone(),
            vec!["outer:before", "short", "outer:after"]
        );
    }

    #[tokio::test]
    async fn decorating_behavior_transforms_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let modify: Arc<dyn PipelineBehavior<Lookup>> =
            Arc::new(behavior_fn(|req: Arc<Lookup>, ctx: Context, next: Next<Lookup>| async move {
                next.run(req, ctx).await.map(|s| format!("modified: {s}"))
            }));
        let run = chain(counting_handler(calls), &[modify]);
        let out = run(Arc::new(Lookup("y")), ctx()).await.unwrap();
        assert_eq!(out, "modified: handled y");
    }

    #[tokio::test]
    async fn chain_is_reusable_across_calls() {
        let calls = Arc::new(AtomicUsize::new(0));
        let trace: Trace = Arc::default();
        let run = chain(
            counting_handler(Arc::clone(&calls)),
            &[tracing_behavior("a", Arc::clone(&trace))],
        );
        run(Arc::new(Lookup("1")), ctx()).await.unwrap();
        run(Arc::new(Lookup("2")), ctx()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(trace.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn handler_errors_propagate_unchanged() {
        let failing: Arc<dyn RequestHandler<Lookup>> =
            Arc::new(handler_fn(|_req: Arc<Lookup>, _ctx: Context| async {
                Err(MediatorError::handler("handler exploded"))
            }));
        let trace: Trace = Arc::default();
        let run = chain(failing, &[tracing_behavior("a", Arc::clone(&trace))]);
        let err = run(Arc::new(Lookup("x")), ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "handler exploded");
        assert_eq!(trace.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_handler_unwinds_through_behaviors() {
        let stuck: Arc<dyn RequestHandler<Lookup>> =
            Arc::new(handler_fn(|_req: Arc<Lookup>, _ctx: Context| async {
                std::future::pending::<()>().await;
                Ok("unreachable".to_string())
            }));
        let trace: Trace = Arc::default();
        let run = chain(stuck, &[tracing_behavior("a", Arc::clone(&trace))]);

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = run(Arc::new(Lookup("x")), Context::new("Lookup", token))
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(trace.lock().unwrap().clone(), vec!["a:before", "a:after"]);
    }
}
