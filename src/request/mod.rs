//! Request/response contracts and request handlers.
//!
//! A [`Request`] is a plain value whose concrete type selects exactly one
//! [`RequestHandler`]. The response type is fixed by the request through the
//! [`Request::Response`] associated type, so the dispatcher is fully typed end to end.
//!
//! Requests that produce nothing meaningful use `()` as their response.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::{MediatorError, context::Context};

/// Heap-allocated, `Send` future used at every type-erased seam of the pipeline.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A one-shot operation answered by exactly one handler.
///
/// # Examples
///
/// ```rust
/// use courier::Request;
///
/// struct GetWidget {
///     id: u64,
/// }
///
/// impl Request for GetWidget {
///     type Response = String;
/// }
/// ```
pub trait Request: Send + Sync + 'static {
    /// The value produced by this request's handler.
    type Response: Send + 'static;
}

/// Handles one concrete request type.
///
/// Handlers receive the request behind an [`Arc`] so the returned future can be
/// `'static` without copying the request.
pub trait RequestHandler<R: Request>: Send + Sync + 'static {
    /// Produce the response for `request`, or fail.
    fn handle(&self, request: Arc<R>, ctx: Context) -> BoxFuture<Result<R::Response, MediatorError>>;
}

/// A [`RequestHandler`] backed by an async closure. Built with [`handler_fn`].
pub struct HandlerFn<F> {
    f: F,
}

/// Wrap an async closure as a [`RequestHandler`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use courier::{Mediator, Request, context::Context, handler_fn};
///
/// struct Ping;
///
/// impl Request for Ping {
///     type Response = &'static str;
/// }
///
/// let mediator = Mediator::builder()
///     .handler::<Ping>(handler_fn(|_req: Arc<Ping>, _ctx: Context| async { Ok("pong") }))
///     .build();
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F> {
    HandlerFn { f }
}

impl<R, F, Fut> RequestHandler<R> for HandlerFn<F>
where
    R: Request,
    F: Fn(Arc<R>, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R::Response, MediatorError>> + Send + 'static,
{
    fn handle(&self, request: Arc<R>, ctx: Context) -> BoxFuture<Result<R::Response, MediatorError>> {
        Box::pin((self.f)(request, ctx))
    }
}

/// Short type name without the module path, e.g. `GetWidget` or `Envelope<u32>`.
///
/// Slices the `'static` string returned by [`std::any::type_name`], so nothing is
/// allocated.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let path_end = full.find('<').unwrap_or(full.len());
    let start = full[..path_end].rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}
