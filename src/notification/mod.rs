//! Broadcast notifications and their subscribers.
//!
//! Unlike a [`Request`](crate::Request), a [`Notification`] has no response and
//! any number of [`NotificationHandler`]s, including none, may subscribe to it.
//! Subscribers must not depend on one another's ordering.

use std::future::Future;
use std::sync::Arc;

use crate::{MediatorError, context::Context, request::BoxFuture};

/// A value broadcast to every subscriber of its concrete type.
pub trait Notification: Send + Sync + 'static {}

/// Subscriber for one notification type.
pub trait NotificationHandler<N: Notification>: Send + Sync + 'static {
    fn handle(&self, notification: Arc<N>, ctx: Context) -> BoxFuture<Result<(), MediatorError>>;
}

/// A [`NotificationHandler`] backed by an async closure.
/// Built with [`notification_handler_fn`].
pub struct NotificationHandlerFn<F> {
    f: F,
}

/// Wrap an async closure as a [`NotificationHandler`].
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use courier::{Notification, context::Context, notification::notification_handler_fn};
///
/// struct WidgetRenamed {
///     id: u64,
/// }
///
/// impl Notification for WidgetRenamed {}
///
/// let audit = notification_handler_fn(|event: Arc<WidgetRenamed>, _ctx: Context| async move {
///     println!("widget {} renamed", event.id);
///     Ok::<(), courier::MediatorError>(())
/// });
/// ```
pub fn notification_handler_fn<F>(f: F) -> NotificationHandlerFn<F> {
    NotificationHandlerFn { f }
}

impl<N, F, Fut> NotificationHandler<N> for NotificationHandlerFn<F>
where
    N: Notification,
    F: Fn(Arc<N>, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), MediatorError>> + Send + 'static,
{
    fn handle(&self, notification: Arc<N>, ctx: Context) -> BoxFuture<Result<(), MediatorError>> {
        Box::pin((self.f)(notification, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_util::sync::CancellationToken;

    struct Tick(usize);

    impl Notification for Tick {}

    #[tokio::test]
    async fn closure_handler_receives_notification() {
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let handler = notification_handler_fn(move |tick: Arc<Tick>, _ctx: Context| {
            let sink = Arc::clone(&sink);
            async move {
                sink.fetch_add(tick.0, Ordering::SeqCst);
                Ok(())
            }
        });

        let ctx = Context::new("Tick", CancellationToken::new());
        handler.handle(Arc::new(Tick(3)), ctx.clone()).await.unwrap();
        handler.handle(Arc::new(Tick(4)), ctx).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }
}
