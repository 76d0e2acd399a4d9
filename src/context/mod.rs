//! Per-call context — request identity and cancellation.
//!
//! A [`Context`] is created once per [`Mediator::send`](crate::Mediator::send) or
//! [`Mediator::publish`](crate::Mediator::publish) call and cloned into every
//! behavior, the handler and every cache-store operation, so one cancellation
//! signal reaches every stage of the pipeline.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::MediatorError;

/// Per-call state handed to handlers, behaviors, validators and subscribers.
///
/// Cloning is cheap: the cancellation token is reference-counted and the request
/// name is a `&'static str`.
#[derive(Debug, Clone)]
pub struct Context {
    request_name: &'static str,
    cancellation: CancellationToken,
}

impl Context {
    /// Create a context for a single call.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use courier::context::Context;
    /// use tokio_util::sync::CancellationToken;
    ///
    /// let ctx = Context::new("GetWidget", CancellationToken::new());
    /// assert_eq!(ctx.request_name(), "GetWidget");
    /// assert!(!ctx.is_cancelled());
    /// ```
    pub fn new(request_name: &'static str, cancellation: CancellationToken) -> Self {
        Self {
            request_name,
            cancellation,
        }
    }

    /// Short type name of the request or notification being processed.
    pub fn request_name(&self) -> &'static str {
        self.request_name
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Await `fut` unless the call is cancelled first.
    ///
    /// Cancellation wins ties, so an already-cancelled context never starts the
    /// wrapped operation. Errors from `fut` are converted into [`MediatorError`].
    ///
    /// # Errors
    ///
    /// Returns [`MediatorError::Cancelled`] when the token fires, otherwise the
    /// converted error of `fut`.
    pub async fn guard<T, E, F>(&self, fut: F) -> Result<T, MediatorError>
    where
        F: Future<Output = Result<T, E>>,
        MediatorError: From<E>,
    {
        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => Err(MediatorError::Cancelled),
            result = fut => result.map_err(MediatorError::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StoreError;

    #[tokio::test]
    async fn guard_passes_through_results() {
        let ctx = Context::new("Test", CancellationToken::new());
        let value = ctx.guard(async { Ok::<_, StoreError>(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn guard_converts_errors() {
        let ctx = Context::new("Test", CancellationToken::new());
        let err = ctx
            .guard(async { Err::<(), _>(StoreError::Unavailable("down".into())) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "store");
    }

    #[tokio::test]
    async fn guard_short_circuits_when_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = Context::new("Test", token);
        let err = ctx
            .guard(async { Ok::<_, StoreError>(()) })
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn clones_share_cancellation() {
        let ctx = Context::new("Test", CancellationToken::new());
        let clone = ctx.clone();
        ctx.cancellation().cancel();
        assert!(clone.is_cancelled());
    }
}
