use std::marker::PhantomData;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::{
    MediatorError,
    context::Context,
    metrics::{ERRORS, MetricsSink, REQUEST_DURATION, REQUESTS, Tag},
    pipeline::{Next, PipelineBehavior},
    request::{BoxFuture, Request},
};

/// Structured logging and request metrics around the rest of the pipeline.
///
/// Emits a "handling" event on entry and a "handled" event on success, counts
/// every request in [`REQUESTS`] and records its duration in
/// [`REQUEST_DURATION`] tagged with `status`. Failures are counted in
/// [`ERRORS`] with their `error.kind` and returned unchanged.
///
/// `LoggingBehavior` does not short-circuit, so it is safe as the outermost
/// behavior.
pub struct LoggingBehavior<R> {
    metrics: Arc<dyn MetricsSink>,
    _request: PhantomData<fn(R)>,
}

impl<R> LoggingBehavior<R> {
    pub fn new(metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            metrics,
            _request: PhantomData,
        }
    }
}

impl<R: Request> PipelineBehavior<R> for LoggingBehavior<R> {
    fn handle(
        &self,
        request: Arc<R>,
        ctx: Context,
        next: Next<R>,
    ) -> BoxFuture<Result<R::Response, MediatorError>> {
        let metrics = Arc::clone(&self.metrics);
        Box::pin(async move {
            let name = ctx.request_name();
            let request_tag: Tag = ("request.name", name.to_string());

            info!(request = name, "handling request");
            metrics.increment(REQUESTS, 1, std::slice::from_ref(&request_tag));
            let start = Instant::now();

            let result = next.run(request, ctx).await;
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

            let status = match &result {
                Ok(_) => {
                    info!(request = name, elapsed_ms, "handled request");
                    "success"
                }
                Err(MediatorError::Cancelled) => {
                    info!(request = name, elapsed_ms, "request cancelled");
                    "cancelled"
                }
                Err(err) => {
                    let kind = err.kind();
                    metrics.increment(
                        ERRORS,
                        1,
                        &[request_tag.clone(), ("error.kind", kind.to_string())],
                    );
                    if matches!(err, MediatorError::ValidationFailed(_)) {
                        warn!(request = name, elapsed_ms, kind, error = %err, "request rejected");
                    } else {
                        error!(request = name, elapsed_ms, kind, error = %err, "request failed");
                    }
                    "error"
                }
            };

            metrics.record(
                REQUEST_DURATION,
                elapsed_ms,
                &[request_tag, ("status", status.to_string())],
            );
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metrics::InMemoryMetrics,
        pipeline::chain,
        request::{RequestHandler, handler_fn},
        validation::ValidationFailure,
    };
    use tokio_util::sync::CancellationToken;

    struct Lookup(Result<u32, &'static str>);

    impl Request for Lookup {
        type Response = u32;
    }

    fn handler() -> Arc<dyn RequestHandler<Lookup>> {
        Arc::new(handler_fn(|req: Arc<Lookup>, _ctx: Context| async move {
            match req.0 {
                Ok(v) => Ok(v),
                Err("validation") => Err(MediatorError::ValidationFailed(vec![
                    ValidationFailure::new("id", "required"),
                ])),
                Err("cancelled") => Err(MediatorError::Cancelled),
                Err(msg) => Err(MediatorError::handler(msg)),
            }
        }))
    }

    async fn run(metrics: &Arc<InMemoryMetrics>, request: Lookup) -> Result<u32, MediatorError> {
        let sink: Arc<dyn MetricsSink> = Arc::clone(metrics) as Arc<dyn MetricsSink>;
        let behaviors: Vec<Arc<dyn PipelineBehavior<Lookup>>> =
            vec![Arc::new(LoggingBehavior::new(sink))];
        let pipeline = chain(handler(), &behaviors);
        pipeline(
            Arc::new(request),
            Context::new("Lookup", CancellationToken::new()),
        )
        .await
    }

    #[tokio::test]
    async fn success_is_counted_and_timed() {
        let metrics = Arc::new(InMemoryMetrics::new());
        assert_eq!(run(&metrics, Lookup(Ok(5))).await.unwrap(), 5);

        assert_eq!(metrics.counter_tagged(REQUESTS, "request.name", "Lookup"), 1);
        assert_eq!(metrics.counter(ERRORS), 0);
        assert_eq!(
            metrics
                .observations_tagged(REQUEST_DURATION, "status", "success")
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn failures_are_counted_by_kind_and_returned_unchanged() {
        let metrics = Arc::new(InMemoryMetrics::new());
        let err = run(&metrics, Lookup(Err("db down"))).await.unwrap_err();
        assert_eq!(err.to_string(), "db down");

        let err = run(&metrics, Lookup(Err("validation"))).await.unwrap_err();
        assert_eq!(err.validation_failures().map(<[_]>::len), Some(1));

        assert_eq!(metrics.counter(REQUESTS), 2);
        assert_eq!(metrics.counter_tagged(ERRORS, "error.kind", "handler"), 1);
        assert_eq!(metrics.counter_tagged(ERRORS, "error.kind", "validation_failed"), 1);
        assert_eq!(
            metrics
                .observations_tagged(REQUEST_DURATION, "status", "error")
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn cancellation_is_not_an_error() {
        let metrics = Arc::new(InMemoryMetrics::new());
        let err = run(&metrics, Lookup(Err("cancelled"))).await.unwrap_err();
        assert!(err.is_cancelled());

        assert_eq!(metrics.counter(ERRORS), 0);
        assert_eq!(
            metrics
                .observations_tagged(REQUEST_DURATION, "status", "cancelled")
                .len(),
            1
        );
    }
}
