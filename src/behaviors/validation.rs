use std::sync::Arc;

use futures::future::try_join_all;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{
    MediatorError,
    context::Context,
    metrics::{
        MetricsSink, Tag, VALIDATION_DURATION, VALIDATION_EXECUTIONS, VALIDATION_FAILURES,
        VALIDATORS_RUN,
    },
    pipeline::{Next, PipelineBehavior},
    request::{BoxFuture, Request},
    validation::Validator,
};

/// Runs every registered validator before the rest of the pipeline.
///
/// Validators run concurrently. When any of them reports a failure, the call
/// ends with [`MediatorError::ValidationFailed`] carrying every failure and
/// `next` is never called. A validator that fails to run propagates its own
/// error instead.
pub struct ValidationBehavior<R: Request> {
    validators: Arc<[Arc<dyn Validator<R>>]>,
    metrics: Arc<dyn MetricsSink>,
}

impl<R: Request> ValidationBehavior<R> {
    pub fn new(validators: Vec<Arc<dyn Validator<R>>>, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            validators: validators.into(),
            metrics,
        }
    }
}

impl<R: Request> PipelineBehavior<R> for ValidationBehavior<R> {
    fn handle(
        &self,
        request: Arc<R>,
        ctx: Context,
        next: Next<R>,
    ) -> BoxFuture<Result<R::Response, MediatorError>> {
        let validators = Arc::clone(&self.validators);
        let metrics = Arc::clone(&self.metrics);
        Box::pin(async move {
            if validators.is_empty() {
                return next.run(request, ctx).await;
            }

            let name = ctx.request_name();
            let request_tag: Tag = ("request.name", name.to_string());
            metrics.increment(VALIDATION_EXECUTIONS, 1, std::slice::from_ref(&request_tag));
            metrics.increment(
                VALIDATORS_RUN,
                validators.len() as u64,
                std::slice::from_ref(&request_tag),
            );

            let start = Instant::now();
            let outcome = try_join_all(
                validators
                    .iter()
                    .map(|validator| validator.validate(Arc::clone(&request), ctx.clone())),
            )
            .await;
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            let record = |status: &str| {
                metrics.record(
                    VALIDATION_DURATION,
                    elapsed_ms,
                    &[request_tag.clone(), ("status", status.to_string())],
                );
            };

            let failures: Vec<_> = match outcome {
                Ok(reports) => reports.into_iter().flatten().collect(),
                Err(err) => {
                    record("error");
                    return Err(err);
                }
            };

            if !failures.is_empty() {
                record("failed");
                metrics.increment(VALIDATION_FAILURES, 1, std::slice::from_ref(&request_tag));
                warn!(
                    request = name,
                    failures = failures.len(),
                    "validation failed"
                );
                return Err(MediatorError::ValidationFailed(failures));
            }

            record("success");
            debug!(request = name, validators = validators.len(), "validation passed");
            next.run(request, ctx).await
        })
    }
}
