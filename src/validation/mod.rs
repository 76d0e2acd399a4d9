//! Request validators and the failures they report.
//!
//! Validators are independent and read-only. Any number may be registered per
//! request type; the [`ValidationBehavior`](crate::behaviors::ValidationBehavior)
//! runs them concurrently and aggregates what they report.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    MediatorError,
    context::Context,
    request::{BoxFuture, Request},
};

/// A single rule violation reported by a validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFailure {
    /// Name of the offending field.
    pub property: String,
    /// Human-readable description of the violated rule.
    pub message: String,
}

impl ValidationFailure {
    pub fn new(property: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.message)
    }
}

/// Checks a request and reports every rule it violates.
///
/// Returning `Ok` with an empty list means the request is valid. Returning `Err`
/// means the validator itself failed to run; that error is propagated as-is and
/// is never folded into [`MediatorError::ValidationFailed`].
pub trait Validator<R: Request>: Send + Sync + 'static {
    fn validate(
        &self,
        request: Arc<R>,
        ctx: Context,
    ) -> BoxFuture<Result<Vec<ValidationFailure>, MediatorError>>;
}

/// A [`Validator`] backed by a synchronous rule function. Built with [`validator_fn`].
pub struct ValidatorFn<F> {
    f: F,
}

/// Wrap a rule function as a [`Validator`].
///
/// # Examples
///
/// ```rust
/// use courier::{Request, ValidationFailure, validator_fn};
///
/// struct CreateWidget {
///     name: String,
/// }
///
/// impl Request for CreateWidget {
///     type Response = u64;
/// }
///
/// let not_empty = validator_fn(|req: &CreateWidget| {
///     if req.name.is_empty() {
///         vec![ValidationFailure::new("name", "must not be empty")]
///     } else {
///         Vec::new()
///     }
/// });
/// ```
pub fn validator_fn<F>(f: F) -> ValidatorFn<F> {
    ValidatorFn { f }
}

impl<R, F> Validator<R> for ValidatorFn<F>
where
    R: Request,
    F: Fn(&R) -> Vec<ValidationFailure> + Send + Sync + 'static,
{
    fn validate(
        &self,
        request: Arc<R>,
        _ctx: Context,
    ) -> BoxFuture<Result<Vec<ValidationFailure>, MediatorError>> {
        let failures = (self.f)(&request);
        Box::pin(std::future::ready(Ok(failures)))
    }
}

/// A [`Validator`] backed by an async closure that may itself fail.
/// Built with [`async_validator_fn`].
pub struct AsyncValidatorFn<F> {
    f: F,
}

/// Wrap an async, fallible closure as a [`Validator`].
pub fn async_validator_fn<F>(f: F) -> AsyncValidatorFn<F> {
    AsyncValidatorFn { f }
}

impl<R, F, Fut> Validator<R> for AsyncValidatorFn<F>
where
    R: Request,
    F: Fn(Arc<R>, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<ValidationFailure>, MediatorError>> + Send + 'static,
{
    fn validate(
        &self,
        request: Arc<R>,
        ctx: Context,
    ) -> BoxFuture<Result<Vec<ValidationFailure>, MediatorError>> {
        Box::pin((self.f)(request, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_util::sync::CancellationToken;

    struct Named(String);

    impl Request for Named {
        type Response = ();
    }

    fn ctx() -> Context {
        Context::new("Named", CancellationToken::new())
    }

    #[tokio::test]
    async fn validator_fn_reports_failures() {
        let min_len = validator_fn(|req: &Named| {
            if req.0.len() < 3 {
                vec![ValidationFailure::new("value", "must be at least 3 characters")]
            } else {
                Vec::new()
            }
        });

        let short = min_len
            .validate(Arc::new(Named("ab".into())), ctx())
            .await
            .unwrap();
        assert_eq!(short.len(), 1);
        assert_eq!(short[0].to_string(), "value: must be at least 3 characters");

        let ok = min_len
            .validate(Arc::new(Named("abc".into())), ctx())
            .await
            .unwrap();
        assert!(ok.is_empty());
    }

    #[tokio::test]
    async fn async_validator_can_fail_to_run() {
        let lookup = async_validator_fn(|_req: Arc<Named>, _ctx: Context| async {
            Err(MediatorError::handler("reference data unavailable"))
        });
        let err = lookup
            .validate(Arc::new(Named("x".into())), ctx())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "handler");
    }

    #[test]
    fn failures_serialize_as_objects() {
        let json = serde_json::to_string(&ValidationFailure::new("id", "required")).unwrap();
        assert_eq!(json, r#"{"property":"id","message":"required"}"#);
    }
}
