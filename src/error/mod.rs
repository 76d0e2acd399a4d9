//! Failure taxonomy shared by the dispatcher, the behaviors and the cache layer.
//!
//! Every fallible operation in the crate returns [`MediatorError`]. Behaviors never
//! convert one variant into another; the only behavior that produces a failure of
//! its own is validation ([`MediatorError::ValidationFailed`]).

use thiserror::Error;

use crate::cache::StoreError;
use crate::validation::ValidationFailure;

/// Boxed error type used for opaque handler, behavior and subscriber failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while dispatching a request or publishing a notification.
#[derive(Debug, Error)]
pub enum MediatorError {
    /// The request could not be dispatched as given.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No handler is registered for the request's concrete type.
    #[error("handler not found for request type {request}")]
    HandlerNotFound { request: &'static str },

    /// One or more validators reported rule violations. Carries every failure.
    #[error("validation failed with {} error(s)", .0.len())]
    ValidationFailed(Vec<ValidationFailure>),

    #[error("cache store error: {0}")]
    Store(#[from] StoreError),

    #[error("cache payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The caller's cancellation token fired before the call completed.
    #[error("request was cancelled")]
    Cancelled,

    /// A failure raised by a handler, a behavior or a notification subscriber.
    #[error(transparent)]
    Handler(BoxError),
}

impl MediatorError {
    /// Wraps an arbitrary error raised by user code.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use courier::MediatorError;
    ///
    /// let err = MediatorError::handler("widget service is down");
    /// assert_eq!(err.kind(), "handler");
    /// ```
    pub fn handler<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Handler(err.into())
    }

    /// Stable, low-cardinality tag naming the failure kind. Used for metric tags.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::HandlerNotFound { .. } => "handler_not_found",
            Self::ValidationFailed(_) => "validation_failed",
            Self::Store(_) => "store",
            Self::Serialization(_) => "serialization",
            Self::Cancelled => "cancelled",
            Self::Handler(_) => "handler",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the aggregated failures when this is a validation error.
    pub fn validation_failures(&self) -> Option<&[ValidationFailure]> {
        match self {
            Self::ValidationFailed(failures) => Some(failures),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_not_found_names_request() {
        let err = MediatorError::HandlerNotFound {
            request: "GetWidget",
        };
        assert_eq!(
            err.to_string(),
            "handler not found for request type GetWidget"
        );
        assert_eq!(err.kind(), "handler_not_found");
    }

    #[test]
    fn validation_failed_counts_failures() {
        let err = MediatorError::ValidationFailed(vec![
            ValidationFailure::new("name", "must not be empty"),
            ValidationFailure::new("name", "too short"),
        ]);
        assert_eq!(err.to_string(), "validation failed with 2 error(s)");
        assert_eq!(err.validation_failures().map(<[_]>::len), Some(2));
    }

    #[test]
    fn handler_errors_are_transparent() {
        let err = MediatorError::handler("boom");
        assert_eq!(err.to_string(), "boom");
        assert!(err.validation_failures().is_none());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn store_errors_convert() {
        let err: MediatorError = StoreError::Unavailable("redis down".into()).into();
        assert_eq!(err.kind(), "store");
        assert!(err.to_string().contains("redis down"));
    }
}
