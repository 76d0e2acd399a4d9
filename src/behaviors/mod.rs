//! Built-in pipeline behaviors.
//!
//! - [`LoggingBehavior`] — structured events and request metrics.
//! - [`ValidationBehavior`] — concurrent validators, aggregated failures.
//! - [`CachingBehavior`] — cache-aside for [`CacheableRequest`](crate::CacheableRequest)s.
//!
//! The [`MediatorBuilder`](crate::MediatorBuilder) attaches them in that order,
//! outermost first, ahead of any custom behavior.

mod caching;
mod logging;
mod validation;

pub use caching::CachingBehavior;
pub use logging::LoggingBehavior;
pub use validation::ValidationBehavior;

pub(crate) use caching::caching_behavior;
