//! # courier
//!
//! An in-process request mediator: typed dispatch to a single handler, a
//! composable behavior pipeline around it, and a cache-aside layer with
//! key and group invalidation driven by broadcast notifications.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use courier::{
//!     CacheGroupInvalidationNotification, CacheableRequest, Mediator, MemoryCacheStore,
//!     Request, context::Context, handler_fn,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Widget {
//!     id: u64,
//!     name: String,
//! }
//!
//! struct GetWidget {
//!     id: u64,
//! }
//!
//! impl Request for GetWidget {
//!     type Response = Widget;
//! }
//!
//! impl CacheableRequest for GetWidget {
//!     fn cache_key(&self) -> String {
//!         format!("widget:{}", self.id)
//!     }
//!
//!     fn cache_group_key(&self) -> Option<String> {
//!         Some("widgets".to_string())
//!     }
//!
//!     fn absolute_expiration_relative_to_now(&self) -> Option<Duration> {
//!         Some(Duration::from_secs(300))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mediator = Mediator::builder()
//!         .cache_store(Arc::new(MemoryCacheStore::new()))
//!         .cacheable_handler::<GetWidget>(handler_fn(|req: Arc<GetWidget>, _ctx: Context| async move {
//!             Ok(Widget { id: req.id, name: format!("widget #{}", req.id) })
//!         }))
//!         .build();
//!
//!     let widget = mediator.send(GetWidget { id: 7 }).await?;
//!     println!("{}", widget.name);
//!
//!     mediator
//!         .publish(CacheGroupInvalidationNotification::new("widgets"))
//!         .await?;
//!     Ok(())
//! }
//! ```

// ── Core dispatch ─────────────────────────────────────────────────────────────
pub mod context;
pub mod error;
pub mod mediator;
pub mod notification;
pub mod pipeline;
pub mod request;

// ── Behaviors and their collaborators ─────────────────────────────────────────
pub mod behaviors;
pub mod cache;
pub mod config;
pub mod metrics;
pub mod validation;

mod registry;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::{
    CacheEntryOptions, CacheGroupInvalidationNotification, CacheInvalidationNotification,
    CacheStore, CacheableRequest, MemoryCacheStore, StoreError,
};
pub use config::MediatorOptions;
pub use error::{BoxError, MediatorError};
pub use mediator::{Mediator, MediatorBuilder};
pub use notification::{Notification, NotificationHandler};
pub use pipeline::{Next, PipelineBehavior};
pub use request::{Request, RequestHandler, handler_fn};
pub use validation::{ValidationFailure, Validator, validator_fn};
