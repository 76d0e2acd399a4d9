//! Cache-aside widget lookups with validation and group invalidation.
//!
//! Run with:
//!
//! ```text
//! RUST_LOG=courier=debug,cached_widgets=info cargo run --example cached_widgets
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use courier::{
    CacheGroupInvalidationNotification, CacheInvalidationNotification, CacheableRequest,
    Mediator, MediatorOptions, MemoryCacheStore, Request, ValidationFailure,
    context::Context,
    handler_fn,
    metrics::{InMemoryMetrics, MetricsSink, REQUESTS, VALIDATION_FAILURES},
    validator_fn,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Widget {
    id: u64,
    name: String,
    loaded_at_call: u64,
}

struct GetWidget {
    id: u64,
}

impl Request for GetWidget {
    type Response = Widget;
}

impl CacheableRequest for GetWidget {
    fn cache_key(&self) -> String {
        format!("widget:{}", self.id)
    }

    fn cache_group_key(&self) -> Option<String> {
        Some("widgets".to_string())
    }

    fn absolute_expiration_relative_to_now(&self) -> Option<Duration> {
        Some(Duration::from_secs(300))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let metrics = Arc::new(InMemoryMetrics::new());
    let loads = Arc::new(AtomicU64::new(0));
    let handler_loads = Arc::clone(&loads);

    let mediator = Mediator::builder()
        .options(MediatorOptions::from_env())
        .metrics(Arc::clone(&metrics) as Arc<dyn MetricsSink>)
        .cache_store(Arc::new(MemoryCacheStore::new()))
        .cacheable_handler::<GetWidget>(handler_fn(move |req: Arc<GetWidget>, _ctx: Context| {
            let loads = Arc::clone(&handler_loads);
            async move {
                // Stand-in for a slow database read.
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(Widget {
                    id: req.id,
                    name: format!("widget #{}", req.id),
                    loaded_at_call: loads.fetch_add(1, Ordering::SeqCst) + 1,
                })
            }
        }))
        .validator::<GetWidget>(validator_fn(|req: &GetWidget| {
            if req.id == 0 {
                vec![ValidationFailure::new("id", "must be positive")]
            } else {
                Vec::new()
            }
        }))
        .build();

    for id in [1, 2, 1, 2] {
        let widget = mediator.send(GetWidget { id }).await?;
        info!(id, loaded_at_call = widget.loaded_at_call, "got widget");
    }

    mediator
        .publish(CacheInvalidationNotification::new("widget:1"))
        .await?;
    let widget = mediator.send(GetWidget { id: 1 }).await?;
    info!(loaded_at_call = widget.loaded_at_call, "widget 1 after key invalidation");

    mediator
        .publish(CacheGroupInvalidationNotification::new("widgets"))
        .await?;
    let widget = mediator.send(GetWidget { id: 2 }).await?;
    info!(loaded_at_call = widget.loaded_at_call, "widget 2 after group invalidation");

    if let Err(err) = mediator.send(GetWidget { id: 0 }).await {
        for failure in err.validation_failures().unwrap_or_default() {
            info!(%failure, "rejected");
        }
    }

    info!(
        requests = metrics.counter(REQUESTS),
        validation_failures = metrics.counter(VALIDATION_FAILURES),
        handler_loads = loads.load(Ordering::SeqCst),
        "done"
    );
    Ok(())
}
