//! Metrics sink injected into the built-in behaviors.
//!
//! Behaviors never touch global meters; they emit through the [`MetricsSink`]
//! handed to the [`MediatorBuilder`](crate::MediatorBuilder). [`NoopMetrics`] is
//! the default; [`InMemoryMetrics`] keeps every series in memory for inspection.

use dashmap::DashMap;

/// Counter: requests entering the logging behavior.
pub const REQUESTS: &str = "mediator.requests";
/// Histogram (ms): request duration, tagged with `status`.
pub const REQUEST_DURATION: &str = "mediator.request.duration";
/// Counter: failed requests, tagged with `error.kind`.
pub const ERRORS: &str = "mediator.errors";
/// Counter: requests that went through at least one validator.
pub const VALIDATION_EXECUTIONS: &str = "mediator.validation.executions";
/// Counter: individual validators run.
pub const VALIDATORS_RUN: &str = "mediator.validation.validators_run";
/// Counter: requests rejected by validation.
pub const VALIDATION_FAILURES: &str = "mediator.validation.failures";
/// Histogram (ms): validation duration, tagged with `status`.
pub const VALIDATION_DURATION: &str = "mediator.validation.duration";

/// A tag attached to a measurement: `(key, value)`.
pub type Tag = (&'static str, String);

/// Destination for counters and histogram measurements.
pub trait MetricsSink: Send + Sync + 'static {
    /// Add `value` to the counter `name`.
    fn increment(&self, name: &'static str, value: u64, tags: &[Tag]);

    /// Record one observation of `value` in the histogram `name`.
    fn record(&self, name: &'static str, value: f64, tags: &[Tag]);
}

/// Discards every measurement.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _name: &'static str, _value: u64, _tags: &[Tag]) {}

    fn record(&self, _name: &'static str, _value: f64, _tags: &[Tag]) {}
}

// One time series: metric name plus its tags sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    name: &'static str,
    tags: Vec<Tag>,
}

impl SeriesKey {
    fn new(name: &'static str, tags: &[Tag]) -> Self {
        let mut tags = tags.to_vec();
        tags.sort();
        Self { name, tags }
    }

    fn has_tag(&self, key: &str, value: &str) -> bool {
        self.tags.iter().any(|(k, v)| *k == key && v == value)
    }
}

/// Keeps counters and histogram observations in memory.
///
/// Queries aggregate across series, so callers can ask for a metric total or
/// filter by a single tag without knowing every tag a series carries.
///
/// # Examples
///
/// ```rust
/// use courier::metrics::{InMemoryMetrics, MetricsSink, REQUESTS};
///
/// let metrics = InMemoryMetrics::new();
/// metrics.increment(REQUESTS, 1, &[("request.name", "GetWidget".to_string())]);
/// assert_eq!(metrics.counter(REQUESTS), 1);
/// assert_eq!(metrics.counter_tagged(REQUESTS, "request.name", "GetWidget"), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    counters: DashMap<SeriesKey, u64>,
    histograms: DashMap<SeriesKey, Vec<f64>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sum of the counter `name` across all tag combinations.
    pub fn counter(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .filter(|entry| entry.key().name == name)
            .map(|entry| *entry.value())
            .sum()
    }

    /// Sum of the counter `name` across series carrying `tag = value`.
    pub fn counter_tagged(&self, name: &str, tag: &str, value: &str) -> u64 {
        self.counters
            .iter()
            .filter(|entry| entry.key().name == name && entry.key().has_tag(tag, value))
            .map(|entry| *entry.value())
            .sum()
    }

    /// Every observation recorded in the histogram `name`.
    pub fn observations(&self, name: &str) -> Vec<f64> {
        self.histograms
            .iter()
            .filter(|entry| entry.key().name == name)
            .flat_map(|entry| entry.value().clone())
            .collect()
    }

    /// Observations in the histogram `name` from series carrying `tag = value`.
    pub fn observations_tagged(&self, name: &str, tag: &str, value: &str) -> Vec<f64> {
        self.histograms
            .iter()
            .filter(|entry| entry.key().name == name && entry.key().has_tag(tag, value))
            .flat_map(|entry| entry.value().clone())
            .collect()
    }
}

impl MetricsSink for InMemoryMetrics {
    fn increment(&self, name: &'static str, value: u64, tags: &[Tag]) {
        *self.counters.entry(SeriesKey::new(name, tags)).or_insert(0) += value;
    }

    fn record(&self, name: &'static str, value: f64, tags: &[Tag]) {
        self.histograms
            .entry(SeriesKey::new(name, tags))
            .or_default()
            .push(value);
    }
}
