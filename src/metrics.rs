//! Prometheus metrics for refresh and query monitoring.
//!
//! This module provides metrics for:
//! - Snapshot fetch latency and outcomes per platform
//! - Interval resolver lookups, failures, and cache size
//! - Manual refresh-all invocations
//! - Query latency

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use tracing::debug;

use crate::exchange::Platform;

// === Metric Name Constants ===

/// Snapshot fetch latency metric name.
pub const METRIC_SNAPSHOT_FETCH_LATENCY: &str = "snapshot_fetch_latency_ms";
/// Query latency metric name.
pub const METRIC_QUERY_LATENCY: &str = "query_latency_ms";
/// Snapshot fetches counter metric name.
pub const METRIC_SNAPSHOT_FETCHES: &str = "snapshot_fetches_total";
/// Snapshot fetch failures counter metric name.
pub const METRIC_SNAPSHOT_FAILURES: &str = "snapshot_fetch_failures_total";
/// Interval lookups counter metric name.
pub const METRIC_INTERVAL_LOOKUPS: &str = "interval_lookups_total";
/// Interval lookup failures counter metric name.
pub const METRIC_INTERVAL_LOOKUP_FAILURES: &str = "interval_lookup_failures_total";
/// Manual refresh-all counter metric name.
pub const METRIC_REFRESH_ALL: &str = "refresh_all_total";
/// Interval cache size gauge metric name.
pub const METRIC_INTERVAL_CACHE_ENTRIES: &str = "interval_cache_entries";
/// Visible asset count gauge metric name.
pub const METRIC_VISIBLE_ASSETS: &str = "visible_assets";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(
        METRIC_SNAPSHOT_FETCH_LATENCY,
        "Exchange snapshot fetch latency in milliseconds"
    );
    describe_histogram!(
        METRIC_QUERY_LATENCY,
        "Filter/sort/paginate query latency in milliseconds"
    );

    // Counters
    describe_counter!(
        METRIC_SNAPSHOT_FETCHES,
        "Total number of snapshot fetches attempted"
    );
    describe_counter!(
        METRIC_SNAPSHOT_FAILURES,
        "Total number of snapshot fetches that failed"
    );
    describe_counter!(
        METRIC_INTERVAL_LOOKUPS,
        "Total number of per-symbol funding-interval lookups"
    );
    describe_counter!(
        METRIC_INTERVAL_LOOKUP_FAILURES,
        "Total number of interval lookups that fell back"
    );
    describe_counter!(
        METRIC_REFRESH_ALL,
        "Total number of manual refresh-all operations"
    );

    // Gauges
    describe_gauge!(
        METRIC_INTERVAL_CACHE_ENTRIES,
        "Symbols currently in the funding-interval cache"
    );
    describe_gauge!(
        METRIC_VISIBLE_ASSETS,
        "Assets in the current aggregate with a computable spread"
    );

    debug!("Metrics initialized");
}

/// Record snapshot fetch latency for a platform.
pub fn record_snapshot_fetch_latency(start: Instant, platform: Platform) {
    let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
    histogram!(METRIC_SNAPSHOT_FETCH_LATENCY, "platform" => platform.to_string())
        .record(latency_ms);
}

/// Increment the snapshot fetch counter for a platform.
pub fn inc_snapshot_fetch(platform: Platform) {
    counter!(METRIC_SNAPSHOT_FETCHES, "platform" => platform.to_string()).increment(1);
}

/// Increment the snapshot failure counter for a platform.
pub fn inc_snapshot_failure(platform: Platform) {
    counter!(METRIC_SNAPSHOT_FAILURES, "platform" => platform.to_string()).increment(1);
}

/// Increment the interval lookup counter.
pub fn inc_interval_lookup() {
    counter!(METRIC_INTERVAL_LOOKUPS).increment(1);
}

/// Increment the interval lookup failure counter.
pub fn inc_interval_lookup_failure() {
    counter!(METRIC_INTERVAL_LOOKUP_FAILURES).increment(1);
}

/// Increment the manual refresh-all counter.
pub fn inc_refresh_all() {
    counter!(METRIC_REFRESH_ALL).increment(1);
}

/// Set the interval cache size gauge.
pub fn set_interval_cache_entries(entries: usize) {
    gauge!(METRIC_INTERVAL_CACHE_ENTRIES).set(entries as f64);
}

/// Set the visible asset count gauge.
pub fn set_visible_assets(assets: usize) {
    gauge!(METRIC_VISIBLE_ASSETS).set(assets as f64);
}

/// RAII guard for timing operations.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    metric_name: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given metric.
    pub fn new(metric_name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            metric_name,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        let latency_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        histogram!(self.metric_name).record(latency_ms);
    }
}

/// Create a latency timer for query evaluation.
pub fn timer_query() -> LatencyTimer {
    LatencyTimer::new(METRIC_QUERY_LATENCY)
}
