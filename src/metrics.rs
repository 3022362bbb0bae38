//! Prometheus metrics for latency tracking and monitoring.
//!
//! This module provides metrics for:
//! - Matrix construction latency and rate counts
//! - Cycle search latency and cycle counts
//! - Realistic scale simulation latency and cache behavior

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use tracing::debug;

// === Metric Name Constants ===

/// Matrix build latency metric name.
pub const METRIC_MATRIX_BUILD_LATENCY: &str = "matrix_build_latency_ms";
/// Opportunity search latency metric name.
pub const METRIC_OPPORTUNITY_SEARCH_LATENCY: &str = "opportunity_search_latency_ms";
/// Scale simulation latency metric name.
pub const METRIC_SCALE_SIMULATION_LATENCY: &str = "scale_simulation_latency_ms";
/// Rates accepted counter metric name.
pub const METRIC_RATES_INGESTED: &str = "rates_ingested_total";
/// Rates rejected counter metric name.
pub const METRIC_RATES_REJECTED: &str = "rates_rejected_total";
/// Derived rates counter metric name (labelled by kind).
pub const METRIC_RATES_DERIVED: &str = "rates_derived_total";
/// Cycles evaluated counter metric name.
pub const METRIC_CYCLES_EVALUATED: &str = "cycles_evaluated_total";
/// Cycles skipped for a missing hop counter metric name.
pub const METRIC_CYCLES_PRUNED: &str = "cycles_pruned_total";
/// Opportunities reported counter metric name.
pub const METRIC_OPPORTUNITIES_FOUND: &str = "opportunities_found_total";
/// Broken scales counter metric name.
pub const METRIC_SCALES_BROKEN: &str = "scales_broken_total";
/// Scale cache hits counter metric name.
pub const METRIC_SCALE_CACHE_HITS: &str = "scale_cache_hits_total";

/// Initialize all metric descriptions.
/// Call this once at startup, after a recorder is installed.
pub fn init_metrics() {
    // Latency histograms
    describe_histogram!(
        METRIC_MATRIX_BUILD_LATENCY,
        "Rate matrix construction latency in milliseconds"
    );
    describe_histogram!(
        METRIC_OPPORTUNITY_SEARCH_LATENCY,
        "Cycle search latency per starting currency in milliseconds"
    );
    describe_histogram!(
        METRIC_SCALE_SIMULATION_LATENCY,
        "Realistic scale simulation latency per opportunity in milliseconds"
    );

    // Counters
    describe_counter!(METRIC_RATES_INGESTED, "Total number of quotes accepted");
    describe_counter!(METRIC_RATES_REJECTED, "Total number of quotes rejected");
    describe_counter!(
        METRIC_RATES_DERIVED,
        "Total number of derived rates, by kind"
    );
    describe_counter!(METRIC_CYCLES_EVALUATED, "Total number of cycles evaluated");
    describe_counter!(
        METRIC_CYCLES_PRUNED,
        "Total number of cycles skipped for a missing hop"
    );
    describe_counter!(
        METRIC_OPPORTUNITIES_FOUND,
        "Total number of opportunities reported"
    );
    describe_counter!(
        METRIC_SCALES_BROKEN,
        "Total number of scales dropped because an amount rounded to zero"
    );
    describe_counter!(
        METRIC_SCALE_CACHE_HITS,
        "Total number of scale simulations served from cache"
    );

    debug!("Metrics initialized");
}

/// Add accepted quotes.
pub fn add_rates_ingested(count: u64) {
    counter!(METRIC_RATES_INGESTED).increment(count);
}

/// Add rejected quotes.
pub fn add_rates_rejected(count: u64) {
    counter!(METRIC_RATES_REJECTED).increment(count);
}

/// Add derived rates of the given kind (`inverse` or `transitive`).
pub fn add_rates_derived(kind: &'static str, count: u64) {
    counter!(METRIC_RATES_DERIVED, "kind" => kind).increment(count);
}

/// Add evaluated cycles.
pub fn add_cycles_evaluated(count: u64) {
    counter!(METRIC_CYCLES_EVALUATED).increment(count);
}

/// Add cycles skipped for a missing hop.
pub fn add_cycles_pruned(count: u64) {
    counter!(METRIC_CYCLES_PRUNED).increment(count);
}

/// Add reported opportunities.
pub fn add_opportunities_found(count: u64) {
    counter!(METRIC_OPPORTUNITIES_FOUND).increment(count);
}

/// Increment broken scales counter.
pub fn inc_scales_broken() {
    counter!(METRIC_SCALES_BROKEN).increment(1);
}

/// Increment scale cache hits counter.
pub fn inc_scale_cache_hits() {
    counter!(METRIC_SCALE_CACHE_HITS).increment(1);
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
        histogram!(self.metric_name).record(self.elapsed_ms());
    }
}

/// Create a latency timer for matrix construction.
pub fn timer_matrix_build() -> LatencyTimer {
    LatencyTimer::new(METRIC_MATRIX_BUILD_LATENCY)
}

/// Create a latency timer for a cycle search.
pub fn timer_opportunity_search() -> LatencyTimer {
    LatencyTimer::new(METRIC_OPPORTUNITY_SEARCH_LATENCY)
}

/// Create a latency timer for scale simulation.
pub fn timer_scale_simulation() -> LatencyTimer {
    LatencyTimer::new(METRIC_SCALE_SIMULATION_LATENCY)
}
