//! Prometheus metrics for the crawler.
//!
//! This module provides metrics for:
//! - Ticket search and ingestion
//! - Query launches and durations
//! - Per-ticket outcomes

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

// =============================================================================
// Ingestion
// =============================================================================

/// Tickets returned by the last tracker search.
pub static TICKETS_FOUND: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "datacrawl_tickets_found",
        "Tickets matching the search predicate in the last run",
    )
    .unwrap()
});

// =============================================================================
// Queries
// =============================================================================

/// Query submissions by result.
pub static LAUNCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "datacrawl_launch_attempts_total",
            "Total query submissions",
        ),
        &["result"], // "done", "failed", "rejected", "timed_out"
    )
    .unwrap()
});

/// Wall-clock time a worker spent on one job.
pub static QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "datacrawl_query_duration_seconds",
            "Duration of a job from first submission to outcome",
        )
        .buckets(vec![10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0, 3600.0, 7200.0, 14400.0]),
        &["outcome"],
    )
    .unwrap()
});

// =============================================================================
// Outcomes
// =============================================================================

/// Outcomes by kind.
pub static OUTCOMES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("datacrawl_outcomes_total", "Total per-ticket outcomes"),
        &["outcome"], // "success", "incomplete", "no_identifier", "not_yet_ready", "error"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(TICKETS_FOUND.clone()),
        Box::new(LAUNCH_ATTEMPTS.clone()),
        Box::new(QUERY_DURATION.clone()),
        Box::new(OUTCOMES_TOTAL.clone()),
    ]
}

/// Render all metrics in the Prometheus text exposition format.
pub fn render_text() -> Result<String, prometheus::Error> {
    let registry = Registry::new();
    for metric in all_metrics() {
        registry.register(metric)?;
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
