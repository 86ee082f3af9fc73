//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orchestrator (queries, per-source outcomes and latency)
//! - Session fetch client (requests, retries)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry};

// =============================================================================
// Orchestrator
// =============================================================================

/// Queries dispatched to sources.
pub static QUERIES_EXECUTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("indexhub_queries_total", "Total queries executed").unwrap()
});

/// Terminal outcomes per source.
pub static SOURCE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "indexhub_source_outcomes_total",
            "Per-source query outcomes",
        ),
        &["source", "outcome"], // outcome: "success", "aborted", "failure"
    )
    .unwrap()
});

/// Time spent inside a source's query call.
pub static SOURCE_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "indexhub_source_query_duration_seconds",
            "Duration of a single source's query",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["source"],
    )
    .unwrap()
});

// =============================================================================
// Session fetch client
// =============================================================================

/// HTTP requests issued, retries included.
pub static FETCH_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("indexhub_fetch_requests_total", "Total outbound HTTP requests"),
        &["source"],
    )
    .unwrap()
});

/// Requests repeated after a transport failure.
pub static FETCH_RETRIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("indexhub_fetch_retries_total", "Total outbound HTTP retries"),
        &["source"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(QUERIES_EXECUTED.clone()),
        Box::new(SOURCE_OUTCOMES.clone()),
        Box::new(SOURCE_LATENCY.clone()),
        Box::new(FETCH_ATTEMPTS.clone()),
        Box::new(FETCH_RETRIES.clone()),
    ]
}

/// Register every core metric; already-registered collectors are skipped.
pub fn register_core_metrics(registry: &Registry) {
    for metric in all_metrics() {
        let _ = registry.register(metric);
    }
}
