// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Prometheus metrics for the admission webhook.
//!
//! All metrics use the namespace prefix `nodelocaldns_webhook_`.
//!
//! # Metrics Categories
//!
//! - **Admission Metrics** - Decisions by operation and result, decision latency
//! - **Injection Metrics** - Injection outcomes by skip reason
//! - **Transport Metrics** - Requests rejected before reaching the engine
//!
//! # Example
//!
//! ```rust,no_run
//! use nodelocaldns_webhook::metrics::record_admission;
//!
//! record_admission("CREATE", "allowed", std::time::Duration::from_millis(2));
//! ```

use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::time::Duration;

// ============================================================================
// Metric Name Constants
// ============================================================================

/// Namespace prefix for all webhook metrics
const METRICS_NAMESPACE: &str = "nodelocaldns_webhook";

// ============================================================================
// Global Metrics Registry
// ============================================================================

/// Global Prometheus metrics registry
///
/// All metrics are registered in this registry and exposed via `/metrics` endpoint.
pub static METRICS_REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Admission Metrics
// ============================================================================

/// Total number of admission decisions
///
/// Labels:
/// - `operation`: `CREATE`, `UPDATE`, `DELETE`, ...
/// - `result`: `allowed`, `denied`, `skipped`
pub static ADMISSION_REQUESTS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_admission_requests_total"),
        "Total number of admission decisions by operation and result",
    );
    let counter = CounterVec::new(opts, &["operation", "result"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

/// Duration of admission decisions in seconds
///
/// Labels:
/// - `operation`: admission operation
pub static ADMISSION_DURATION_SECONDS: LazyLock<HistogramVec> = LazyLock::new(|| {
    let opts = HistogramOpts::new(
        format!("{METRICS_NAMESPACE}_admission_duration_seconds"),
        "Duration of admission decisions in seconds by operation",
    )
    .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]);
    let histogram = HistogramVec::new(opts, &["operation"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(histogram.clone()))
        .unwrap();
    histogram
});

// ============================================================================
// Injection Metrics
// ============================================================================

/// Total number of injection policy evaluations
///
/// Labels:
/// - `outcome`: `injected`, `existing_dns_config`, `dns_policy_none`, `host_network`
pub static INJECTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_injections_total"),
        "Total number of injection policy evaluations by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Transport Metrics
// ============================================================================

/// Total number of requests rejected by the transport
///
/// Labels:
/// - `status_code`: HTTP status returned
pub static TRANSPORT_REJECTIONS_TOTAL: LazyLock<CounterVec> = LazyLock::new(|| {
    let opts = Opts::new(
        format!("{METRICS_NAMESPACE}_transport_rejections_total"),
        "Total number of requests rejected before admission by HTTP status",
    );
    let counter = CounterVec::new(opts, &["status_code"]).unwrap();
    METRICS_REGISTRY
        .register(Box::new(counter.clone()))
        .unwrap();
    counter
});

// ============================================================================
// Helper Functions
// ============================================================================

/// Record an admission decision
///
/// # Arguments
/// * `operation` - Admission operation
/// * `result` - `allowed`, `denied` or `skipped`
/// * `duration` - Time spent deciding
pub fn record_admission(operation: &str, result: &str, duration: Duration) {
    ADMISSION_REQUESTS_TOTAL
        .with_label_values(&[operation, result])
        .inc();
    ADMISSION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(duration.as_secs_f64());
}

/// Record an injection policy outcome
pub fn record_injection(outcome: &str) {
    INJECTIONS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a transport-level rejection
pub fn record_transport_rejection(status_code: u16) {
    let status_code = status_code.to_string();
    TRANSPORT_REJECTIONS_TOTAL
        .with_label_values(&[status_code.as_str()])
        .inc();
}

/// Gather and encode all metrics in Prometheus text format
///
/// # Errors
/// Returns error if encoding fails
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = METRICS_REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(format!("UTF-8 error: {e}")))
}
