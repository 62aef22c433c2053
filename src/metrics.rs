//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, IntGaugeVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("barangay_http_requests_total", "Total number of HTTP requests"),
        &["method", "status"]
    ).expect("metric can be created");

    // Store Metrics
    pub static ref STORE_OPERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("barangay_store_operations_total", "Total number of store operations"),
        &["operation", "collection"]
    ).expect("metric can be created");
    pub static ref STORE_OPERATION_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "barangay_store_operation_duration_seconds",
            "Store operation duration in seconds"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["operation", "collection"]
    ).expect("metric can be created");

    // Lifecycle Metrics
    pub static ref RECORDS_CREATED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("barangay_records_created_total", "Total number of records created"),
        &["entity"]
    ).expect("metric can be created");
    pub static ref STATUS_TRANSITIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("barangay_status_transitions_total", "Total number of applied status transitions"),
        &["entity", "to"]
    ).expect("metric can be created");
    pub static ref ARCHIVE_OPERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("barangay_archive_operations_total", "Total number of archive operations"),
        &["operation", "entity"]
    ).expect("metric can be created");

    // Side-effect Metrics
    pub static ref SIDE_EFFECTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("barangay_side_effects_total", "Total number of best-effort side effects"),
        &["channel", "outcome"]
    ).expect("metric can be created");

    // Cache Metrics
    pub static ref CACHE_HITS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("barangay_cache_hits_total", "Total number of cache hits"),
        &["cache_name"]
    ).expect("metric can be created");
    pub static ref CACHE_MISSES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("barangay_cache_misses_total", "Total number of cache misses"),
        &["cache_name"]
    ).expect("metric can be created");

    // Storage Metrics
    pub static ref UPLOADS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("barangay_uploads_total", "Total number of object uploads"),
        &["folder"]
    ).expect("metric can be created");

    // Dashboard Metrics
    pub static ref RECORDS_TOTAL: IntGaugeVec = IntGaugeVec::new(
        Opts::new("barangay_records_total", "Number of live records per collection at last dashboard read"),
        &["collection"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("barangay_errors_total", "Total number of errors surfaced to callers"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(STORE_OPERATIONS_TOTAL.clone()))
        .expect("STORE_OPERATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(STORE_OPERATION_DURATION_SECONDS.clone()))
        .expect("STORE_OPERATION_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(RECORDS_CREATED_TOTAL.clone()))
        .expect("RECORDS_CREATED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(STATUS_TRANSITIONS_TOTAL.clone()))
        .expect("STATUS_TRANSITIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ARCHIVE_OPERATIONS_TOTAL.clone()))
        .expect("ARCHIVE_OPERATIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(SIDE_EFFECTS_TOTAL.clone()))
        .expect("SIDE_EFFECTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_HITS_TOTAL.clone()))
        .expect("CACHE_HITS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(CACHE_MISSES_TOTAL.clone()))
        .expect("CACHE_MISSES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(UPLOADS_TOTAL.clone()))
        .expect("UPLOADS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(RECORDS_TOTAL.clone()))
        .expect("RECORDS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Record a store operation against the top-level collection it touched.
pub fn observe_store(operation: &str, path: &str, elapsed: Duration) {
    let collection = path.split('/').find(|segment| !segment.is_empty()).unwrap_or("root");
    STORE_OPERATIONS_TOTAL
        .with_label_values(&[operation, collection])
        .inc();
    STORE_OPERATION_DURATION_SECONDS
        .with_label_values(&[operation, collection])
        .observe(elapsed.as_secs_f64());
}
