//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Directory Metrics
    pub static ref FOLLOW_EVENTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("podperf_follow_events_total", "Follow and unfollow notifications by outcome"),
        &["outcome"]
    ).expect("metric can be created");
    pub static ref POSTS_PUBLISHED_TOTAL: IntCounter = IntCounter::new(
        "podperf_posts_published_total",
        "Total number of posts published"
    ).expect("metric can be created");
    pub static ref DELIVERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("podperf_deliveries_total", "Delivery requests handed to the federation substrate"),
        &["status"]
    ).expect("metric can be created");
    pub static ref DELIVERY_QUEUE_DEPTH: IntGauge = IntGauge::new(
        "podperf_delivery_queue_depth",
        "Delivery jobs waiting for the federation substrate"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("podperf_errors_total", "Total number of errors returned to callers"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Call once at process start; registering twice panics.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(FOLLOW_EVENTS_TOTAL.clone()))
        .expect("FOLLOW_EVENTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(POSTS_PUBLISHED_TOTAL.clone()))
        .expect("POSTS_PUBLISHED_TOTAL can be registered");
    REGISTRY
        .register(Box::new(DELIVERIES_TOTAL.clone()))
        .expect("DELIVERIES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(DELIVERY_QUEUE_DEPTH.clone()))
        .expect("DELIVERY_QUEUE_DEPTH can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

/// Record a follow-directory event (`created`, `duplicate`, `removed`, `absent`).
pub fn observe_follow_event(outcome: &str) {
    FOLLOW_EVENTS_TOTAL.with_label_values(&[outcome]).inc();
}

/// Record a delivery hand-off (`enqueued`, `failed`).
pub fn observe_delivery(status: &str) {
    DELIVERIES_TOTAL.with_label_values(&[status]).inc();
}
