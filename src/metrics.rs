//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // OAuth flow
    pub static ref OAUTH_CALLBACKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauth_backend_oauth_callbacks_total", "OAuth callbacks by outcome"),
        &["outcome"]
    ).expect("metric can be created");

    // Identity provider calls
    pub static ref PROVIDER_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauth_backend_provider_requests_total", "Outbound identity provider requests"),
        &["operation", "outcome"]
    ).expect("metric can be created");

    // Session store
    pub static ref SESSION_SWEEPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauth_backend_session_sweeps_total", "Expired-session sweeps by outcome"),
        &["outcome"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("oauth_backend_errors_total", "Total number of error responses"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; repeated registrations are logged and skipped.
pub fn init_metrics() {
    let collectors: [(&str, Box<dyn prometheus::core::Collector>); 4] = [
        ("oauth_callbacks_total", Box::new(OAUTH_CALLBACKS_TOTAL.clone())),
        ("provider_requests_total", Box::new(PROVIDER_REQUESTS_TOTAL.clone())),
        ("session_sweeps_total", Box::new(SESSION_SWEEPS_TOTAL.clone())),
        ("errors_total", Box::new(ERRORS_TOTAL.clone())),
    ];

    for (name, collector) in collectors {
        if let Err(error) = REGISTRY.register(collector) {
            tracing::warn!(metric = name, %error, "Metric registration skipped");
        }
    }

    tracing::info!("Metrics registry initialized");
}
