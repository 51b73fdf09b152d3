//! Prometheus metrics.
//!
//! Recording goes through the `metrics` facade, so calls are no-ops until
//! [`install_recorder`] runs (tests never install one).

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Install the global Prometheus recorder. Call once, from `main`.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

pub fn record_request(endpoint: &'static str, status: u16) {
    counter!(
        "reelcast_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_duration(endpoint: &'static str, start: Instant) {
    histogram!("reelcast_request_duration_seconds", "endpoint" => endpoint)
        .record(start.elapsed().as_secs_f64());
}

/// One failed upstream attempt (retried or not).
pub fn record_upstream_error() {
    counter!("reelcast_upstream_errors_total").increment(1);
}

/// Refresh result: `success`, `empty`, `upstream_error` or `store_error`.
pub fn record_refresh(outcome: &'static str) {
    counter!("reelcast_refreshes_total", "outcome" => outcome).increment(1);
}

pub fn set_cached_reels(count: usize) {
    gauge!("reelcast_cached_reels").set(count as f64);
}
