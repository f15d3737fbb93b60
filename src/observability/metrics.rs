//! Metrics collection and exposition.
//!
//! # Metrics
//! - `notebook_requests_total` (counter): requests by method, status, action
//! - `notebook_request_duration_seconds` (histogram): pipeline latency
//! - `notebook_pipeline_aborts_total` (counter): fault-boundary aborts by reason
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter serves its own listener

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed request.
pub fn record_request(method: &str, status: u16, action: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("action", action.to_string()),
    ];
    counter!("notebook_requests_total", &labels).increment(1);
    histogram!("notebook_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

/// Record a request the fault boundary aborted.
pub fn record_abort(reason: &'static str) {
    counter!("notebook_pipeline_aborts_total", "reason" => reason).increment(1);
}
