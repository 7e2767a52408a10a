//! Metrics collection and exposition.
//!
//! # Metrics
//! - `espresso_requests_total` (counter): requests by method, route, status
//! - `espresso_request_duration_seconds` (histogram): dispatch latency by method, route
//! - `espresso_sessions_active` (gauge): sessions held by the in-memory store
//!
//! Unmatched requests are labelled with route `none`.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one dispatched request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    counter!(
        "espresso_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "espresso_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Publish the number of stored sessions.
pub fn record_sessions_active(count: usize) {
    gauge!("espresso_sessions_active").set(count as f64);
}
