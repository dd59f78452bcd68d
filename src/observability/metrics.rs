//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_requests_total` (counter): requests by method, status
//! - `gatekeeper_request_duration_seconds` (histogram): end-to-end latency
//! - `gatekeeper_rejections_total` (counter): gate rejections by reason
//! - `gatekeeper_tracked_clients` (gauge): client windows held in memory
//! - `gatekeeper_evicted_clients_total` (counter): windows dropped by the sweep
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "gatekeeper_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gatekeeper_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rejection(reason: &'static str) {
    counter!("gatekeeper_rejections_total", "reason" => reason).increment(1);
}

pub fn record_tracked_clients(count: usize) {
    gauge!("gatekeeper_tracked_clients").set(count as f64);
}

pub fn record_evicted_clients(count: usize) {
    counter!("gatekeeper_evicted_clients_total").increment(count as u64);
}
