//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, upstream kind
//! - `proxy_request_duration_seconds` (histogram): time until the response head
//! - `proxy_errors_total` (counter): pre-commit failures by kind
//! - `proxy_relay_bytes_total` (counter): body bytes relayed to clients
//! - `proxy_relay_failures_total` (counter): mid-stream failures by stage
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// `upstream` label for a request. Hosts are client-controlled through
/// `X-Target-Host`, so only the kind of upstream is recorded.
pub fn upstream_label(overridden: bool, credentialed: bool) -> &'static str {
    if credentialed {
        "credential"
    } else if overridden {
        "override"
    } else {
        "default"
    }
}

/// Record a request whose response head was returned by the upstream.
pub fn record_request(method: &str, status: u16, upstream: &'static str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "upstream" => upstream
    )
    .increment(1);
    histogram!(
        "proxy_request_duration_seconds",
        "method" => method.to_string(),
        "upstream" => upstream
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a failure answered with a local 500.
pub fn record_error(kind: &'static str) {
    counter!("proxy_errors_total", "kind" => kind).increment(1);
}

pub fn record_relay_bytes(bytes: u64) {
    counter!("proxy_relay_bytes_total").increment(bytes);
}

/// `stage` is `read` (upstream) or `write` (client).
pub fn record_relay_failure(stage: &'static str) {
    counter!("proxy_relay_failures_total", "stage" => stage).increment(1);
}
