//! Prometheus metrics for the matchmaking server.
//!
//! Metrics are exposed in Prometheus text format on a separate listener when
//! `METRICS_BIND` is set. Without an installed recorder every call here is a
//! no-op.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record HTTP request duration in milliseconds.
pub fn http_request_duration_ms(method: &str, path: &str, duration_ms: f64) {
    metrics::histogram!("http_request_duration_ms",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Matchmaking Metrics
// ============================================================================

/// Increment the join counter for a flow and its outcome.
pub fn matchmaking_joins_total(flow: &str, outcome: &str) {
    metrics::counter!("matchmaking_joins_total",
        "flow" => flow.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Increment the rooms created counter.
pub fn rooms_created_total(private: bool) {
    metrics::counter!("rooms_created_total",
        "visibility" => if private { "private" } else { "public" }
    )
    .increment(1);
}

// ============================================================================
// Store Metrics
// ============================================================================

/// Record room store operation duration in milliseconds.
pub fn store_operation_duration_ms(operation: &str, duration_ms: f64) {
    metrics::histogram!("store_operation_duration_ms",
        "operation" => operation.to_string()
    )
    .record(duration_ms);
}
