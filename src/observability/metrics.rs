//! Metrics collection and exposition.
//!
//! # Metrics
//! - `ledger_http_requests_total` (counter): requests by method, path, status
//! - `ledger_http_request_duration_seconds` (histogram): request latency
//! - `ledger_transactions_total` (counter): pipeline submissions by method, outcome
//! - `ledger_transaction_confirmation_seconds` (histogram): submit-to-outcome latency
//! - `ledger_chain_healthy` (gauge): 1=node reachable, 0=unreachable
//! - `ledger_pending_nonce` (gauge): next nonce this process will use
//!
//! # Design Decisions
//! - Labels are low-cardinality: matched route paths, contract method names
//! - Recording without an installed exporter is a no-op

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder with its scrape listener.
///
/// Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_request(method: &str, path: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("ledger_http_requests_total", &labels).increment(1);
    metrics::histogram!("ledger_http_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_transaction(method: &str, outcome: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("outcome", outcome.to_string()),
    ];
    metrics::counter!("ledger_transactions_total", &labels).increment(1);
    metrics::histogram!("ledger_transaction_confirmation_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_chain_health(connected: bool) {
    metrics::gauge!("ledger_chain_healthy").set(if connected { 1.0 } else { 0.0 });
}

pub fn record_pending_nonce(nonce: u64) {
    metrics::gauge!("ledger_pending_nonce").set(nonce as f64);
}
