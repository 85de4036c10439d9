//! Metrics collection and exposition.
//!
//! # Metrics
//! - `namesrv_resolutions_total` (counter): lookups by outcome
//! - `namesrv_registry_refresh_total` (counter): registry calls by kind, outcome
//! - `namesrv_probe_verdicts_total` (counter): probe verdicts by transport, origin
//! - `namesrv_pending_probes` (gauge): active probing sessions per origin
//! - `namesrv_dropped_datagrams_total` (counter): malformed requests
//!
//! Recording is a no-op until a recorder is installed, so library code and
//! tests can call these freely.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_resolution(outcome: &'static str) {
    metrics::counter!("namesrv_resolutions_total", "outcome" => outcome).increment(1);
}

pub fn record_refresh(kind: &'static str, outcome: &'static str) {
    metrics::counter!("namesrv_registry_refresh_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}

pub fn record_probe_verdict(transport: &'static str, origin: &'static str, verdict: &'static str) {
    metrics::counter!(
        "namesrv_probe_verdicts_total",
        "transport" => transport,
        "origin" => origin,
        "verdict" => verdict
    )
    .increment(1);
}

pub fn record_pending_probes(origin: &'static str, count: usize) {
    metrics::gauge!("namesrv_pending_probes", "origin" => origin).set(count as f64);
}

pub fn record_dropped_datagram() {
    metrics::counter!("namesrv_dropped_datagrams_total").increment(1);
}
