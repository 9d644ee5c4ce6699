//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_checks_total` (counter): check relays by outcome status and method
//! - `relay_check_duration_seconds` (histogram): check latency
//! - `relay_head_fallbacks_total` (counter): HEAD→GET fallbacks issued
//! - `relay_passthrough_total` (counter): passthrough relays by kind and status code
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use std::net::SocketAddr;
use std::time::Duration;

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::relay::{RelayMethod, RelayStatus};

/// Install the Prometheus exporter with its own scrape listener.
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_check(status: RelayStatus, method: RelayMethod, elapsed: Duration) {
    counter!("relay_checks_total", "status" => status.as_str(), "method" => method.as_str()).increment(1);
    histogram!("relay_check_duration_seconds", "method" => method.as_str()).record(elapsed.as_secs_f64());
}

pub fn record_head_fallback() {
    counter!("relay_head_fallbacks_total").increment(1);
}

/// `kind` is `"generic"` or `"path"`.
pub fn record_passthrough(kind: &'static str, status: u16) {
    counter!("relay_passthrough_total", "kind" => kind, "status" => status.to_string()).increment(1);
}
