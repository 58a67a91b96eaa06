//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define dispatch metrics (failures by type and resolution, route misses)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `either_failures_total` (counter): failures by `failure` type and `resolution`
//! - `either_route_misses_total` (counter): unselected requests by `status` (404/405)
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op, so the library
//!   never requires the exporter
//! - Labels are static strings where possible

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::responder::Resolution;

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_failure(failure: &'static str, resolution: Resolution) {
    metrics::counter!(
        "either_failures_total",
        "failure" => failure,
        "resolution" => resolution.as_str()
    )
    .increment(1);
}

pub fn record_route_miss(status: u16) {
    metrics::counter!("either_route_misses_total", "status" => status.to_string()).increment(1);
}
