//! Authorization metrics.
//!
//! # Metrics
//! - `route_gate_decisions_total` (counter): by decision and deciding source
//! - `route_gate_transformations_total` (counter): transformations applied, by template
//! - `route_gate_errors_total` (counter): gateway failures, by kind
//! - `route_gate_policy_generation_seconds` (histogram): policy generator latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::policy::{Decision, DecisionSource};

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_decision(decision: Decision, source: DecisionSource) {
    ::metrics::counter!(
        "route_gate_decisions_total",
        "decision" => decision.as_str(),
        "source" => source.label()
    )
    .increment(1);
}

pub fn record_policy_generation(start: Instant) {
    ::metrics::histogram!("route_gate_policy_generation_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_transformations(path_template: &str, applied: usize) {
    if applied == 0 {
        return;
    }
    ::metrics::counter!(
        "route_gate_transformations_total",
        "path_template" => path_template.to_string()
    )
    .increment(applied as u64);
}

pub fn record_error(kind: &'static str) {
    ::metrics::counter!("route_gate_errors_total", "kind" => kind).increment(1);
}
