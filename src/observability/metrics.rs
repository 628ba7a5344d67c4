//! Metrics collection and exposition.
//!
//! # Metrics
//! - `failover_probe_rtt_ms` (gauge): last average round-trip time by server
//! - `failover_probe_loss_pct` (gauge): last packet loss by server
//! - `failover_probe_invalid_total` (counter): failed or timed-out probes by server
//! - `failover_cycles_total` (counter): completed control cycles
//! - `failover_holder` (gauge): 0 = server_a, 1 = server_b
//! - `failover_migrations_total` (counter): migrations by outcome
//! - `failover_alerts_total` (counter): alerts by kind and result

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::health::HealthSample;
use crate::node::ServerId;

/// Start the Prometheus endpoint. Requires a running Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_sample(sample: &HealthSample) {
    let server = sample.server.as_str();
    if sample.valid {
        gauge!("failover_probe_rtt_ms", "server" => server).set(sample.avg_time_ms);
        gauge!("failover_probe_loss_pct", "server" => server).set(sample.loss_pct);
    } else {
        counter!("failover_probe_invalid_total", "server" => server).increment(1);
    }
}

pub fn record_cycle(holder: ServerId) {
    counter!("failover_cycles_total").increment(1);
    record_holder(holder);
}

pub fn record_holder(holder: ServerId) {
    let value = match holder {
        ServerId::A => 0.0,
        ServerId::B => 1.0,
    };
    gauge!("failover_holder").set(value);
}

pub fn record_migration(outcome: &'static str) {
    counter!("failover_migrations_total", "outcome" => outcome).increment(1);
}

pub fn record_alert(kind: &'static str, result: &'static str) {
    counter!("failover_alerts_total", "kind" => kind, "result" => result).increment(1);
}
