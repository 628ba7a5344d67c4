//! Health samples.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use crate::node::ServerId;

/// Round-trip time recorded for a probe that produced no measurement.
pub const UNREACHABLE_TIME_MS: f64 = 1_000_000.0;

/// One latency/loss observation from a server toward the reference host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    pub server: ServerId,
    pub target: IpAddr,
    pub avg_time_ms: f64,
    pub loss_pct: f64,
    /// False when the probe failed or timed out.
    pub valid: bool,
    /// Why the probe failed, for alert bodies and logs.
    pub error: Option<String>,
}

impl HealthSample {
    pub fn valid(server: ServerId, target: IpAddr, avg_time_ms: f64, loss_pct: f64) -> Self {
        Self {
            server,
            target,
            avg_time_ms: avg_time_ms.max(0.0),
            loss_pct: loss_pct.clamp(0.0, 100.0),
            valid: true,
            error: None,
        }
    }

    /// Worst-case sample for a probe that could not complete.
    pub fn invalid(server: ServerId, target: IpAddr, error: impl Into<String>) -> Self {
        Self {
            server,
            target,
            avg_time_ms: UNREACHABLE_TIME_MS,
            loss_pct: 100.0,
            valid: false,
            error: Some(error.into()),
        }
    }
}

impl fmt::Display for HealthSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(
                f,
                "{} -> {}: avg {:.1} ms, loss {:.1}%",
                self.server, self.target, self.avg_time_ms, self.loss_pct
            )
        } else {
            write!(
                f,
                "{} -> {}: unreachable ({})",
                self.server,
                self.target,
                self.error.as_deref().unwrap_or("no measurement")
            )
        }
    }
}

/// The samples of one cycle, one per server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplePair {
    pub a: HealthSample,
    pub b: HealthSample,
}

impl SamplePair {
    pub fn get(&self, id: ServerId) -> &HealthSample {
        match id {
            ServerId::A => &self.a,
            ServerId::B => &self.b,
        }
    }
}
