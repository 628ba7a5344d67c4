//! Health probing.
//!
//! # Responsibilities
//! - Obtain a latency/loss sample from each server's vantage point
//! - Enforce the check timeout as a hard bound on every probe
//! - Degrade any failure into an invalid sample instead of an error

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::time;

use crate::health::sample::{HealthSample, SamplePair};
use crate::node::{ServerNode, ServerPair};
use crate::observability::metrics;
use crate::remote::RemoteError;

/// Raw figures produced by a measurement tool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub avg_time_ms: f64,
    pub loss_pct: f64,
}

/// Errors that keep a probe from producing a measurement.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    /// The probe did not finish within the check timeout.
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),

    /// The server itself could not be reached or refused the credentials.
    #[error("server unreachable: {0}")]
    Unreachable(#[source] RemoteError),

    /// The tool ran but its output was unusable.
    #[error("measurement failed: {0}")]
    Measurement(String),
}

/// A latency/loss measurement taken from one server toward a target.
#[async_trait]
pub trait Measurer: Send + Sync {
    async fn measure(
        &self,
        from: &ServerNode,
        target: IpAddr,
        timeout: Duration,
    ) -> Result<Measurement, ProbeError>;
}

/// Samples both servers through a [`Measurer`].
#[derive(Clone)]
pub struct HealthProbe {
    measurer: Arc<dyn Measurer>,
}

impl HealthProbe {
    pub fn new(measurer: Arc<dyn Measurer>) -> Self {
        Self { measurer }
    }

    /// Sample `server` toward `target`. Never takes longer than `timeout`.
    pub async fn sample(&self, server: &ServerNode, target: IpAddr, timeout: Duration) -> HealthSample {
        let measured = time::timeout(timeout, self.measurer.measure(server, target, timeout)).await;

        let sample = match measured {
            Ok(Ok(m)) => HealthSample::valid(server.id, target, m.avg_time_ms, m.loss_pct),
            Ok(Err(e)) => {
                tracing::warn!(server = %server.id, error = %e, "Probe failed");
                HealthSample::invalid(server.id, target, e.to_string())
            }
            Err(_) => {
                let e = ProbeError::Timeout(timeout);
                tracing::warn!(server = %server.id, error = %e, "Probe cancelled");
                HealthSample::invalid(server.id, target, e.to_string())
            }
        };

        metrics::record_sample(&sample);
        sample
    }

    /// Sample both servers concurrently under a shared deadline.
    pub async fn sample_pair(&self, servers: &ServerPair, target: IpAddr, timeout: Duration) -> SamplePair {
        let (a, b) = tokio::join!(
            self.sample(servers.a(), target, timeout),
            self.sample(servers.b(), target, timeout),
        );
        SamplePair { a, b }
    }
}
