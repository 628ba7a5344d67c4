//! mtr-based measurement.
//!
//! Runs `mtr --report --json` on the probing server over the remote channel
//! and reads the final hop of the report, which is the reference host.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::health::probe::{Measurement, Measurer, ProbeError};
use crate::health::sample::UNREACHABLE_TIME_MS;
use crate::node::ServerNode;
use crate::remote::{commands, SshExecutor};

#[derive(Debug, Deserialize)]
struct MtrOutput {
    report: MtrReport,
}

#[derive(Debug, Deserialize)]
struct MtrReport {
    #[serde(default)]
    hubs: Vec<MtrHub>,
}

#[derive(Debug, Deserialize)]
struct MtrHub {
    #[serde(rename = "Loss%")]
    loss: f64,
    #[serde(rename = "Avg")]
    avg: f64,
}

/// Measures through `mtr` executed on the probing server.
pub struct MtrMeasurer {
    executor: Arc<SshExecutor>,
    report_cycles: u32,
}

impl MtrMeasurer {
    pub fn new(executor: Arc<SshExecutor>, report_cycles: u32) -> Self {
        Self {
            executor,
            report_cycles,
        }
    }
}

#[async_trait]
impl Measurer for MtrMeasurer {
    async fn measure(
        &self,
        from: &ServerNode,
        target: IpAddr,
        timeout: Duration,
    ) -> Result<Measurement, ProbeError> {
        let command = commands::mtr_report(target, self.report_cycles);
        let output = self
            .executor
            .run_command(from, &command, timeout)
            .await
            .map_err(|e| {
                if e.is_transport() {
                    ProbeError::Unreachable(e)
                } else {
                    ProbeError::Measurement(e.to_string())
                }
            })?;

        parse_report(&output.stdout)
    }
}

/// Extract the final hop's figures from an mtr JSON report.
pub fn parse_report(json: &str) -> Result<Measurement, ProbeError> {
    let output: MtrOutput = serde_json::from_str(json)
        .map_err(|e| ProbeError::Measurement(format!("unreadable mtr report: {}", e)))?;

    let last = output
        .report
        .hubs
        .last()
        .ok_or_else(|| ProbeError::Measurement("mtr report has no hops".to_string()))?;

    let loss_pct = last.loss.clamp(0.0, 100.0);
    // With every packet lost mtr reports an average of zero.
    let avg_time_ms = if loss_pct >= 100.0 {
        UNREACHABLE_TIME_MS
    } else {
        last.avg.max(0.0)
    };

    Ok(Measurement {
        avg_time_ms,
        loss_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_last_hop() {
        let json = r#"{
          "report": {
            "mtr": {"src": "web-a", "dst": "192.168.177.11", "tos": 0, "tests": 5, "psize": "64", "bitpattern": "0x00"},
            "hubs": [
              {"count": 1, "host": "192.168.180.1", "Loss%": 0.0, "Snt": 5, "Last": 0.4, "Avg": 0.5, "Best": 0.3, "Wrst": 0.9, "StDev": 0.2},
              {"count": 2, "host": "192.168.177.11", "Loss%": 20.0, "Snt": 5, "Last": 3.1, "Avg": 2.8, "Best": 2.1, "Wrst": 3.9, "StDev": 0.6}
            ]
          }
        }"#;

        let m = parse_report(json).unwrap();
        assert_eq!(m.loss_pct, 20.0);
        assert_eq!(m.avg_time_ms, 2.8);
    }

    #[test]
    fn total_loss_reports_sentinel_time() {
        let json = r#"{"report": {"hubs": [{"count": "1", "host": "???", "Loss%": 100.0, "Snt": 5, "Avg": 0.0}]}}"#;
        let m = parse_report(json).unwrap();
        assert_eq!(m.loss_pct, 100.0);
        assert_eq!(m.avg_time_ms, UNREACHABLE_TIME_MS);
    }

    #[test]
    fn empty_report_is_measurement_error() {
        let err = parse_report(r#"{"report": {"hubs": []}}"#).unwrap_err();
        assert!(matches!(err, ProbeError::Measurement(_)));
    }

    #[test]
    fn garbage_is_measurement_error() {
        assert!(matches!(
            parse_report("mtr: command not found"),
            Err(ProbeError::Measurement(_))
        ));
    }
}
