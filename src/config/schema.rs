//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the watcher.
//! The top-level fields and the `network_health_check`, `ssh_opts`,
//! `server_a` and `server_b` sections are mandatory; a file missing any of
//! them fails to deserialize. The remaining sections carry defaults.

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::node::ServerId;

/// Root configuration for the failover watcher.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FailoverConfig {
    /// The floating address moved between the two servers.
    pub failover_ip: IpAddr,

    /// Recipient of every alert.
    pub alert_email: String,

    /// Seconds bounding every probe, remote command and verification request.
    pub check_timeout: u64,

    /// Reference host and thresholds used to compare the servers.
    pub network_health_check: NetworkHealthCheckConfig,

    /// Credentials for the remote command channel.
    pub ssh_opts: SshOptions,

    pub server_a: ServerConfig,

    pub server_b: ServerConfig,

    /// Anti-flap confirmation counts.
    #[serde(default)]
    pub hysteresis: HysteresisConfig,

    /// Control loop settings.
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Alert delivery settings.
    #[serde(default)]
    pub alerting: AlertingConfig,

    /// Observability settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl FailoverConfig {
    /// The per-step deadline derived from `check_timeout`.
    pub fn check_timeout(&self) -> Duration {
        Duration::from_secs(self.check_timeout)
    }

    /// Configuration of one of the two servers.
    pub fn server(&self, id: ServerId) -> &ServerConfig {
        match id {
            ServerId::A => &self.server_a,
            ServerId::B => &self.server_b,
        }
    }
}

/// Reference host and comparison thresholds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NetworkHealthCheckConfig {
    /// Address both servers trace toward.
    pub check_ip: IpAddr,

    /// Warn when a server has an average round-trip time of at least this (ms).
    pub warn_at_time: f64,

    /// Warn when a server has a packet loss of at least this (percent).
    pub warn_at_loss: f64,

    /// Switch when the opposite server is faster by more than this (ms).
    pub switch_with_timediff: f64,

    /// Switch when the opposite server loses less by more than this (points).
    pub switch_with_lossdiff: f64,

    /// Packets sent per measurement.
    #[serde(default = "default_report_cycles")]
    pub report_cycles: u32,
}

fn default_report_cycles() -> u32 {
    5
}

/// Remote command channel credentials.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SshOptions {
    pub port: u16,
    pub user: String,
    pub keyfile: PathBuf,
}

/// Per-server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Administrative address used for the remote channel.
    pub ip: IpAddr,

    /// Interface alias hosting the failover IP (e.g. "eth0:2").
    pub failover_eth: String,

    /// URL fetched to verify the server after it acquires the failover IP.
    pub check_url: Url,
}

/// Hysteresis configuration.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct HysteresisConfig {
    /// Consecutive same-direction recommendations required before migrating.
    pub confirmations: u32,

    /// Consecutive cycles with the holder unreachable required before migrating.
    pub unreachable_confirmations: u32,
}

impl Default for HysteresisConfig {
    fn default() -> Self {
        Self {
            confirmations: 3,
            unreachable_confirmations: 2,
        }
    }
}

/// Control loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Seconds between the start of two cycles in run-forever mode.
    pub check_interval_secs: u64,

    /// Holder assumed when neither server reports the alias at startup.
    pub fallback_holder: ServerId,

    /// Where the holder and hysteresis streak are kept between runs.
    pub state_file: Option<PathBuf>,

    /// Verification attempts after bringing the target up.
    pub verify_attempts: u32,

    /// Base delay between verification attempts in milliseconds.
    pub verify_backoff_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 60,
            fallback_holder: ServerId::A,
            state_file: None,
            verify_attempts: 3,
            verify_backoff_ms: 500,
        }
    }
}

/// Alert delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Local MTA binary invoked as `sendmail -t -i`.
    pub sendmail_path: PathBuf,

    /// Envelope sender.
    pub from: String,

    /// Identical warnings are suppressed for `check_timeout` times this factor.
    pub warning_dedup_factor: u32,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            sendmail_path: PathBuf::from("/usr/sbin/sendmail"),
            from: "ip-failover-watch@localhost".to_string(),
            warning_dedup_factor: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}
