//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, loss percentages <= 100)
//! - Reject values that end up inside remote shell commands unless they are
//!   plain interface names
//! - Detect conflicting addresses (failover IP equal to a server IP)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FailoverConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::{FailoverConfig, ServerConfig};
use crate::node::ServerId;

/// Linux limits interface names (and alias labels) to 15 bytes.
const MAX_IFACE_LEN: usize = 15;

/// A single dropped probe must never move the IP.
const MIN_UNREACHABLE_CONFIRMATIONS: u32 = 2;

const MAX_CHECK_TIMEOUT_SECS: u64 = 3_600;
const MAX_DEDUP_FACTOR: u32 = 1_000;
const MAX_VERIFY_BACKOFF_MS: u64 = 60_000;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("check_timeout must be greater than zero")]
    ZeroCheckTimeout,

    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        field: &'static str,
        value: u64,
        max: u64,
    },

    #[error("server_a and server_b share the address {0}")]
    DuplicateServerIp(std::net::IpAddr),

    #[error("failover_ip {ip} is the administrative address of {server}")]
    FailoverIpIsServerIp {
        ip: std::net::IpAddr,
        server: ServerId,
    },

    #[error("{server}.failover_eth {value:?} is not a valid interface alias")]
    InvalidInterface { server: ServerId, value: String },

    #[error("{server}.check_url must use http or https, got {scheme:?}")]
    InvalidCheckUrl { server: ServerId, scheme: String },

    #[error("network_health_check.{field} must be between 0 and {max}, got {value}")]
    ThresholdOutOfRange {
        field: &'static str,
        value: f64,
        max: f64,
    },

    #[error("network_health_check.report_cycles must be greater than zero")]
    ZeroReportCycles,

    #[error("ssh_opts.{0} must not be empty")]
    EmptySshField(&'static str),

    #[error("ssh_opts.port must be greater than zero")]
    ZeroSshPort,

    #[error("alert_email {0:?} is not an email address")]
    InvalidAlertEmail(String),

    #[error("hysteresis.{0} must be at least 1")]
    ZeroConfirmations(&'static str),

    #[error("hysteresis.unreachable_confirmations must be at least {min}, got {value}")]
    TooFewUnreachableConfirmations { value: u32, min: u32 },

    #[error("alerting.from {0:?} is not a usable sender address")]
    InvalidSender(String),

    #[error("hysteresis.unreachable_confirmations ({unreachable}) exceeds confirmations ({confirmations})")]
    UnreachableExceedsConfirmations { unreachable: u32, confirmations: u32 },

    #[error("controller.{0} must be greater than zero")]
    ZeroControllerField(&'static str),
}

/// Validate a deserialized configuration, collecting every problem found.
pub fn validate_config(config: &FailoverConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.check_timeout == 0 {
        errors.push(ValidationError::ZeroCheckTimeout);
    }
    check_max("check_timeout", config.check_timeout, MAX_CHECK_TIMEOUT_SECS, &mut errors);

    if config.server_a.ip == config.server_b.ip {
        errors.push(ValidationError::DuplicateServerIp(config.server_a.ip));
    }

    for id in [ServerId::A, ServerId::B] {
        validate_server(config, id, config.server(id), &mut errors);
    }

    let health = &config.network_health_check;
    check_range("warn_at_time", health.warn_at_time, f64::MAX, &mut errors);
    check_range("warn_at_loss", health.warn_at_loss, 100.0, &mut errors);
    check_range("switch_with_timediff", health.switch_with_timediff, f64::MAX, &mut errors);
    check_range("switch_with_lossdiff", health.switch_with_lossdiff, 100.0, &mut errors);
    if health.report_cycles == 0 {
        errors.push(ValidationError::ZeroReportCycles);
    }

    if config.ssh_opts.user.trim().is_empty() {
        errors.push(ValidationError::EmptySshField("user"));
    }
    if config.ssh_opts.keyfile.as_os_str().is_empty() {
        errors.push(ValidationError::EmptySshField("keyfile"));
    }
    if config.ssh_opts.port == 0 {
        errors.push(ValidationError::ZeroSshPort);
    }

    if !is_plausible_email(&config.alert_email) {
        errors.push(ValidationError::InvalidAlertEmail(config.alert_email.clone()));
    }

    let hysteresis = &config.hysteresis;
    if hysteresis.confirmations == 0 {
        errors.push(ValidationError::ZeroConfirmations("confirmations"));
    }
    if hysteresis.unreachable_confirmations < MIN_UNREACHABLE_CONFIRMATIONS {
        errors.push(ValidationError::TooFewUnreachableConfirmations {
            value: hysteresis.unreachable_confirmations,
            min: MIN_UNREACHABLE_CONFIRMATIONS,
        });
    }
    if hysteresis.unreachable_confirmations > hysteresis.confirmations {
        errors.push(ValidationError::UnreachableExceedsConfirmations {
            unreachable: hysteresis.unreachable_confirmations,
            confirmations: hysteresis.confirmations,
        });
    }

    if config.controller.check_interval_secs == 0 {
        errors.push(ValidationError::ZeroControllerField("check_interval_secs"));
    }
    if config.controller.verify_attempts == 0 {
        errors.push(ValidationError::ZeroControllerField("verify_attempts"));
    }
    check_max(
        "controller.verify_backoff_ms",
        config.controller.verify_backoff_ms,
        MAX_VERIFY_BACKOFF_MS,
        &mut errors,
    );

    if !is_plausible_email(&config.alerting.from) {
        errors.push(ValidationError::InvalidSender(config.alerting.from.clone()));
    }
    check_max(
        "alerting.warning_dedup_factor",
        u64::from(config.alerting.warning_dedup_factor),
        u64::from(MAX_DEDUP_FACTOR),
        &mut errors,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_server(
    config: &FailoverConfig,
    id: ServerId,
    server: &ServerConfig,
    errors: &mut Vec<ValidationError>,
) {
    if server.ip == config.failover_ip {
        errors.push(ValidationError::FailoverIpIsServerIp {
            ip: config.failover_ip,
            server: id,
        });
    }

    if !is_valid_interface(&server.failover_eth) {
        errors.push(ValidationError::InvalidInterface {
            server: id,
            value: server.failover_eth.clone(),
        });
    }

    let scheme = server.check_url.scheme();
    if scheme != "http" && scheme != "https" {
        errors.push(ValidationError::InvalidCheckUrl {
            server: id,
            scheme: scheme.to_string(),
        });
    }
}

fn check_range(field: &'static str, value: f64, max: f64, errors: &mut Vec<ValidationError>) {
    if !value.is_finite() || value < 0.0 || value > max {
        errors.push(ValidationError::ThresholdOutOfRange { field, value, max });
    }
}

fn check_max(field: &'static str, value: u64, max: u64, errors: &mut Vec<ValidationError>) {
    if value > max {
        errors.push(ValidationError::TooLarge { field, value, max });
    }
}

/// Interface names are interpolated into remote commands.
fn is_valid_interface(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_IFACE_LEN
        && !name.starts_with(['-', ':'])
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-'))
}

fn is_plausible_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !address.contains(|c: char| c.is_whitespace() || c.is_control())
        }
        None => false,
    }
}
