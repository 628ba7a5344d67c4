//! Alert events and their rendering.

use std::fmt::Write as _;
use std::net::IpAddr;

use crate::failover::plan::{Cleanup, MigrationError};
use crate::health::{SamplePair, WarningFlags};
use crate::node::{ServerId, ServerPair};
use crate::remote::RemoteError;

/// Something the operator must hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    /// A warn threshold was crossed or a server was unreachable.
    Warning {
        holder: ServerId,
        flags: WarningFlags,
        samples: SamplePair,
    },
    /// The failover IP moved.
    SwitchSucceeded {
        from: ServerId,
        to: ServerId,
        samples: SamplePair,
    },
    /// A migration was aborted; the source still serves.
    SwitchFailed {
        from: ServerId,
        to: ServerId,
        error: MigrationError,
        cleanup: Cleanup,
        samples: SamplePair,
    },
    /// The target serves but the source could not be released.
    PartialFailure {
        from: ServerId,
        to: ServerId,
        error: RemoteError,
        samples: SamplePair,
    },
}

/// How urgently a message needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Notice,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Notice => "NOTICE",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl AlertEvent {
    /// Label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AlertEvent::Warning { .. } => "warning",
            AlertEvent::SwitchSucceeded { .. } => "switch_succeeded",
            AlertEvent::SwitchFailed { .. } => "switch_failed",
            AlertEvent::PartialFailure { .. } => "partial_failure",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            AlertEvent::Warning { .. } => Severity::Warning,
            AlertEvent::SwitchSucceeded { .. } => Severity::Notice,
            AlertEvent::SwitchFailed { .. } => Severity::Error,
            AlertEvent::PartialFailure { .. } => Severity::Critical,
        }
    }

    pub fn samples(&self) -> &SamplePair {
        match self {
            AlertEvent::Warning { samples, .. }
            | AlertEvent::SwitchSucceeded { samples, .. }
            | AlertEvent::SwitchFailed { samples, .. }
            | AlertEvent::PartialFailure { samples, .. } => samples,
        }
    }

    fn summary(&self, failover_ip: IpAddr) -> String {
        match self {
            AlertEvent::Warning { flags, .. } => {
                format!("network health warning: {}", flags.describe().join(", "))
            }
            AlertEvent::SwitchSucceeded { from, to, .. } => {
                format!("failover IP {} moved from {} to {}", failover_ip, from, to)
            }
            AlertEvent::SwitchFailed { from, to, .. } => {
                format!("failed to move failover IP {} from {} to {}", failover_ip, from, to)
            }
            AlertEvent::PartialFailure { from, to, .. } => format!(
                "failover IP {} active on both {} and {}",
                failover_ip, from, to
            ),
        }
    }
}

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub severity: Severity,
}

impl AlertMessage {
    pub fn render(event: &AlertEvent, to: &str, servers: &ServerPair, failover_ip: IpAddr) -> Self {
        let severity = event.severity();
        let summary = event.summary(failover_ip);
        let subject = format!("[ip-failover-watch] {}: {}", severity.as_str(), summary);

        let mut body = String::new();
        let _ = writeln!(body, "{}", summary);
        let _ = writeln!(body);
        let _ = writeln!(body, "Event:       {}", event.kind());
        let _ = writeln!(body, "Failover IP: {}", failover_ip);

        match event {
            AlertEvent::Warning { holder, .. } => {
                let _ = writeln!(body, "Holder:      {}", holder);
            }
            AlertEvent::SwitchSucceeded { .. } => {}
            AlertEvent::SwitchFailed { error, cleanup, from, .. } => {
                let _ = writeln!(body, "Error:       {}", error);
                let _ = writeln!(body, "Cleanup:     {}", cleanup);
                let _ = writeln!(body, "Holder:      {} (unchanged)", from);
            }
            AlertEvent::PartialFailure { error, from, .. } => {
                let _ = writeln!(body, "Error:       {}", error);
                let _ = writeln!(
                    body,
                    "Action:      release the failover IP on {} ({}) manually",
                    from,
                    servers.get(*from).ip
                );
            }
        }

        let _ = writeln!(body);
        let _ = writeln!(body, "Samples:");
        for id in [ServerId::A, ServerId::B] {
            let node = servers.get(id);
            let _ = writeln!(
                body,
                "  {} ({}, {}): {}",
                id,
                node.ip,
                node.failover_eth,
                event.samples().get(id)
            );
        }

        Self {
            to: to.to_string(),
            subject,
            body,
            severity,
        }
    }
}
