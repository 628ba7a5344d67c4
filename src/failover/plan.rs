//! Migration plans and outcomes.

use std::fmt;
use std::net::IpAddr;

use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::failover::verify::VerifyError;
use crate::node::{ServerId, ServerNode, ServerPair};
use crate::remote::RemoteError;

/// A remote interface operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasOp {
    BringUp,
    BringDown,
}

impl fmt::Display for AliasOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AliasOp::BringUp => f.write_str("bring-up"),
            AliasOp::BringDown => f.write_str("bring-down"),
        }
    }
}

/// One operation bound to the server it runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOp {
    pub op: AliasOp,
    pub server: ServerNode,
}

/// Everything needed to move the failover IP from `source` to `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPlan {
    pub id: Uuid,
    pub source: ServerNode,
    pub target: ServerNode,
    pub failover_ip: IpAddr,
    pub bring_up: PlannedOp,
    pub bring_down: PlannedOp,
    pub verify_url: Url,
}

impl MigrationPlan {
    /// Plan a move away from `from` to the other server.
    pub fn new(servers: &ServerPair, from: ServerId, failover_ip: IpAddr) -> Self {
        let source = servers.get(from).clone();
        let target = servers.get(from.other()).clone();
        Self {
            id: Uuid::new_v4(),
            bring_up: PlannedOp {
                op: AliasOp::BringUp,
                server: target.clone(),
            },
            bring_down: PlannedOp {
                op: AliasOp::BringDown,
                server: source.clone(),
            },
            verify_url: target.check_url.clone(),
            source,
            target,
            failover_ip,
        }
    }
}

/// Why a migration stopped before touching the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    #[error("bring-up on target failed: {0}")]
    BringUp(#[source] RemoteError),

    #[error("verification of target failed: {0}")]
    Verification(#[source] VerifyError),
}

/// Result of the best-effort bring-down on the target after an aborted migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    Released,
    Failed(RemoteError),
}

impl fmt::Display for Cleanup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cleanup::Released => f.write_str("target alias released"),
            Cleanup::Failed(e) => write!(f, "target alias release failed: {}", e),
        }
    }
}

/// How a migration ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Target serving, source released.
    Completed,
    /// Source untouched and still serving.
    Aborted { error: MigrationError, cleanup: Cleanup },
    /// Target serving but the source still holds the IP.
    PartialFailure { error: RemoteError },
}

impl MigrationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, MigrationOutcome::Completed)
    }

    /// Label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            MigrationOutcome::Completed => "completed",
            MigrationOutcome::Aborted { .. } => "aborted",
            MigrationOutcome::PartialFailure { .. } => "partial_failure",
        }
    }
}
