//! The remote execution capability.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::node::ServerNode;
use crate::remote::error::RemoteError;

/// Whether a server's alias currently carries the failover IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasState {
    Present,
    Absent,
}

/// Interface operations the controller performs on a server.
///
/// Implementations must be idempotent: bringing up an alias that is already
/// up, or down one that is already down, succeeds.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Add `ip` to `server` on its failover alias.
    async fn bring_up(&self, server: &ServerNode, ip: IpAddr) -> Result<(), RemoteError>;

    /// Remove `ip` from `server`'s failover alias.
    async fn bring_down(&self, server: &ServerNode, ip: IpAddr) -> Result<(), RemoteError>;

    /// Report whether `server` currently carries `ip`.
    async fn query_state(&self, server: &ServerNode, ip: IpAddr) -> Result<AliasState, RemoteError>;
}
