//! The two redundant servers.

use std::fmt;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::FailoverConfig;

/// Identity of one of the two servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum ServerId {
    #[serde(rename = "server_a", alias = "a")]
    A,
    #[serde(rename = "server_b", alias = "b")]
    B,
}

impl ServerId {
    /// The opposite server.
    pub fn other(self) -> Self {
        match self {
            ServerId::A => ServerId::B,
            ServerId::B => ServerId::A,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServerId::A => "server_a",
            ServerId::B => "server_b",
        }
    }
}

impl fmt::Display for ServerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A server as seen by the watcher. Immutable after configuration load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerNode {
    pub id: ServerId,
    /// Administrative address.
    pub ip: IpAddr,
    /// Interface alias hosting the failover IP.
    pub failover_eth: String,
    pub check_url: Url,
}

impl ServerNode {
    /// Base device of the alias ("eth0" for "eth0:2").
    pub fn device(&self) -> &str {
        self.failover_eth
            .split_once(':')
            .map(|(dev, _)| dev)
            .unwrap_or(&self.failover_eth)
    }
}

/// Exactly two servers.
#[derive(Debug, Clone)]
pub struct ServerPair {
    a: ServerNode,
    b: ServerNode,
}

impl ServerPair {
    pub fn new(a: ServerNode, b: ServerNode) -> Self {
        Self { a, b }
    }

    pub fn from_config(config: &FailoverConfig) -> Self {
        let node = |id: ServerId| {
            let server = config.server(id);
            ServerNode {
                id,
                ip: server.ip,
                failover_eth: server.failover_eth.clone(),
                check_url: server.check_url.clone(),
            }
        };
        Self::new(node(ServerId::A), node(ServerId::B))
    }

    pub fn get(&self, id: ServerId) -> &ServerNode {
        match id {
            ServerId::A => &self.a,
            ServerId::B => &self.b,
        }
    }

    pub fn a(&self) -> &ServerNode {
        &self.a
    }

    pub fn b(&self) -> &ServerNode {
        &self.b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(eth: &str) -> ServerNode {
        ServerNode {
            id: ServerId::A,
            ip: "10.0.0.1".parse().unwrap(),
            failover_eth: eth.to_string(),
            check_url: Url::parse("http://10.0.0.1:9200/").unwrap(),
        }
    }

    #[test]
    fn device_strips_alias_suffix() {
        assert_eq!(node("eth0:2").device(), "eth0");
        assert_eq!(node("bond0").device(), "bond0");
    }

    #[test]
    fn other_is_involutive() {
        assert_eq!(ServerId::A.other(), ServerId::B);
        assert_eq!(ServerId::B.other().other(), ServerId::B);
    }
}
