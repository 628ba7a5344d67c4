//! Active/standby failover watcher for a floating IP shared by two servers.

pub mod alert;
pub mod config;
pub mod failover;
pub mod health;
pub mod lifecycle;
pub mod node;
pub mod observability;
pub mod remote;
pub mod resilience;

pub use config::schema::FailoverConfig;
pub use failover::FailoverController;
pub use lifecycle::Shutdown;
pub use node::{ServerId, ServerPair};
