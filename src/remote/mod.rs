//! Remote execution subsystem.
//!
//! # Data Flow
//! ```text
//! FailoverController / MtrMeasurer
//!     → RemoteExecutor (bring_up / bring_down / query_state)
//!     → commands.rs (idempotent `ip addr` command lines)
//!     → ssh.rs (batch-mode ssh, killed on timeout)
//!     → server
//! ```
//!
//! # Design Decisions
//! - The executor is a trait so the controller can be driven by test doubles
//! - Every command is bounded by the check timeout; expiry kills the ssh child
//! - Exit status 255 is ssh's own failure and maps to Auth/Connection errors

pub mod commands;
pub mod error;
pub mod executor;
pub mod ssh;

pub use error::RemoteError;
pub use executor::{AliasState, RemoteExecutor};
pub use ssh::{CommandOutput, SshExecutor};
