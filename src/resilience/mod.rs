//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Post-switch verification:
//!     → retries.rs (bounded attempts, jittered exponential delay in between)
//! ```
//!
//! # Design Decisions
//! - Retries are bounded by attempt count, never open-ended
//! - Jittered backoff absorbs ARP/neighbour propagation delay
//! - Each attempt is still bounded by its own timeout

pub mod retries;

pub use retries::{retry_with_backoff, RetryPolicy};
