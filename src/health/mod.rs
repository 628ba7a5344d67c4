//! Health sampling and comparison subsystem.
//!
//! # Data Flow
//! ```text
//! Per cycle (probe.rs):
//!     Measurer on server A ─┐
//!                           ├─ shared deadline → SamplePair
//!     Measurer on server B ─┘
//!
//! Comparison (comparator.rs):
//!     SamplePair + Thresholds
//!     → ComparisonResult (better server, diffs, warn, switch recommendation)
//!
//! Measurement (mtr.rs):
//!     mtr --report --json, executed on the server over the remote channel
//! ```
//!
//! # Design Decisions
//! - A failed or timed-out probe is a sample, not an error
//! - Loss dominates latency when choosing a direction
//! - Thresholds are exclusive: a difference equal to the threshold never switches

pub mod comparator;
pub mod mtr;
pub mod probe;
pub mod sample;

pub use comparator::{ComparisonResult, HealthComparator, SwitchReason, Thresholds, WarningFlags};
pub use mtr::MtrMeasurer;
pub use probe::{HealthProbe, Measurement, Measurer, ProbeError};
pub use sample::{HealthSample, SamplePair, UNREACHABLE_TIME_MS};
