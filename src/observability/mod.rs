//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events, cycle and migration spans)
//!     → metrics.rs (samples, holder, migrations, alerts)
//!
//! Consumers:
//!     → Log aggregation (stdout, journald)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Structured logging; JSON output for machine parsing
//! - Metric updates are no-ops when no exporter is installed
//! - Every migration carries its plan id in a span

pub mod logging;
pub mod metrics;
