//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Concrete adapters → FailoverController → Resolve holder
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Latched watch flag → Control loop finishes its cycle and exits
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - A cycle in progress is allowed to finish; no migration is cut in half

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use signals::wait_for_signal;
pub use startup::{build_controller, StartupError};
