//! Alerting subsystem.
//!
//! # Data Flow
//! ```text
//! FailoverController
//!     → AlertEvent (event.rs)
//!     → Alerter::notify (alerter.rs: warning de-duplication)
//!     → AlertMessage (subject, severity, body)
//!     → Mailer (mailer.rs: sendmail -t -i)
//! ```
//!
//! # Design Decisions
//! - Only warnings are de-duplicated; switch and failure events always go out
//! - Delivery is best-effort: failures are logged and swallowed
//! - The mailer is a trait so tests can capture messages

pub mod alerter;
pub mod event;
pub mod mailer;

pub use alerter::{Alerter, Delivery};
pub use event::{AlertEvent, AlertMessage, Severity};
pub use mailer::{AlertError, Mailer, SendmailMailer};
