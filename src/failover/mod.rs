//! Failover decision and migration subsystem.
//!
//! # Data Flow
//! ```text
//! controller.rs (one cycle):
//!     HealthProbe::sample_pair → HealthComparator::compare
//!     → state.rs (hysteresis) → Decision
//!     → on Migrate: plan.rs (MigrationPlan) → migration.rs (Migrator)
//!         → RemoteExecutor (bring-up) → verify.rs (Verifier) → RemoteExecutor (bring-down)
//!     → MigrationOutcome → state.rs (holder bookkeeping) → Alerter
//!     → store.rs (persist holder and streak)
//! ```
//!
//! # Design Decisions
//! - FailoverState is owned by the controller and never shared
//! - Cycles never overlap; the loop awaits each one before the next tick
//! - Remote and verification failures become outcomes, never loop errors

pub mod controller;
pub mod migration;
pub mod plan;
pub mod state;
pub mod store;
pub mod verify;

pub use controller::{Collaborators, CycleReport, FailoverController};
pub use migration::Migrator;
pub use plan::{AliasOp, Cleanup, MigrationError, MigrationOutcome, MigrationPlan};
pub use state::{Decision, FailoverState, PendingSwitch, Phase};
pub use store::{PersistedState, StateStore, StoreError};
pub use verify::{HttpVerifier, Verifier, VerifyError};
