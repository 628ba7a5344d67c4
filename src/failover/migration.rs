//! Migration protocol.
//!
//! # Steps
//! ```text
//! 1. bring-up on target      ── fail → cleanup target → Aborted
//! 2. verify target check_url ── fail → cleanup target → Aborted
//! 3. bring-down on source    ── fail → PartialFailure
//! 4. Completed
//! ```
//!
//! # Design Decisions
//! - Steps run strictly in order, never concurrently
//! - The source is only touched after the target verified, so the IP is never unheld
//! - Every step is bounded by the check timeout; expiry is that step's failure

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tracing::Instrument;

use crate::failover::plan::{Cleanup, MigrationError, MigrationOutcome, MigrationPlan};
use crate::failover::verify::{Verifier, VerifyError};
use crate::remote::{RemoteError, RemoteExecutor};
use crate::resilience::{retry_with_backoff, RetryPolicy};

/// Drives a [`MigrationPlan`] through the remote executor and verifier.
#[derive(Clone)]
pub struct Migrator {
    executor: Arc<dyn RemoteExecutor>,
    verifier: Arc<dyn Verifier>,
    step_timeout: Duration,
    verify_policy: RetryPolicy,
}

impl Migrator {
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        verifier: Arc<dyn Verifier>,
        step_timeout: Duration,
        verify_policy: RetryPolicy,
    ) -> Self {
        Self {
            executor,
            verifier,
            step_timeout,
            verify_policy,
        }
    }

    /// Execute `plan`. Never returns an error: every failure becomes an outcome.
    pub async fn execute(&self, plan: &MigrationPlan) -> MigrationOutcome {
        let span = tracing::info_span!(
            "migration",
            id = %plan.id,
            source = %plan.source.id,
            target = %plan.target.id,
            failover_ip = %plan.failover_ip,
        );
        self.run(plan).instrument(span).await
    }

    async fn run(&self, plan: &MigrationPlan) -> MigrationOutcome {
        let ip = plan.failover_ip;
        let target = &plan.bring_up.server;
        let source = &plan.bring_down.server;

        tracing::info!(step = %plan.bring_up.op, server = %target.id, "Bringing failover IP up on target");
        if let Err(e) = self.bounded(self.executor.bring_up(target, ip)).await {
            tracing::error!(error = %e, "Bring-up failed, releasing target");
            let cleanup = self.cleanup(plan).await;
            return MigrationOutcome::Aborted {
                error: MigrationError::BringUp(e),
                cleanup,
            };
        }

        tracing::info!(url = %plan.verify_url, "Verifying target");
        let verified =
            retry_with_backoff(&self.verify_policy, "verification", |_| self.verify_once(plan)).await;
        if let Err(e) = verified {
            tracing::error!(error = %e, "Verification failed, releasing target; source left serving");
            let cleanup = self.cleanup(plan).await;
            return MigrationOutcome::Aborted {
                error: MigrationError::Verification(e),
                cleanup,
            };
        }

        tracing::info!(step = %plan.bring_down.op, server = %source.id, "Releasing failover IP on source");
        if let Err(e) = self.bounded(self.executor.bring_down(source, ip)).await {
            tracing::error!(error = %e, "Release failed, both servers hold the failover IP");
            return MigrationOutcome::PartialFailure { error: e };
        }

        tracing::info!("Migration completed");
        MigrationOutcome::Completed
    }

    async fn verify_once(&self, plan: &MigrationPlan) -> Result<(), VerifyError> {
        let attempt = self.verifier.verify(&plan.verify_url, self.step_timeout);
        match time::timeout(self.step_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(VerifyError::Timeout {
                url: plan.verify_url.to_string(),
                timeout: self.step_timeout,
            }),
        }
    }

    /// Best-effort bring-down on the target.
    async fn cleanup(&self, plan: &MigrationPlan) -> Cleanup {
        match self
            .bounded(self.executor.bring_down(&plan.target, plan.failover_ip))
            .await
        {
            Ok(()) => Cleanup::Released,
            Err(e) => {
                tracing::warn!(server = %plan.target.id, error = %e, "Cleanup on target failed");
                Cleanup::Failed(e)
            }
        }
    }

    async fn bounded<F>(&self, step: F) -> Result<(), RemoteError>
    where
        F: Future<Output = Result<(), RemoteError>>,
    {
        match time::timeout(self.step_timeout, step).await {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout(self.step_timeout)),
        }
    }
}
