//! The control loop.
//!
//! # Responsibilities
//! - Determine the current holder at startup
//! - Run one probe → compare → decide → (migrate) → alert cycle per tick
//! - Persist the holder and streak when a state file is configured
//!
//! # Design Decisions
//! - A cycle never fails; every error is logged, alerted or folded into an outcome
//! - The observed alias state at startup wins over the persisted holder

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::{self, MissedTickBehavior};
use tracing::Instrument;

use crate::alert::{AlertEvent, Alerter, Mailer};
use crate::config::{FailoverConfig, HysteresisConfig};
use crate::failover::migration::Migrator;
use crate::failover::plan::{MigrationOutcome, MigrationPlan};
use crate::failover::state::{Decision, FailoverState};
use crate::failover::store::StateStore;
use crate::failover::verify::Verifier;
use crate::health::{ComparisonResult, HealthComparator, HealthProbe, Measurer, SamplePair, Thresholds};
use crate::lifecycle::ShutdownSignal;
use crate::node::{ServerId, ServerPair};
use crate::observability::metrics;
use crate::remote::{AliasState, RemoteExecutor};
use crate::resilience::RetryPolicy;

/// The capabilities the controller drives.
#[derive(Clone)]
pub struct Collaborators {
    pub measurer: Arc<dyn Measurer>,
    pub executor: Arc<dyn RemoteExecutor>,
    pub verifier: Arc<dyn Verifier>,
    pub mailer: Arc<dyn Mailer>,
}

/// What a single cycle saw and did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub samples: SamplePair,
    pub comparison: ComparisonResult,
    pub decision: Decision,
    pub outcome: Option<MigrationOutcome>,
    /// Holder after the cycle.
    pub holder: ServerId,
}

/// Owns the failover state and runs the control cycle.
pub struct FailoverController {
    servers: ServerPair,
    failover_ip: IpAddr,
    check_ip: IpAddr,
    check_timeout: Duration,
    check_interval: Duration,
    hysteresis: HysteresisConfig,
    fallback_holder: ServerId,
    probe: HealthProbe,
    comparator: HealthComparator,
    executor: Arc<dyn RemoteExecutor>,
    migrator: Migrator,
    alerter: Alerter,
    store: Option<StateStore>,
    state: FailoverState,
}

impl FailoverController {
    /// Build a controller. The holder is the fallback until [`initialize`](Self::initialize) runs.
    pub fn new(config: &FailoverConfig, deps: Collaborators) -> Self {
        let servers = ServerPair::from_config(config);
        let check_timeout = config.check_timeout();
        let controller = &config.controller;

        let verify_policy = RetryPolicy::new(controller.verify_attempts, controller.verify_backoff_ms);
        let migrator = Migrator::new(deps.executor.clone(), deps.verifier, check_timeout, verify_policy);
        let dedup_window = check_timeout.saturating_mul(config.alerting.warning_dedup_factor);
        let alerter = Alerter::new(
            deps.mailer,
            config.alert_email.clone(),
            servers.clone(),
            config.failover_ip,
            dedup_window,
        );

        Self {
            failover_ip: config.failover_ip,
            check_ip: config.network_health_check.check_ip,
            check_timeout,
            check_interval: Duration::from_secs(controller.check_interval_secs),
            hysteresis: config.hysteresis,
            fallback_holder: controller.fallback_holder,
            probe: HealthProbe::new(deps.measurer),
            comparator: HealthComparator::new(Thresholds::from(&config.network_health_check)),
            executor: deps.executor,
            migrator,
            alerter,
            store: controller.state_file.clone().map(StateStore::new),
            state: FailoverState::new(controller.fallback_holder),
            servers,
        }
    }

    pub fn state(&self) -> &FailoverState {
        &self.state
    }

    pub fn servers(&self) -> &ServerPair {
        &self.servers
    }

    /// Resolve the current holder from the servers, the state file and the
    /// configured fallback, in that order of precedence.
    pub async fn initialize(&mut self) -> ServerId {
        let persisted = match self.store.as_ref().map(StateStore::load) {
            Some(Ok(state)) => state,
            Some(Err(e)) => {
                tracing::warn!(error = %e, "Ignoring unreadable state file");
                None
            }
            None => None,
        };

        let (a, b) = tokio::join!(self.query(ServerId::A), self.query(ServerId::B));
        let observed = match (a, b) {
            (Some(AliasState::Present), Some(AliasState::Present)) => {
                tracing::error!(
                    failover_ip = %self.failover_ip,
                    "Failover IP is active on both servers; release it on one of them"
                );
                None
            }
            (Some(AliasState::Present), _) => Some(ServerId::A),
            (_, Some(AliasState::Present)) => Some(ServerId::B),
            _ => None,
        };

        let (holder, source) = match (observed, persisted.as_ref()) {
            (Some(holder), _) => (holder, "observed"),
            (None, Some(p)) => (p.holder, "state_file"),
            (None, None) => (self.fallback_holder, "fallback"),
        };

        self.state = match persisted {
            Some(p) if p.holder == holder => FailoverState::restore(holder, p.pending, p.last_switch),
            _ => FailoverState::new(holder),
        };

        tracing::info!(%holder, source, "Initial holder resolved");
        metrics::record_holder(holder);
        self.persist();
        holder
    }

    async fn query(&self, id: ServerId) -> Option<AliasState> {
        let node = self.servers.get(id);
        let query = self.executor.query_state(node, self.failover_ip);
        match time::timeout(self.check_timeout, query).await {
            Ok(Ok(state)) => {
                tracing::debug!(server = %id, ?state, "Alias state");
                Some(state)
            }
            Ok(Err(e)) => {
                tracing::warn!(server = %id, error = %e, "Cannot query alias state");
                None
            }
            Err(_) => {
                tracing::warn!(server = %id, timeout = ?self.check_timeout, "Alias state query timed out");
                None
            }
        }
    }

    /// Run one control cycle.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let span = tracing::info_span!("cycle", holder = %self.state.holder());
        self.cycle().instrument(span).await
    }

    async fn cycle(&mut self) -> CycleReport {
        let samples = self
            .probe
            .sample_pair(&self.servers, self.check_ip, self.check_timeout)
            .await;
        let comparison = self.comparator.compare(&samples.a, &samples.b);

        tracing::info!(
            a = %samples.a,
            b = %samples.b,
            better = ?comparison.better,
            time_diff = comparison.time_diff,
            loss_diff = comparison.loss_diff,
            switch = comparison.switch_recommended,
            "Servers compared"
        );

        if comparison.warn {
            let event = AlertEvent::Warning {
                holder: self.state.holder(),
                flags: comparison.warnings,
                samples: samples.clone(),
            };
            self.alerter.notify(event).await;
        }

        let decision = self.state.observe(&comparison, &self.hysteresis);
        let outcome = match decision {
            Decision::Stay => None,
            Decision::Confirming { toward, count, required } => {
                tracing::info!(%toward, count, required, reason = ?comparison.reason, "Switch recommended, awaiting confirmation");
                None
            }
            Decision::Discarded => {
                tracing::warn!("Comparison discarded while a migration is in flight");
                None
            }
            Decision::Migrate { target } => self.migrate(target, &samples).await,
        };

        self.persist();
        metrics::record_cycle(self.state.holder());

        CycleReport {
            samples,
            comparison,
            decision,
            outcome,
            holder: self.state.holder(),
        }
    }

    async fn migrate(&mut self, target: ServerId, samples: &SamplePair) -> Option<MigrationOutcome> {
        let source = self.state.holder();
        if !self.state.begin_migration(target) {
            tracing::warn!(%source, %target, "Migration not started");
            return None;
        }

        let plan = MigrationPlan::new(&self.servers, source, self.failover_ip);
        let outcome = self.migrator.execute(&plan).await;
        self.state.finish_migration(outcome.is_completed(), Utc::now());
        metrics::record_migration(outcome.label());

        let event = match &outcome {
            MigrationOutcome::Completed => AlertEvent::SwitchSucceeded {
                from: source,
                to: target,
                samples: samples.clone(),
            },
            MigrationOutcome::Aborted { error, cleanup } => AlertEvent::SwitchFailed {
                from: source,
                to: target,
                error: error.clone(),
                cleanup: cleanup.clone(),
                samples: samples.clone(),
            },
            MigrationOutcome::PartialFailure { error } => AlertEvent::PartialFailure {
                from: source,
                to: target,
                error: error.clone(),
                samples: samples.clone(),
            },
        };
        self.alerter.notify(event).await;

        Some(outcome)
    }

    fn persist(&self) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&self.state) {
                tracing::warn!(error = %e, "Failed to persist failover state");
            }
        }
    }

    /// Run cycles every `check_interval` until `shutdown` fires.
    ///
    /// A cycle that overruns the interval delays the next tick instead of
    /// stacking a second cycle behind it. Shutdown is only observed between
    /// cycles, so a migration in flight always runs to its outcome.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) {
        let mut ticker = time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(interval = ?self.check_interval, holder = %self.state.holder(), "Control loop started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
            }
        }
        tracing::info!(holder = %self.state.holder(), "Control loop stopped");
    }
}
