//! Failover state machine.
//!
//! # States
//! - Holding(A) / Holding(B): the named server should carry the failover IP
//! - Migrating(source → target): a migration is in flight
//!
//! # State Transitions
//! ```text
//! Holding(s) → Migrating(s→t): confirmations consecutive recommendations toward t,
//!                              or unreachable_confirmations consecutive cycles
//!                              with s unreachable
//! Migrating(s→t) → Holding(t): migration completed
//! Migrating(s→t) → Holding(s): migration failed or partially failed
//! ```
//!
//! # Design Decisions
//! - Any stay, or a recommendation toward the holder, resets the streak
//! - The streak is reset after every attempted migration
//! - Results observed while migrating are discarded

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::HysteresisConfig;
use crate::health::{ComparisonResult, SwitchReason};
use crate::node::ServerId;

/// Where the controller currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Holding(ServerId),
    Migrating { source: ServerId, target: ServerId },
}

/// Consecutive recommendations to move away from the holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingSwitch {
    pub toward: ServerId,
    /// Recommendations toward `toward`, any reason.
    pub count: u32,
    /// Trailing recommendations caused by the holder being unreachable.
    pub unreachable_count: u32,
}

/// What the controller should do after observing a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to do.
    Stay,
    /// A switch is recommended but not yet confirmed.
    Confirming { toward: ServerId, count: u32, required: u32 },
    /// Confirmed; migrate to `target`.
    Migrate { target: ServerId },
    /// A migration is in flight; the result was discarded.
    Discarded,
}

/// The single mutable state of a running watcher.
#[derive(Debug, Clone, PartialEq)]
pub struct FailoverState {
    phase: Phase,
    pending: Option<PendingSwitch>,
    last_switch: Option<DateTime<Utc>>,
}

impl FailoverState {
    pub fn new(holder: ServerId) -> Self {
        Self {
            phase: Phase::Holding(holder),
            pending: None,
            last_switch: None,
        }
    }

    /// Rebuild state from a persisted record.
    pub fn restore(holder: ServerId, pending: Option<PendingSwitch>, last_switch: Option<DateTime<Utc>>) -> Self {
        Self {
            phase: Phase::Holding(holder),
            pending: pending.filter(|p| p.toward != holder),
            last_switch,
        }
    }

    /// The server that should carry the failover IP. During a migration this is still the source.
    pub fn holder(&self) -> ServerId {
        match self.phase {
            Phase::Holding(holder) => holder,
            Phase::Migrating { source, .. } => source,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn pending(&self) -> Option<PendingSwitch> {
        self.pending
    }

    pub fn last_switch(&self) -> Option<DateTime<Utc>> {
        self.last_switch
    }

    /// Feed one cycle's comparison into the hysteresis counter.
    pub fn observe(&mut self, result: &ComparisonResult, policy: &HysteresisConfig) -> Decision {
        let holder = match self.phase {
            Phase::Holding(holder) => holder,
            Phase::Migrating { .. } => return Decision::Discarded,
        };

        let toward = match result.recommended_target() {
            Some(target) if target != holder => target,
            _ => {
                self.pending = None;
                return Decision::Stay;
            }
        };

        let unreachable = result.reason == Some(SwitchReason::Unreachable);
        let pending = match self.pending {
            Some(p) if p.toward == toward => PendingSwitch {
                toward,
                count: p.count + 1,
                unreachable_count: if unreachable { p.unreachable_count + 1 } else { 0 },
            },
            _ => PendingSwitch {
                toward,
                count: 1,
                unreachable_count: u32::from(unreachable),
            },
        };
        self.pending = Some(pending);

        if pending.count >= policy.confirmations
            || pending.unreachable_count >= policy.unreachable_confirmations
        {
            return Decision::Migrate { target: toward };
        }

        let required = if unreachable {
            policy.unreachable_confirmations
        } else {
            policy.confirmations
        };
        Decision::Confirming {
            toward,
            count: pending.count,
            required,
        }
    }

    /// Enter `Migrating`. Returns false if already migrating or already holding `target`.
    pub fn begin_migration(&mut self, target: ServerId) -> bool {
        match self.phase {
            Phase::Holding(source) if source != target => {
                self.phase = Phase::Migrating { source, target };
                true
            }
            _ => false,
        }
    }

    /// Leave `Migrating`, flipping the holder only when the migration completed.
    pub fn finish_migration(&mut self, completed: bool, at: DateTime<Utc>) {
        if let Phase::Migrating { source, target } = self.phase {
            if completed {
                self.phase = Phase::Holding(target);
                self.last_switch = Some(at);
            } else {
                self.phase = Phase::Holding(source);
            }
        }
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::WarningFlags;

    fn policy() -> HysteresisConfig {
        HysteresisConfig {
            confirmations: 3,
            unreachable_confirmations: 2,
        }
    }

    fn recommend(target: ServerId, reason: SwitchReason) -> ComparisonResult {
        ComparisonResult {
            better: Some(target),
            time_diff: 0.0,
            loss_diff: 0.0,
            warn: reason == SwitchReason::Unreachable,
            switch_recommended: true,
            reason: Some(reason),
            warnings: WarningFlags::default(),
        }
    }

    fn stay() -> ComparisonResult {
        ComparisonResult {
            better: None,
            time_diff: 0.0,
            loss_diff: 0.0,
            warn: false,
            switch_recommended: false,
            reason: None,
            warnings: WarningFlags::default(),
        }
    }

    #[test]
    fn three_consecutive_recommendations_confirm() {
        let mut state = FailoverState::new(ServerId::A);
        let to_b = recommend(ServerId::B, SwitchReason::Latency);

        assert!(matches!(state.observe(&to_b, &policy()), Decision::Confirming { count: 1, .. }));
        assert!(matches!(state.observe(&to_b, &policy()), Decision::Confirming { count: 2, .. }));
        assert_eq!(state.observe(&to_b, &policy()), Decision::Migrate { target: ServerId::B });
    }

    #[test]
    fn stay_resets_the_streak() {
        let mut state = FailoverState::new(ServerId::A);
        let to_b = recommend(ServerId::B, SwitchReason::Loss);

        state.observe(&to_b, &policy());
        state.observe(&to_b, &policy());
        assert_eq!(state.observe(&stay(), &policy()), Decision::Stay);
        assert_eq!(state.pending(), None);

        // Starts over from one.
        assert!(matches!(state.observe(&to_b, &policy()), Decision::Confirming { count: 1, .. }));
    }

    #[test]
    fn recommendation_toward_holder_resets_the_streak() {
        let mut state = FailoverState::new(ServerId::A);
        state.observe(&recommend(ServerId::B, SwitchReason::Latency), &policy());
        state.observe(&recommend(ServerId::B, SwitchReason::Latency), &policy());

        assert_eq!(
            state.observe(&recommend(ServerId::A, SwitchReason::Latency), &policy()),
            Decision::Stay
        );
        assert_eq!(state.pending(), None);
    }

    #[test]
    fn unreachable_holder_confirms_after_two() {
        let mut state = FailoverState::new(ServerId::A);
        let holder_down = recommend(ServerId::B, SwitchReason::Unreachable);

        assert_eq!(
            state.observe(&holder_down, &policy()),
            Decision::Confirming { toward: ServerId::B, count: 1, required: 2 }
        );
        assert_eq!(state.observe(&holder_down, &policy()), Decision::Migrate { target: ServerId::B });
    }

    #[test]
    fn single_unreachable_after_latency_streak_counts_toward_full_confirmation() {
        let mut state = FailoverState::new(ServerId::A);
        state.observe(&recommend(ServerId::B, SwitchReason::Latency), &policy());
        state.observe(&recommend(ServerId::B, SwitchReason::Latency), &policy());

        assert_eq!(
            state.observe(&recommend(ServerId::B, SwitchReason::Unreachable), &policy()),
            Decision::Migrate { target: ServerId::B }
        );
    }

    #[test]
    fn results_are_discarded_while_migrating() {
        let mut state = FailoverState::new(ServerId::A);
        assert!(state.begin_migration(ServerId::B));
        assert!(!state.begin_migration(ServerId::B));

        assert_eq!(
            state.observe(&recommend(ServerId::B, SwitchReason::Loss), &policy()),
            Decision::Discarded
        );
        assert_eq!(state.holder(), ServerId::A);
    }

    #[test]
    fn failed_migration_keeps_holder_and_resets() {
        let mut state = FailoverState::new(ServerId::A);
        state.observe(&recommend(ServerId::B, SwitchReason::Loss), &policy());
        state.begin_migration(ServerId::B);
        state.finish_migration(false, Utc::now());

        assert_eq!(state.phase(), Phase::Holding(ServerId::A));
        assert_eq!(state.pending(), None);
        assert_eq!(state.last_switch(), None);
    }

    #[test]
    fn completed_migration_flips_holder() {
        let mut state = FailoverState::new(ServerId::A);
        let now = Utc::now();
        state.begin_migration(ServerId::B);
        state.finish_migration(true, now);

        assert_eq!(state.holder(), ServerId::B);
        assert_eq!(state.last_switch(), Some(now));
    }

    #[test]
    fn begin_migration_to_holder_is_refused() {
        let mut state = FailoverState::new(ServerId::B);
        assert!(!state.begin_migration(ServerId::B));
        assert_eq!(state.phase(), Phase::Holding(ServerId::B));
    }
}
