//! Comparison of the two servers' samples.
//!
//! # Decision Order
//! ```text
//! exactly one sample invalid → switch toward the reachable server
//! both invalid               → indeterminate
//! |loss diff| > switch_loss  → switch toward the lower loss
//! |time diff| > switch_time  → switch toward the lower time
//! otherwise                  → stay
//! ```
//!
//! Diffs are signed from A's point of view (`B − A`): a positive value means
//! A is the better server. Relabeling the servers negates both diffs and
//! mirrors the decision.

use serde::{Deserialize, Serialize};

use crate::config::NetworkHealthCheckConfig;
use crate::health::sample::HealthSample;
use crate::node::ServerId;

/// Thresholds used to warn and to recommend a switch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warn_time: f64,
    pub warn_loss: f64,
    pub switch_time_diff: f64,
    pub switch_loss_diff: f64,
}

impl From<&NetworkHealthCheckConfig> for Thresholds {
    fn from(config: &NetworkHealthCheckConfig) -> Self {
        Self {
            warn_time: config.warn_at_time,
            warn_loss: config.warn_at_loss,
            switch_time_diff: config.switch_with_timediff,
            switch_loss_diff: config.switch_with_lossdiff,
        }
    }
}

/// Why a switch was recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwitchReason {
    /// The other server produced no sample.
    Unreachable,
    /// Loss difference crossed `switch_loss_diff`.
    Loss,
    /// Time difference crossed `switch_time_diff`.
    Latency,
}

/// Which warn conditions fired. Two warnings are identical when their flags are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WarningFlags {
    pub a_unreachable: bool,
    pub b_unreachable: bool,
    pub a_slow: bool,
    pub b_slow: bool,
    pub a_lossy: bool,
    pub b_lossy: bool,
}

impl WarningFlags {
    fn evaluate(sample: &HealthSample, thresholds: &Thresholds) -> (bool, bool, bool) {
        if !sample.valid {
            return (true, false, false);
        }
        (
            false,
            sample.avg_time_ms >= thresholds.warn_time,
            sample.loss_pct >= thresholds.warn_loss,
        )
    }

    pub fn any(&self) -> bool {
        self.a_unreachable
            || self.b_unreachable
            || self.a_slow
            || self.b_slow
            || self.a_lossy
            || self.b_lossy
    }

    /// Human readable list of the conditions that fired.
    pub fn describe(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (id, unreachable, slow, lossy) in [
            (ServerId::A, self.a_unreachable, self.a_slow, self.a_lossy),
            (ServerId::B, self.b_unreachable, self.b_slow, self.b_lossy),
        ] {
            if unreachable {
                out.push(format!("{} unreachable", id));
            }
            if slow {
                out.push(format!("{} round-trip time above warn threshold", id));
            }
            if lossy {
                out.push(format!("{} packet loss above warn threshold", id));
            }
        }
        out
    }
}

/// Outcome of comparing one pair of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    /// The better server, or `None` when indeterminate.
    pub better: Option<ServerId>,
    /// `B.avg − A.avg` in milliseconds.
    pub time_diff: f64,
    /// `B.loss − A.loss` in percentage points.
    pub loss_diff: f64,
    pub warn: bool,
    pub switch_recommended: bool,
    pub reason: Option<SwitchReason>,
    pub warnings: WarningFlags,
}

impl ComparisonResult {
    /// Target of the recommendation, if any.
    pub fn recommended_target(&self) -> Option<ServerId> {
        if self.switch_recommended {
            self.better
        } else {
            None
        }
    }
}

/// Stateless comparator bound to a set of thresholds.
#[derive(Debug, Clone, Copy)]
pub struct HealthComparator {
    thresholds: Thresholds,
}

impl HealthComparator {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Compare the samples of server A and server B.
    pub fn compare(&self, a: &HealthSample, b: &HealthSample) -> ComparisonResult {
        compare(a, b, &self.thresholds)
    }
}

/// Compare the samples of server A and server B against `thresholds`.
pub fn compare(a: &HealthSample, b: &HealthSample, thresholds: &Thresholds) -> ComparisonResult {
    let (a_unreachable, a_slow, a_lossy) = WarningFlags::evaluate(a, thresholds);
    let (b_unreachable, b_slow, b_lossy) = WarningFlags::evaluate(b, thresholds);
    let warnings = WarningFlags {
        a_unreachable,
        b_unreachable,
        a_slow,
        b_slow,
        a_lossy,
        b_lossy,
    };

    let time_diff = b.avg_time_ms - a.avg_time_ms;
    let loss_diff = b.loss_pct - a.loss_pct;

    let recommendation = match (a.valid, b.valid) {
        (true, false) => Some((ServerId::A, SwitchReason::Unreachable)),
        (false, true) => Some((ServerId::B, SwitchReason::Unreachable)),
        (false, false) => None,
        (true, true) => {
            if loss_diff.abs() > thresholds.switch_loss_diff {
                Some((toward(loss_diff), SwitchReason::Loss))
            } else if time_diff.abs() > thresholds.switch_time_diff {
                Some((toward(time_diff), SwitchReason::Latency))
            } else {
                None
            }
        }
    };

    ComparisonResult {
        better: recommendation.map(|(server, _)| server),
        time_diff,
        loss_diff,
        warn: warnings.any(),
        switch_recommended: recommendation.is_some(),
        reason: recommendation.map(|(_, reason)| reason),
        warnings,
    }
}

/// A positive `B − A` difference favours A.
fn toward(diff: f64) -> ServerId {
    if diff > 0.0 {
        ServerId::A
    } else {
        ServerId::B
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn target() -> IpAddr {
        "192.168.177.11".parse().unwrap()
    }

    fn thresholds() -> Thresholds {
        Thresholds {
            warn_time: 8.0,
            warn_loss: 10.0,
            switch_time_diff: 20.0,
            switch_loss_diff: 15.0,
        }
    }

    fn sample(server: ServerId, time: f64, loss: f64) -> HealthSample {
        HealthSample::valid(server, target(), time, loss)
    }

    fn relabel(sample: &HealthSample) -> HealthSample {
        HealthSample {
            server: sample.server.other(),
            ..sample.clone()
        }
    }

    #[test]
    fn latency_rule_applies_when_loss_is_equal() {
        let a = sample(ServerId::A, 10.0, 0.0);
        let b = sample(ServerId::B, 35.0, 0.0);
        let result = compare(&a, &b, &thresholds());

        assert!(result.switch_recommended);
        assert_eq!(result.better, Some(ServerId::A));
        assert_eq!(result.reason, Some(SwitchReason::Latency));
        assert_eq!(result.time_diff, 25.0);
        assert_eq!(result.loss_diff, 0.0);
    }

    #[test]
    fn loss_rule_dominates_latency() {
        let a = sample(ServerId::A, 10.0, 5.0);
        let b = sample(ServerId::B, 12.0, 25.0);
        let result = compare(&a, &b, &thresholds());

        assert_eq!(result.recommended_target(), Some(ServerId::A));
        assert_eq!(result.reason, Some(SwitchReason::Loss));
    }

    #[test]
    fn loss_rule_wins_when_directions_disagree() {
        // A is much faster but B loses far fewer packets.
        let a = sample(ServerId::A, 5.0, 30.0);
        let b = sample(ServerId::B, 60.0, 0.0);
        let result = compare(&a, &b, &thresholds());

        assert_eq!(result.recommended_target(), Some(ServerId::B));
        assert_eq!(result.reason, Some(SwitchReason::Loss));
    }

    #[test]
    fn differences_at_threshold_do_not_switch() {
        let a = sample(ServerId::A, 10.0, 0.0);
        let b = sample(ServerId::B, 30.0, 15.0);
        let result = compare(&a, &b, &thresholds());

        assert!(!result.switch_recommended);
        assert_eq!(result.better, None);
        assert_eq!(result.reason, None);
    }

    #[test]
    fn small_differences_stay() {
        let a = sample(ServerId::A, 3.0, 0.0);
        let b = sample(ServerId::B, 4.0, 1.0);
        let result = compare(&a, &b, &thresholds());

        assert!(!result.switch_recommended);
        assert!(!result.warn);
    }

    #[test]
    fn warn_thresholds_are_inclusive() {
        let a = sample(ServerId::A, 8.0, 0.0);
        let b = sample(ServerId::B, 1.0, 10.0);
        let result = compare(&a, &b, &thresholds());

        assert!(result.warn);
        assert!(result.warnings.a_slow);
        assert!(result.warnings.b_lossy);
        assert!(!result.warnings.a_lossy);
        assert!(!result.switch_recommended);
    }

    #[test]
    fn invalid_sample_recommends_the_other_server() {
        let a = HealthSample::invalid(ServerId::A, target(), "timeout");
        let b = sample(ServerId::B, 50.0, 40.0);
        let result = compare(&a, &b, &thresholds());

        assert_eq!(result.recommended_target(), Some(ServerId::B));
        assert_eq!(result.reason, Some(SwitchReason::Unreachable));
        assert!(result.warn);
        assert!(result.warnings.a_unreachable);
    }

    #[test]
    fn both_invalid_is_indeterminate() {
        let a = HealthSample::invalid(ServerId::A, target(), "timeout");
        let b = HealthSample::invalid(ServerId::B, target(), "auth");
        let result = compare(&a, &b, &thresholds());

        assert!(!result.switch_recommended);
        assert_eq!(result.better, None);
        assert!(result.warn);
    }

    #[test]
    fn compare_is_symmetric_under_relabeling() {
        let cases = [
            (sample(ServerId::A, 10.0, 0.0), sample(ServerId::B, 35.0, 0.0)),
            (sample(ServerId::A, 10.0, 5.0), sample(ServerId::B, 12.0, 25.0)),
            (sample(ServerId::A, 40.0, 2.0), sample(ServerId::B, 12.0, 1.0)),
            (sample(ServerId::A, 5.0, 30.0), sample(ServerId::B, 60.0, 0.0)),
            (sample(ServerId::A, 9.0, 9.0), sample(ServerId::B, 9.0, 9.0)),
            (
                HealthSample::invalid(ServerId::A, target(), "timeout"),
                sample(ServerId::B, 1.0, 0.0),
            ),
        ];

        for (a, b) in cases {
            let forward = compare(&a, &b, &thresholds());
            // The old B becomes A and vice versa.
            let mirrored = compare(&relabel(&b), &relabel(&a), &thresholds());

            assert_eq!(mirrored.better, forward.better.map(ServerId::other));
            assert_eq!(mirrored.switch_recommended, forward.switch_recommended);
            assert_eq!(mirrored.reason, forward.reason);
            assert_eq!(mirrored.warn, forward.warn);
            assert_eq!(mirrored.time_diff, -forward.time_diff);
            assert_eq!(mirrored.loss_diff, -forward.loss_diff);
        }
    }
}
