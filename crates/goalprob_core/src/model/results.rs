//! Simulation outputs
//!
//! A [`ProbabilityResult`] is built once by the aggregator and never mutated.
//! It is shared between the cache and callers behind an `Arc`.

use std::sync::Arc;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::cache::Fingerprint;

/// Terminal-balance percentiles across valid trials
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TerminalPercentiles {
    pub p10: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p90: f64,
}

impl TerminalPercentiles {
    fn values(&self) -> [f64; 5] {
        [self.p10, self.p25, self.p50, self.p75, self.p90]
    }
}

/// When successful trials first reached the target
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeToGoal {
    /// `None` when no trial succeeded
    pub median_months: Option<f64>,
    pub median_years: Option<f64>,
    pub p10_months: Option<f64>,
    pub p90_months: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// Annual volatility of the allocation
    pub volatility: f64,
    /// Annual expected return of the allocation
    pub expected_return: f64,
    /// Mean fractional terminal shortfall over valid trials
    pub shortfall_risk: f64,
    /// Mean absolute terminal shortfall among unsuccessful trials
    pub expected_shortfall: f64,
}

/// How the run went, independent of what it found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    pub seed: u64,
    pub iterations_requested: usize,
    pub iterations_completed: usize,
    pub valid_trials: usize,
    pub discarded_trials: usize,
    /// The time budget expired before every trial ran
    pub truncated: bool,
    /// Too few valid trials to trust the estimate
    pub low_confidence: bool,
}

/// Probability distribution of a goal's outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityResult {
    pub success_probability: f64,
    pub partial_success_probability: f64,
    /// Target the trials were measured against. In today's money, except
    /// for categories whose formula already projects to the target date
    /// (education, debt repayment, home improvement, legacy planning),
    /// where it is the nominal amount due and no further inflation applies.
    pub target_amount: f64,
    pub horizon_months: u32,
    pub terminal: TerminalPercentiles,
    pub terminal_mean: f64,
    pub terminal_std_dev: f64,
    pub time_to_goal: TimeToGoal,
    pub risk: RiskMetrics,
    pub diagnostics: RunDiagnostics,
}

impl ProbabilityResult {
    /// Describe the first broken invariant, if any.
    ///
    /// Used by the cache to detect corrupted entries.
    #[must_use]
    pub fn invariant_violation(&self) -> Option<String> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.success_probability) {
            return Some(format!(
                "success probability {} outside [0, 1]",
                self.success_probability
            ));
        }
        if !unit.contains(&self.partial_success_probability) {
            return Some(format!(
                "partial success probability {} outside [0, 1]",
                self.partial_success_probability
            ));
        }
        if self.partial_success_probability < self.success_probability {
            return Some(format!(
                "partial success probability {} below success probability {}",
                self.partial_success_probability, self.success_probability
            ));
        }

        let scalars = [
            self.target_amount,
            self.terminal_mean,
            self.terminal_std_dev,
            self.risk.volatility,
            self.risk.expected_return,
            self.risk.shortfall_risk,
            self.risk.expected_shortfall,
        ];
        if scalars
            .iter()
            .chain(self.terminal.values().iter())
            .any(|v| !v.is_finite())
        {
            return Some("non-finite value in result".to_string());
        }

        None
    }
}

/// A result together with its cache metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityReport {
    pub result: Arc<ProbabilityResult>,
    pub fingerprint: Fingerprint,
    pub computed_at: Timestamp,
    pub from_cache: bool,
}

impl ProbabilityReport {
    #[must_use]
    pub fn success_probability(&self) -> f64 {
        self.result.success_probability
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_result_is_consistent() {
        assert_eq!(ProbabilityResult::default().invariant_violation(), None);
    }

    #[test]
    fn test_invariant_violations() {
        let result = ProbabilityResult {
            success_probability: 1.5,
            partial_success_probability: 1.5,
            ..Default::default()
        };
        assert!(result.invariant_violation().is_some());

        let result = ProbabilityResult {
            success_probability: 0.6,
            partial_success_probability: 0.4,
            ..Default::default()
        };
        assert!(
            result
                .invariant_violation()
                .is_some_and(|msg| msg.contains("below"))
        );

        let result = ProbabilityResult {
            terminal_mean: f64::NAN,
            ..Default::default()
        };
        assert!(result.invariant_violation().is_some());
    }
}
