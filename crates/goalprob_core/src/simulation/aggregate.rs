//! Reduction of trial records into a [`ProbabilityResult`]

use super::trial::TrialRecord;
use crate::model::{
    ProbabilityResult, RiskMetrics, RunDiagnostics, TerminalPercentiles, TimeToGoal,
};

/// Discard share above which a result is flagged low confidence
pub const LOW_CONFIDENCE_DISCARD_RATIO: f64 = 0.10;

/// Trial records from one or more chunks, in trial order
#[derive(Debug, Clone, Default)]
pub struct TrialBatch {
    records: Vec<TrialRecord>,
    discarded: usize,
}

impl TrialBatch {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
            discarded: 0,
        }
    }

    pub fn record(&mut self, outcome: Option<TrialRecord>) {
        match outcome {
            Some(record) => self.records.push(record),
            None => self.discarded += 1,
        }
    }

    /// Append a later chunk
    pub fn merge(&mut self, other: TrialBatch) {
        self.records.extend(other.records);
        self.discarded += other.discarded;
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.records.len() + self.discarded
    }

    #[must_use]
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}

/// Run facts that are not derived from the trials
#[derive(Debug, Clone, Copy)]
pub struct RunContext {
    pub target: f64,
    pub horizon_months: u32,
    pub volatility: f64,
    pub expected_return: f64,
    pub seed: u64,
    pub iterations_requested: usize,
    pub truncated: bool,
}

/// Value at quantile `p` (0..=1) of sorted data, interpolating linearly
/// between order statistics
#[must_use]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64).clamp(0.0, 1.0)
    }
}

pub fn summarize(batch: TrialBatch, ctx: &RunContext) -> ProbabilityResult {
    let completed = batch.completed();
    let valid = batch.records.len();
    let low_confidence =
        valid == 0 || batch.discarded as f64 > LOW_CONFIDENCE_DISCARD_RATIO * completed as f64;

    let diagnostics = RunDiagnostics {
        seed: ctx.seed,
        iterations_requested: ctx.iterations_requested,
        iterations_completed: completed,
        valid_trials: valid,
        discarded_trials: batch.discarded,
        truncated: ctx.truncated,
        low_confidence,
    };

    let risk = RiskMetrics {
        volatility: ctx.volatility,
        expected_return: ctx.expected_return,
        ..Default::default()
    };

    if valid == 0 {
        return ProbabilityResult {
            target_amount: ctx.target,
            horizon_months: ctx.horizon_months,
            risk,
            diagnostics,
            ..Default::default()
        };
    }

    let successes = batch.records.iter().filter(|r| r.success).count();
    let partials = batch.records.iter().filter(|r| r.partial).count();

    let mut terminals: Vec<f64> = batch.records.iter().map(|r| r.terminal_balance).collect();
    terminals.sort_by(f64::total_cmp);
    let mean = terminals.iter().sum::<f64>() / valid as f64;
    let variance = terminals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / valid as f64;

    let mut goal_months: Vec<f64> = batch
        .records
        .iter()
        .filter_map(|r| r.months_to_goal.map(f64::from))
        .collect();
    goal_months.sort_by(f64::total_cmp);
    let time_to_goal = if goal_months.is_empty() {
        TimeToGoal::default()
    } else {
        let median = percentile(&goal_months, 0.5);
        TimeToGoal {
            median_months: Some(median),
            median_years: Some(median / 12.0),
            p10_months: Some(percentile(&goal_months, 0.1)),
            p90_months: Some(percentile(&goal_months, 0.9)),
        }
    };

    let failures: Vec<&TrialRecord> = batch.records.iter().filter(|r| !r.success).collect();
    let fractional_shortfall: f64 = failures
        .iter()
        .filter(|r| r.terminal_target > 0.0)
        .map(|r| r.shortfall() / r.terminal_target)
        .sum();
    let expected_shortfall = if failures.is_empty() {
        0.0
    } else {
        failures.iter().map(|r| r.shortfall()).sum::<f64>() / failures.len() as f64
    };

    let success_probability = ratio(successes, valid);
    ProbabilityResult {
        success_probability,
        partial_success_probability: ratio(partials, valid).max(success_probability),
        target_amount: ctx.target,
        horizon_months: ctx.horizon_months,
        terminal: TerminalPercentiles {
            p10: percentile(&terminals, 0.10),
            p25: percentile(&terminals, 0.25),
            p50: percentile(&terminals, 0.50),
            p75: percentile(&terminals, 0.75),
            p90: percentile(&terminals, 0.90),
        },
        terminal_mean: mean,
        terminal_std_dev: variance.sqrt(),
        time_to_goal,
        risk: RiskMetrics {
            shortfall_risk: (fractional_shortfall / valid as f64).clamp(0.0, 1.0),
            expected_shortfall,
            ..risk
        },
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RunContext {
        RunContext {
            target: 100.0,
            horizon_months: 12,
            volatility: 0.1,
            expected_return: 0.05,
            seed: 9,
            iterations_requested: 4,
            truncated: false,
        }
    }

    fn record(terminal: f64, months_to_goal: Option<u32>) -> TrialRecord {
        TrialRecord {
            terminal_balance: terminal,
            terminal_target: 100.0,
            success: months_to_goal.is_some(),
            partial: terminal >= 80.0 || months_to_goal.is_some(),
            months_to_goal,
        }
    }

    #[test]
    fn test_percentile_interpolates() {
        let data = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(percentile(&data, 0.0), 10.0);
        assert_eq!(percentile(&data, 0.5), 30.0);
        assert_eq!(percentile(&data, 1.0), 50.0);
        assert!((percentile(&data, 0.1) - 14.0).abs() < 1e-12);
        assert_eq!(percentile(&[], 0.5), 0.0);
        assert_eq!(percentile(&[7.0], 0.9), 7.0);
    }

    #[test]
    fn test_summarize_counts_and_shortfall() {
        let mut batch = TrialBatch::default();
        batch.record(Some(record(120.0, Some(10))));
        batch.record(Some(record(110.0, Some(12))));
        batch.record(Some(record(90.0, None)));
        batch.record(Some(record(50.0, None)));

        let result = summarize(batch, &ctx());
        assert_eq!(result.success_probability, 0.5);
        assert_eq!(result.partial_success_probability, 0.75);
        assert_eq!(result.time_to_goal.median_months, Some(11.0));
        assert_eq!(result.risk.expected_shortfall, 30.0);
        assert!((result.risk.shortfall_risk - 0.6 / 4.0).abs() < 1e-12);
        assert_eq!(result.terminal_mean, 92.5);
        assert!(!result.diagnostics.low_confidence);
        assert_eq!(result.invariant_violation(), None);
    }

    #[test]
    fn test_merge_preserves_order_and_counts() {
        let mut first = TrialBatch::default();
        first.record(Some(record(120.0, Some(3))));
        first.record(None);
        let mut second = TrialBatch::default();
        second.record(Some(record(50.0, None)));

        first.merge(second);
        assert_eq!(first.completed(), 3);
        assert_eq!(first.discarded(), 1);

        let result = summarize(first, &ctx());
        assert_eq!(result.diagnostics.valid_trials, 2);
        // One of three discarded is above the threshold
        assert!(result.diagnostics.low_confidence);
    }

    #[test]
    fn test_no_valid_trials() {
        let mut batch = TrialBatch::default();
        batch.record(None);
        batch.record(None);
        let result = summarize(batch, &ctx());
        assert_eq!(result.success_probability, 0.0);
        assert_eq!(result.partial_success_probability, 0.0);
        assert!(result.diagnostics.low_confidence);
        assert_eq!(result.diagnostics.discarded_trials, 2);
        assert_eq!(result.invariant_violation(), None);
    }
}
