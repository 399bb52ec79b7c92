//! Timeouts, invalid draws and bad parameters
//!
//! These tests verify:
//! - An expiring time budget returns a truncated result or a timeout error
//! - Trials with invalid draws are discarded, never surfaced as errors
//! - Unusable parameters fall back to the default table

use std::time::Duration;

use jiff::civil::date;

use super::fixtures::{config, emergency_fund, engine, engine_with_provider, profile, savings_goal};
use crate::error::{GoalError, InvalidGoalReason, SimulationError};
use crate::model::{Allocation, AssetClass, Goal, GoalId, GoalKind};
use crate::params::StaticParameters;
use crate::progress::SimulationProgress;

fn equity_goal() -> Goal {
    Goal {
        allocation: Some(Allocation::new().with(AssetClass::Equity, 1.0)),
        ..savings_goal(1, 10_000_000.0, 0.0, 10_000.0, date(2027, 1, 1))
    }
}

#[test]
fn test_expiring_budget_truncates() {
    let goal = savings_goal(1, 50_000_000.0, 0.0, 10_000.0, date(2075, 1, 1));
    let mut config = config(40_000).with_time_budget(Duration::from_millis(20));
    config.chunk_size = 2_000;

    let report = engine()
        .evaluate(&goal, &profile(), &config, true, &SimulationProgress::new())
        .unwrap();
    let diagnostics = report.result.diagnostics;
    assert!(diagnostics.truncated);
    assert!(diagnostics.iterations_completed > 0);
    assert!(diagnostics.iterations_completed < 40_000);
    assert_eq!(diagnostics.iterations_completed % 2_000, 0);
}

#[test]
fn test_zero_budget_is_timeout_error() {
    let config = config(100).with_time_budget(Duration::ZERO);
    let err = engine()
        .evaluate(
            &emergency_fund(1),
            &profile(),
            &config,
            true,
            &SimulationProgress::new(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        GoalError::Simulation {
            source: SimulationError::Timeout(_),
            ..
        }
    ));
}

#[test]
fn test_cancelled_simulation() {
    let progress = SimulationProgress::new();
    progress.cancel();
    let err = engine()
        .evaluate(&emergency_fund(1), &profile(), &config(100), true, &progress)
        .unwrap_err();
    assert_eq!(err, GoalError::Cancelled(emergency_fund(1).id));
}

#[test]
fn test_all_trials_invalid_gives_low_confidence() {
    // Monthly volatility near 1400% makes a wipe-out draw almost certain
    let engine = engine_with_provider(StaticParameters::new().with("volatility.equity", 50.0));
    let report = engine
        .calculate_goal_probability(&equity_goal(), &profile(), Some(200), false)
        .unwrap();
    let result = &report.result;
    assert_eq!(result.success_probability, 0.0);
    assert_eq!(result.partial_success_probability, 0.0);
    assert_eq!(result.diagnostics.valid_trials, 0);
    assert_eq!(result.diagnostics.discarded_trials, 200);
    assert!(result.diagnostics.low_confidence);
    assert_eq!(result.invariant_violation(), None);
}

#[test]
fn test_unusable_parameters_fall_back_to_defaults() {
    let broken = engine_with_provider(
        StaticParameters::new()
            .with("inflation", f64::NAN)
            .with("volatility.equity", -1.0)
            .with("return.equity", f64::INFINITY),
    );
    let defaults = engine();

    let goal = equity_goal();
    let a = broken
        .calculate_goal_probability(&goal, &profile(), None, false)
        .unwrap();
    let b = defaults
        .calculate_goal_probability(&goal, &profile(), None, false)
        .unwrap();
    assert_eq!(a.result, b.result);
    assert!(!a.result.diagnostics.low_confidence);
}

#[test]
fn test_overflowing_category_target_is_invalid_goal() {
    let engine = engine();
    let goal = Goal::new(
        GoalId(9),
        GoalKind::Education {
            years: Some(1e300),
            yearly_cost: Some(1e300),
        },
        date(2030, 1, 1),
    );
    let err = engine
        .calculate_goal_probability(&goal, &profile(), Some(50), false)
        .unwrap_err();
    assert!(matches!(
        err,
        GoalError::InvalidGoal(ref e) if matches!(e.reason, InvalidGoalReason::OutOfRange { .. })
    ));
    assert_eq!(engine.get_cache_stats().size, 0);
}
