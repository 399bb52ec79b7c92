//! Every goal category through the calculator and the simulation
//!
//! These tests verify:
//! - Each category sizes its target from its own inputs
//! - Optional preferences default from parameters
//! - Every category produces a consistent probability result

use jiff::civil::date;

use super::fixtures::{as_of, config, engine, profile};
use crate::error::{GoalError, InvalidGoalReason};
use crate::model::{AssetClass, Goal, GoalCategory, GoalId, GoalKind};

fn goal_for(category: GoalCategory, id: u32) -> Goal {
    let kind = match category {
        GoalCategory::EmergencyFund => GoalKind::EmergencyFund { months: None },
        GoalCategory::Retirement => GoalKind::Retirement {
            annual_expenses: Some(900_000.0),
            withdrawal_rate: None,
        },
        GoalCategory::EarlyRetirement => GoalKind::EarlyRetirement {
            annual_expenses: None,
            withdrawal_rate: Some(0.03),
        },
        GoalCategory::Education => GoalKind::Education {
            years: Some(4.0),
            yearly_cost: Some(400_000.0),
        },
        GoalCategory::HomePurchase => GoalKind::HomePurchase {
            property_value: Some(8_000_000.0),
            down_payment_percent: None,
        },
        GoalCategory::DebtRepayment => GoalKind::DebtRepayment {
            outstanding_balance: Some(500_000.0),
            interest_rate: Some(0.12),
        },
        GoalCategory::Vehicle => GoalKind::Vehicle {
            price: Some(1_500_000.0),
            down_payment_percent: Some(0.3),
        },
        GoalCategory::HomeImprovement => GoalKind::HomeImprovement {
            estimated_cost: Some(600_000.0),
        },
        GoalCategory::Insurance => GoalKind::Insurance {
            annual_premium: Some(40_000.0),
            years: Some(5.0),
        },
        GoalCategory::LegacyPlanning => GoalKind::LegacyPlanning {
            bequest_amount: Some(10_000_000.0),
        },
        GoalCategory::CharitableGiving => GoalKind::CharitableGiving {
            annual_donation: Some(50_000.0),
            years: None,
        },
        GoalCategory::Discretionary => GoalKind::Discretionary {},
        GoalCategory::Custom => GoalKind::Custom {},
    };
    let mut goal = Goal::new(GoalId(id), kind, date(2035, 1, 1));
    if matches!(
        category,
        GoalCategory::Discretionary | GoalCategory::Custom
    ) {
        goal.target_amount = 750_000.0;
    }
    goal.current_amount = 100_000.0;
    goal.monthly_contribution = 15_000.0;
    goal
}

#[test]
fn test_amount_needed_per_category() {
    let engine = engine();
    let profile = profile();
    let inflation_10y = 1.06f64.powi(10);

    let expected = [
        (GoalCategory::EmergencyFund, 6.0 * 50_000.0),
        (GoalCategory::Retirement, 900_000.0 / 0.04),
        (GoalCategory::EarlyRetirement, 600_000.0 / 0.03),
        (GoalCategory::Education, 1_600_000.0 * 1.10f64.powi(10)),
        (GoalCategory::HomePurchase, 8_000_000.0 * 0.20),
        (
            GoalCategory::DebtRepayment,
            500_000.0 * 1.01f64.powi(120),
        ),
        (GoalCategory::Vehicle, 1_500_000.0 * 0.3),
        (GoalCategory::HomeImprovement, 600_000.0 * inflation_10y),
        (GoalCategory::Insurance, 40_000.0 * 5.0),
        (GoalCategory::LegacyPlanning, 10_000_000.0 * inflation_10y),
        (GoalCategory::CharitableGiving, 50_000.0),
        (GoalCategory::Discretionary, 750_000.0),
        (GoalCategory::Custom, 750_000.0),
    ];

    for (i, (category, amount)) in expected.into_iter().enumerate() {
        let goal = goal_for(category, i as u32 + 1);
        let plan = engine.plan_goal(&goal, &profile, Some(as_of())).unwrap();
        assert!(
            (plan.amount_needed - amount).abs() / amount < 1e-9,
            "{category}: got {}, expected {amount}",
            plan.amount_needed
        );
        assert_eq!(plan.horizon_months, 120, "{category}");
        assert!(
            (plan.recommended_allocation.total() - 1.0).abs() < 1e-9,
            "{category}"
        );
        assert!(
            (0.0..=1.0).contains(&plan.heuristic_success_probability),
            "{category}"
        );
    }
}

#[test]
fn test_every_category_simulates() {
    let engine = engine();
    let profile = profile();
    let config = config(200);

    for (i, category) in GoalCategory::ALL.into_iter().enumerate() {
        let goal = goal_for(category, i as u32 + 1);
        let report = engine
            .evaluate(
                &goal,
                &profile,
                &config,
                false,
                &crate::progress::SimulationProgress::new(),
            )
            .unwrap_or_else(|e| panic!("{category}: {e}"));
        let result = &report.result;
        assert_eq!(result.invariant_violation(), None, "{category}");
        assert!(
            result.partial_success_probability >= result.success_probability,
            "{category}"
        );
        assert_eq!(result.diagnostics.iterations_completed, 200, "{category}");
    }
}

#[test]
fn test_result_target_matches_calculator_target() {
    let engine = engine();
    let profile = profile();
    let config = config(100);

    for category in [
        GoalCategory::Education,
        GoalCategory::LegacyPlanning,
        GoalCategory::Retirement,
    ] {
        let goal = goal_for(category, 1);
        let plan = engine.plan_goal(&goal, &profile, Some(as_of())).unwrap();
        let report = engine
            .evaluate(
                &goal,
                &profile,
                &config,
                true,
                &crate::progress::SimulationProgress::new(),
            )
            .unwrap();
        assert_eq!(report.result.target_amount, plan.amount_needed, "{category}");
    }
}

#[test]
fn test_emergency_fund_recommendation_avoids_equity() {
    let engine = engine();
    let goal = goal_for(GoalCategory::EmergencyFund, 1);
    let plan = engine.plan_goal(&goal, &profile(), Some(as_of())).unwrap();
    assert_eq!(plan.recommended_allocation.weight(AssetClass::Equity), 0.0);
    assert_eq!(plan.recommended_allocation.weight(AssetClass::Gold), 0.0);
}

#[test]
fn test_missing_required_input_is_invalid_goal() {
    let engine = engine();
    let goal = Goal::new(
        GoalId(9),
        GoalKind::Education {
            years: Some(4.0),
            yearly_cost: None,
        },
        date(2035, 1, 1),
    );
    let err = engine
        .calculate_goal_probability(&goal, &profile(), Some(100), false)
        .unwrap_err();
    assert_eq!(err.goal_id(), Some(GoalId(9)));
    assert!(matches!(
        err,
        GoalError::InvalidGoal(ref e) if e.reason == InvalidGoalReason::MissingField { field: "yearly_cost" }
    ));
}
