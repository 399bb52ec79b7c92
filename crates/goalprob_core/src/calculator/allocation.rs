//! Horizon-keyed glide path for recommended allocations

use crate::model::{Allocation, AssetClass, GoalCategory, RiskTolerance};

const MAX_EQUITY: f64 = 0.9;
/// Equity ceiling for goals that should not ride market swings
const LOW_EQUITY_CAP: f64 = 0.2;
const GOLD_SHARE: f64 = 0.05;

/// Base equity share by whole years to the target date
fn glide_equity(years: f64) -> f64 {
    if years < 1.0 {
        0.0
    } else if years < 3.0 {
        0.2
    } else if years < 5.0 {
        0.4
    } else if years < 10.0 {
        0.6
    } else {
        0.75
    }
}

/// Recommended mix for a goal category, horizon and risk tolerance.
///
/// Weights always sum to 1.0.
pub(crate) fn recommend(
    category: GoalCategory,
    horizon_months: u32,
    risk: RiskTolerance,
) -> Allocation {
    if category == GoalCategory::EmergencyFund {
        return Allocation::new()
            .with(AssetClass::Cash, 0.5)
            .with(AssetClass::Debt, 0.5);
    }

    let years = f64::from(horizon_months) / 12.0;
    let base = glide_equity(years);
    let mut equity = if base > 0.0 {
        (base + risk.equity_tilt()).clamp(0.0, MAX_EQUITY)
    } else {
        0.0
    };
    if matches!(
        category,
        GoalCategory::DebtRepayment | GoalCategory::Insurance
    ) {
        equity = equity.min(LOW_EQUITY_CAP);
    }

    let gold = if years >= 3.0 && equity > 0.0 {
        GOLD_SHARE
    } else {
        0.0
    };
    let cash = if years < 1.0 { 0.1 } else { 0.05 };
    let debt = (1.0 - equity - gold - cash).max(0.0);

    Allocation::from_weights(
        [
            (AssetClass::Equity, equity),
            (AssetClass::Debt, debt),
            (AssetClass::Gold, gold),
            (AssetClass::Cash, cash),
        ]
        .into_iter()
        .filter(|(_, weight)| *weight > 0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sums_to_one(allocation: &Allocation) {
        assert!((allocation.total() - 1.0).abs() < 1e-9, "{allocation}");
    }

    #[test]
    fn test_equity_rises_with_horizon() {
        let mut previous = -1.0;
        for months in [6, 24, 48, 96, 240] {
            let allocation = recommend(GoalCategory::Retirement, months, RiskTolerance::Moderate);
            assert_sums_to_one(&allocation);
            let equity = allocation.weight(AssetClass::Equity);
            assert!(equity > previous, "{months} months: {allocation}");
            previous = equity;
        }
    }

    #[test]
    fn test_risk_tolerance_shifts_equity() {
        let conservative = recommend(GoalCategory::Education, 120, RiskTolerance::Conservative);
        let aggressive = recommend(GoalCategory::Education, 120, RiskTolerance::Aggressive);
        assert!(
            conservative.weight(AssetClass::Equity) < aggressive.weight(AssetClass::Equity)
        );
        assert_sums_to_one(&conservative);
        assert_sums_to_one(&aggressive);
    }

    #[test]
    fn test_category_caps() {
        let emergency = recommend(GoalCategory::EmergencyFund, 240, RiskTolerance::Aggressive);
        assert_eq!(emergency.weight(AssetClass::Equity), 0.0);
        assert_eq!(emergency.weight(AssetClass::Cash), 0.5);

        let debt = recommend(GoalCategory::DebtRepayment, 240, RiskTolerance::Aggressive);
        assert!(debt.weight(AssetClass::Equity) <= LOW_EQUITY_CAP);
        assert_sums_to_one(&debt);
    }
}
