//! Per-category target formulas and time-value helpers

use crate::error::InvalidGoalReason;
use crate::model::{Goal, GoalKind, Profile};
use crate::params::{ParamKey, Parameters};

/// Amount a goal must reach.
///
/// `nominal` is set when the formula already projects the amount to the
/// target date (inflated or compounded), so the simulation must not inflate it
/// again.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetAmount {
    pub amount: f64,
    pub nominal: bool,
}

impl TargetAmount {
    fn today(amount: f64) -> Self {
        Self {
            amount,
            nominal: false,
        }
    }

    fn projected(amount: f64) -> Self {
        Self {
            amount,
            nominal: true,
        }
    }
}

/// Monthly rate equivalent to an annual compound rate
#[must_use]
pub fn monthly_rate(annual_rate: f64) -> f64 {
    (1.0 + annual_rate).powf(1.0 / 12.0) - 1.0
}

/// Rates closer to zero than this are treated as zero in annuity math
const RATE_EPSILON: f64 = 1e-12;

/// Value of `present` plus `payment` at the end of each of `months` months
#[must_use]
pub fn future_value(present: f64, payment: f64, monthly_rate: f64, months: u32) -> f64 {
    let n = f64::from(months);
    if monthly_rate.abs() < RATE_EPSILON {
        return present + payment * n;
    }
    let growth = (1.0 + monthly_rate).powf(n);
    present * growth + payment * (growth - 1.0) / monthly_rate
}

/// Level monthly payment taking `present` to `target` over `months` months.
///
/// Zero when there is no horizon or the current amount already grows to the
/// target on its own.
#[must_use]
pub fn required_payment(present: f64, target: f64, monthly_rate: f64, months: u32) -> f64 {
    if months == 0 || target <= present {
        return 0.0;
    }
    let n = f64::from(months);
    let payment = if monthly_rate.abs() < RATE_EPSILON {
        (target - present) / n
    } else {
        let growth = (1.0 + monthly_rate).powf(n);
        (target - present * growth) * monthly_rate / (growth - 1.0)
    };
    payment.max(0.0)
}

fn inflate(amount: f64, annual_rate: f64, months: u32) -> f64 {
    amount * (1.0 + annual_rate).powf(f64::from(months) / 12.0)
}

/// Resolve a required category input, falling back to an explicit target
fn required(goal: &Goal, field: &'static str, value: Option<f64>) -> Result<f64, Fallback> {
    match value {
        Some(value) => Ok(value),
        None => match goal.explicit_target() {
            Some(target) => Err(Fallback::Explicit(target)),
            None => Err(Fallback::Missing(field)),
        },
    }
}

enum Fallback {
    Explicit(f64),
    Missing(&'static str),
}

/// Category formula for the amount a goal needs
pub(crate) fn amount_needed(
    goal: &Goal,
    profile: &Profile,
    params: &Parameters,
    horizon_months: u32,
) -> Result<TargetAmount, InvalidGoalReason> {
    let result = category_amount(goal, profile, params, horizon_months);
    match result {
        Ok(target) if !target.amount.is_finite() => Err(InvalidGoalReason::OutOfRange {
            field: "target_amount",
            value: target.amount,
        }),
        Ok(target) => Ok(target),
        Err(Fallback::Explicit(target)) => Ok(TargetAmount::today(target)),
        Err(Fallback::Missing(field)) => Err(InvalidGoalReason::MissingField { field }),
    }
}

fn category_amount(
    goal: &Goal,
    profile: &Profile,
    params: &Parameters,
    horizon_months: u32,
) -> Result<TargetAmount, Fallback> {
    let target = match goal.kind {
        GoalKind::EmergencyFund { months } => {
            let months = months.unwrap_or_else(|| params.get(ParamKey::EmergencyFundMonths));
            TargetAmount::today(months * profile.monthly_expenses)
        }
        GoalKind::Retirement {
            annual_expenses,
            withdrawal_rate,
        } => retirement_corpus(
            goal,
            profile,
            annual_expenses,
            withdrawal_rate.unwrap_or_else(|| params.get(ParamKey::RetirementWithdrawalRate)),
        )?,
        GoalKind::EarlyRetirement {
            annual_expenses,
            withdrawal_rate,
        } => retirement_corpus(
            goal,
            profile,
            annual_expenses,
            withdrawal_rate
                .unwrap_or_else(|| params.get(ParamKey::EarlyRetirementWithdrawalRate)),
        )?,
        GoalKind::Education { years, yearly_cost } => {
            let years = required(goal, "years", years)?;
            let yearly_cost = required(goal, "yearly_cost", yearly_cost)?;
            TargetAmount::projected(inflate(
                years * yearly_cost,
                params.get(ParamKey::EducationInflation),
                horizon_months,
            ))
        }
        GoalKind::HomePurchase {
            property_value,
            down_payment_percent,
        } => {
            let value = required(goal, "property_value", property_value)?;
            let down = down_payment_percent.unwrap_or_else(|| params.get(ParamKey::HomeDownPayment));
            TargetAmount::today(value * down)
        }
        GoalKind::DebtRepayment {
            outstanding_balance,
            interest_rate,
        } => {
            let balance = required(goal, "outstanding_balance", outstanding_balance)?;
            let monthly = interest_rate.unwrap_or(0.0) / 12.0;
            TargetAmount::projected(balance * (1.0 + monthly).powf(f64::from(horizon_months)))
        }
        GoalKind::Vehicle {
            price,
            down_payment_percent,
        } => {
            let price = required(goal, "price", price)?;
            let down =
                down_payment_percent.unwrap_or_else(|| params.get(ParamKey::VehicleDownPayment));
            TargetAmount::today(price * down)
        }
        GoalKind::HomeImprovement { estimated_cost } => {
            let cost = required(goal, "estimated_cost", estimated_cost)?;
            TargetAmount::projected(inflate(
                cost,
                params.get(ParamKey::Inflation),
                horizon_months,
            ))
        }
        GoalKind::Insurance {
            annual_premium,
            years,
        } => {
            let premium = required(goal, "annual_premium", annual_premium)?;
            let years = years.unwrap_or_else(|| params.get(ParamKey::InsuranceYears));
            TargetAmount::today(premium * years)
        }
        GoalKind::LegacyPlanning { bequest_amount } => {
            let bequest = required(goal, "bequest_amount", bequest_amount)?;
            TargetAmount::projected(inflate(
                bequest,
                params.get(ParamKey::Inflation),
                horizon_months,
            ))
        }
        GoalKind::CharitableGiving {
            annual_donation,
            years,
        } => {
            let donation = required(goal, "annual_donation", annual_donation)?;
            let years = years.unwrap_or_else(|| params.get(ParamKey::CharitableGivingYears));
            TargetAmount::today(donation * years)
        }
        GoalKind::Discretionary {} | GoalKind::Custom {} => {
            return match goal.explicit_target() {
                Some(target) => Ok(TargetAmount::today(target)),
                None => Err(Fallback::Missing("target_amount")),
            };
        }
    };
    Ok(target)
}

fn retirement_corpus(
    goal: &Goal,
    profile: &Profile,
    annual_expenses: Option<f64>,
    withdrawal_rate: f64,
) -> Result<TargetAmount, Fallback> {
    let expenses = annual_expenses.unwrap_or_else(|| profile.annual_expenses());
    if expenses <= 0.0 {
        // Nothing to size the corpus from
        return required(goal, "annual_expenses", None).map(TargetAmount::today);
    }
    Ok(TargetAmount::today(expenses / withdrawal_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_future_value_zero_rate() {
        assert_eq!(future_value(1_000.0, 100.0, 0.0, 12), 2_200.0);
    }

    #[test]
    fn test_required_payment_round_trips_future_value() {
        let rate = monthly_rate(0.08);
        let payment = required_payment(10_000.0, 500_000.0, rate, 120);
        let reached = future_value(10_000.0, payment, rate, 120);
        assert!((reached - 500_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_required_payment_edges() {
        assert_eq!(required_payment(0.0, 1_000.0, 0.01, 0), 0.0);
        assert_eq!(required_payment(2_000.0, 1_000.0, 0.01, 12), 0.0);
        assert_eq!(required_payment(0.0, 1_200.0, 0.0, 12), 100.0);
        // Growth alone reaches the target
        assert_eq!(required_payment(990.0, 1_000.0, 0.01, 12), 0.0);
    }

    #[test]
    fn test_overflowing_target_rejected() {
        use crate::model::{GoalId, ProfileId};

        let profile = Profile::new(ProfileId(1), 30);
        let params = Parameters::defaults();
        let education = Goal::new(
            GoalId(1),
            GoalKind::Education {
                years: Some(1e300),
                yearly_cost: Some(1e300),
            },
            jiff::civil::date(2030, 1, 1),
        );
        assert!(matches!(
            amount_needed(&education, &profile, &params, 60),
            Err(InvalidGoalReason::OutOfRange {
                field: "target_amount",
                ..
            })
        ));

        let debt = Goal::new(
            GoalId(2),
            GoalKind::DebtRepayment {
                outstanding_balance: Some(1e6),
                interest_rate: Some(1e6),
            },
            jiff::civil::date(2075, 1, 1),
        );
        assert!(amount_needed(&debt, &profile, &params, 600).is_err());
    }

    #[test]
    fn test_monthly_rate_compounds_to_annual() {
        let monthly = monthly_rate(0.12);
        assert!(((1.0 + monthly).powi(12) - 1.12).abs() < 1e-12);
    }
}
