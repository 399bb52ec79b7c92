//! Goal calculators
//!
//! Maps a goal and profile to a [`GoalPlan`]: how much the goal needs, what
//! monthly saving gets there, which asset mix suits it, and a cheap
//! deterministic success estimate. Category dispatch is one exhaustive match
//! over [`GoalKind`](crate::model::GoalKind) in [`formulas`].
//!
//! The heuristic estimate is advisory. The Monte Carlo result from
//! [`crate::simulation`] is the figure to show users.

mod allocation;
pub mod formulas;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::InvalidGoalError;
use crate::model::{Allocation, Goal, Profile};
use crate::params::{MarketAssumptions, Parameters};

pub use formulas::TargetAmount;

/// Calculator outputs for one goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalPlan {
    pub amount_needed: f64,
    pub required_monthly_contribution: f64,
    pub recommended_allocation: Allocation,
    pub heuristic_success_probability: f64,
    pub horizon_months: u32,
}

/// Category calculators bound to a parameter set and valuation date
pub struct GoalCalculator<'a> {
    params: &'a Parameters,
    market: MarketAssumptions,
    as_of: Date,
}

impl<'a> GoalCalculator<'a> {
    #[must_use]
    pub fn new(params: &'a Parameters, as_of: Date) -> Self {
        Self {
            params,
            market: params.market(),
            as_of,
        }
    }

    #[must_use]
    pub fn market(&self) -> &MarketAssumptions {
        &self.market
    }

    #[must_use]
    pub fn horizon_months(&self, goal: &Goal) -> u32 {
        goal.horizon_months(self.as_of)
    }

    /// The amount the goal needs: the explicit target when one is set,
    /// otherwise the category formula. Saving rates, the heuristic and the
    /// simulation all aim at this figure.
    pub fn calculate_amount_needed(
        &self,
        goal: &Goal,
        profile: &Profile,
    ) -> Result<f64, InvalidGoalError> {
        self.simulation_target(goal, profile)
            .map(|target| target.amount)
    }

    /// What the category formula alone asks for, flagged with whether it is
    /// already projected to the target date
    pub fn formula_target(
        &self,
        goal: &Goal,
        profile: &Profile,
    ) -> Result<TargetAmount, InvalidGoalError> {
        formulas::amount_needed(goal, profile, self.params, self.horizon_months(goal))
            .map_err(|reason| InvalidGoalError::new(goal.id, reason))
    }

    /// Target used for simulation: the explicit target when one is set,
    /// otherwise the category formula
    pub fn simulation_target(
        &self,
        goal: &Goal,
        profile: &Profile,
    ) -> Result<TargetAmount, InvalidGoalError> {
        match goal.explicit_target() {
            Some(amount) => Ok(TargetAmount {
                amount,
                nominal: false,
            }),
            None => self.formula_target(goal, profile),
        }
    }

    /// Level monthly contribution that takes the current amount to the amount
    /// needed at the recommended allocation's expected return
    pub fn calculate_required_saving_rate(
        &self,
        goal: &Goal,
        profile: &Profile,
    ) -> Result<f64, InvalidGoalError> {
        let target = self.simulation_target(goal, profile)?;
        let allocation = self.get_recommended_allocation(goal, profile);
        Ok(self.required_rate(goal, target.amount, &allocation))
    }

    fn required_rate(&self, goal: &Goal, target: f64, allocation: &Allocation) -> f64 {
        let rate = formulas::monthly_rate(self.market.expected_return(allocation));
        formulas::required_payment(
            goal.current_amount,
            target,
            rate,
            self.horizon_months(goal),
        )
    }

    /// Glide-path allocation for the goal's category and horizon, shifted by
    /// the profile's risk tolerance
    #[must_use]
    pub fn get_recommended_allocation(&self, goal: &Goal, profile: &Profile) -> Allocation {
        allocation::recommend(
            goal.category(),
            self.horizon_months(goal),
            profile.risk_tolerance,
        )
    }

    /// Deterministic projection of the current plan divided by the target,
    /// clamped to [0, 1]
    pub fn calculate_goal_success_probability(
        &self,
        goal: &Goal,
        profile: &Profile,
    ) -> Result<f64, InvalidGoalError> {
        let target = self.simulation_target(goal, profile)?;
        let allocation = self.effective_allocation(goal, profile)?;
        Ok(self.heuristic(goal, target.amount, &allocation))
    }

    fn heuristic(&self, goal: &Goal, target: f64, allocation: &Allocation) -> f64 {
        if target <= 0.0 {
            return 1.0;
        }
        let rate = formulas::monthly_rate(self.market.expected_return(allocation));
        let projected = formulas::future_value(
            goal.current_amount,
            goal.monthly_contribution,
            rate,
            self.horizon_months(goal),
        );
        (projected / target).clamp(0.0, 1.0)
    }

    /// The goal's own allocation (normalized) or the recommended one
    pub fn effective_allocation(
        &self,
        goal: &Goal,
        profile: &Profile,
    ) -> Result<Allocation, InvalidGoalError> {
        match &goal.allocation {
            Some(allocation) => allocation
                .normalized()
                .map_err(|reason| InvalidGoalError::new(goal.id, reason)),
            None => Ok(self.get_recommended_allocation(goal, profile)),
        }
    }

    /// All calculator outputs in one pass
    pub fn plan(&self, goal: &Goal, profile: &Profile) -> Result<GoalPlan, InvalidGoalError> {
        goal.validate()?;
        let target = self.simulation_target(goal, profile)?;
        let recommended = self.get_recommended_allocation(goal, profile);
        let chosen = self.effective_allocation(goal, profile)?;

        Ok(GoalPlan {
            amount_needed: target.amount,
            required_monthly_contribution: self.required_rate(goal, target.amount, &recommended),
            heuristic_success_probability: self.heuristic(goal, target.amount, &chosen),
            recommended_allocation: recommended,
            horizon_months: self.horizon_months(goal),
        })
    }
}
