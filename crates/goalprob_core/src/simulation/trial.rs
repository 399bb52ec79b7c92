//! A single Monte Carlo trial: month-by-month portfolio growth

use rand::Rng;

use super::returns::ReturnSampler;

/// Attempts per trial before it is discarded
pub const MAX_ATTEMPTS: usize = 3;

/// Fixed inputs shared by every trial of a run
#[derive(Debug, Clone)]
pub struct TrialPlan {
    pub horizon_months: u32,
    pub starting_balance: f64,
    pub monthly_contribution: f64,
    /// Yearly growth of the contribution
    pub annual_contribution_increase: f64,
    pub target: f64,
    /// Monthly growth of the target (0 when not inflation adjusted)
    pub monthly_target_growth: f64,
    pub partial_threshold: f64,
}

/// Outcome of a valid trial
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialRecord {
    pub terminal_balance: f64,
    /// Target at the final month (after any inflation adjustment)
    pub terminal_target: f64,
    pub success: bool,
    pub partial: bool,
    /// First month the balance met the target
    pub months_to_goal: Option<u32>,
}

impl TrialRecord {
    /// Terminal shortfall of an unsuccessful trial, zero otherwise
    #[must_use]
    pub fn shortfall(&self) -> f64 {
        if self.success {
            0.0
        } else {
            (self.terminal_target - self.terminal_balance).max(0.0)
        }
    }
}

/// Run one trial, retrying invalid attempts with the same generator.
///
/// Returns `None` once every attempt hit an invalid draw or balance.
pub fn run_trial<R: Rng + ?Sized>(
    plan: &TrialPlan,
    sampler: &ReturnSampler,
    rng: &mut R,
) -> Option<TrialRecord> {
    (0..MAX_ATTEMPTS).find_map(|_| attempt(plan, sampler, rng))
}

fn attempt<R: Rng + ?Sized>(
    plan: &TrialPlan,
    sampler: &ReturnSampler,
    rng: &mut R,
) -> Option<TrialRecord> {
    let mut balance = plan.starting_balance;
    let mut target = plan.target;
    let mut contribution = plan.monthly_contribution;

    let mut months_to_goal = None;
    let mut partial = false;
    let mut observe = |month: u32, balance: f64, target: f64| {
        if months_to_goal.is_none() && balance >= target {
            months_to_goal = Some(month);
        }
        if balance >= plan.partial_threshold * target {
            partial = true;
        }
    };

    // Month 0, before any growth
    observe(0, balance, target);

    for month in 1..=plan.horizon_months {
        let r = sampler.sample(rng)?;
        balance = balance * (1.0 + r) + contribution;
        if !balance.is_finite() {
            return None;
        }
        target *= 1.0 + plan.monthly_target_growth;
        observe(month, balance, target);

        if month % 12 == 0 {
            contribution *= 1.0 + plan.annual_contribution_increase;
        }
    }

    let success = months_to_goal.is_some();
    Some(TrialRecord {
        terminal_balance: balance,
        terminal_target: target,
        success,
        partial: partial || success,
        months_to_goal,
    })
}
