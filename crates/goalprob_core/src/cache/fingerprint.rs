use std::fmt;
use std::hash::{Hash, Hasher};

use jiff::civil::Date;
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};

use crate::model::{Goal, Profile};
use crate::simulation::{ReturnModel, SeedPolicy, SimulationConfig};

/// Bumped whenever the hashed field set or simulation semantics change
const FINGERPRINT_VERSION: u32 = 2;

/// Stable 64-bit key of (goal state, profile state, parameter set, simulation
/// config)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub u64);

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl Fingerprint {
    /// Fingerprint of one evaluation.
    ///
    /// `parameters` is [`Parameters::digest`](crate::params::Parameters::digest)
    /// and `as_of` the resolved valuation date. A random seed policy is hashed
    /// as a single tag, so any cached random-seed result satisfies a later
    /// random-seed request.
    #[must_use]
    pub fn compute(
        goal: &Goal,
        profile: &Profile,
        parameters: u64,
        config: &SimulationConfig,
        as_of: Date,
    ) -> Self {
        let mut h = FxHasher::default();
        FINGERPRINT_VERSION.hash(&mut h);

        // Goal
        goal.id.hash(&mut h);
        goal.category().name().hash(&mut h);
        for (name, value) in goal.kind.inputs() {
            name.hash(&mut h);
            value.map(f64::to_bits).hash(&mut h);
        }
        goal.target_amount.to_bits().hash(&mut h);
        goal.current_amount.to_bits().hash(&mut h);
        goal.monthly_contribution.to_bits().hash(&mut h);
        match &goal.allocation {
            Some(allocation) => {
                1u8.hash(&mut h);
                for (asset, weight) in allocation.iter() {
                    asset.hash(&mut h);
                    weight.to_bits().hash(&mut h);
                }
            }
            None => 0u8.hash(&mut h),
        }
        hash_date(goal.target_date, &mut h);

        // Profile
        profile.monthly_income.to_bits().hash(&mut h);
        profile.monthly_expenses.to_bits().hash(&mut h);
        profile.age.hash(&mut h);
        profile.risk_tolerance.hash(&mut h);
        profile.dependents.hash(&mut h);
        profile.retirement_age.hash(&mut h);

        parameters.hash(&mut h);

        // Simulation config
        config.iterations.hash(&mut h);
        match config.seed {
            SeedPolicy::Fixed(seed) => {
                1u8.hash(&mut h);
                seed.hash(&mut h);
            }
            SeedPolicy::Random => 0u8.hash(&mut h),
        }
        config.time_step.hash(&mut h);
        match config.return_model {
            ReturnModel::Normal => 0u8.hash(&mut h),
            ReturnModel::LogNormal => 1u8.hash(&mut h),
            ReturnModel::StudentT { df } => {
                2u8.hash(&mut h);
                df.to_bits().hash(&mut h);
            }
        }
        config.partial_threshold.to_bits().hash(&mut h);
        config.inflation_adjusted_target.hash(&mut h);
        config.annual_contribution_increase.to_bits().hash(&mut h);
        hash_date(as_of, &mut h);

        Fingerprint(h.finish())
    }
}

fn hash_date(date: Date, h: &mut FxHasher) {
    date.year().hash(h);
    date.month().hash(h);
    date.day().hash(h);
}
