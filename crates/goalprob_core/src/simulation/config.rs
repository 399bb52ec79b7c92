use std::time::Duration;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::error::SimulationError;

pub const INTERACTIVE_ITERATIONS: usize = 100;
pub const DEFAULT_ITERATIONS: usize = 1_000;
pub const FINAL_ITERATIONS: usize = 10_000;

/// How the base seed of a run is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    Fixed(u64),
    /// Fresh seed per call
    #[default]
    Random,
}

/// Simulation time step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeStep {
    #[default]
    Monthly,
}

/// Distribution of monthly asset-class returns
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReturnModel {
    #[default]
    Normal,
    LogNormal,
    /// Fat-tailed returns, rescaled to the parameter volatility
    StudentT { df: f64 },
}

/// Per-call simulation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub iterations: usize,
    pub seed: SeedPolicy,
    pub time_step: TimeStep,
    pub return_model: ReturnModel,
    /// Fraction of the target that counts as partial success
    pub partial_threshold: f64,
    /// Grow the target at the inflation parameter month by month
    pub inflation_adjusted_target: bool,
    /// Yearly growth of the monthly contribution (0.05 = 5% step-up)
    pub annual_contribution_increase: f64,
    /// Trials between cancellation and deadline checks
    pub chunk_size: usize,
    pub time_budget: Option<Duration>,
    /// Valuation date; today when unset
    pub as_of: Option<Date>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            seed: SeedPolicy::Random,
            time_step: TimeStep::Monthly,
            return_model: ReturnModel::Normal,
            partial_threshold: 0.8,
            inflation_adjusted_target: true,
            annual_contribution_increase: 0.0,
            chunk_size: 250,
            time_budget: None,
            as_of: None,
        }
    }
}

impl SimulationConfig {
    /// Quick estimate for interactive use
    #[must_use]
    pub fn interactive() -> Self {
        Self {
            iterations: INTERACTIVE_ITERATIONS,
            ..Self::default()
        }
    }

    /// High-precision run for final recommendations
    #[must_use]
    pub fn final_recommendation() -> Self {
        Self {
            iterations: FINAL_ITERATIONS,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = SeedPolicy::Fixed(seed);
        self
    }

    #[must_use]
    pub fn with_as_of(mut self, as_of: Date) -> Self {
        self.as_of = Some(as_of);
        self
    }

    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    #[must_use]
    pub fn with_return_model(mut self, model: ReturnModel) -> Self {
        self.return_model = model;
        self
    }

    /// Valuation date, defaulting to today in the system time zone
    #[must_use]
    pub fn valuation_date(&self) -> Date {
        self.as_of.unwrap_or_else(|| jiff::Zoned::now().date())
    }

    /// Check everything except the iteration count, which is reported
    /// against the goal being simulated
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.chunk_size == 0 {
            return Err(SimulationError::InvalidConfig(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if !(self.partial_threshold > 0.0 && self.partial_threshold <= 1.0) {
            return Err(SimulationError::InvalidConfig(format!(
                "partial_threshold must be in (0, 1], got {}",
                self.partial_threshold
            )));
        }
        if !self.annual_contribution_increase.is_finite()
            || self.annual_contribution_increase <= -1.0
        {
            return Err(SimulationError::InvalidConfig(format!(
                "annual_contribution_increase must be finite and above -1, got {}",
                self.annual_contribution_increase
            )));
        }
        if let ReturnModel::StudentT { df } = self.return_model
            && !(df.is_finite() && df > 2.0)
        {
            return Err(SimulationError::InvalidConfig(format!(
                "Student-t degrees of freedom must exceed 2, got {df}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(SimulationConfig::interactive().iterations, 100);
        assert_eq!(SimulationConfig::default().iterations, 1_000);
        assert_eq!(SimulationConfig::final_recommendation().iterations, 10_000);
    }

    #[test]
    fn test_validate() {
        assert!(SimulationConfig::default().validate().is_ok());

        let config = SimulationConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(SimulationError::InvalidConfig(_))
        ));

        let config = SimulationConfig::default()
            .with_return_model(ReturnModel::StudentT { df: 2.0 });
        assert!(config.validate().is_err());

        let config = SimulationConfig {
            partial_threshold: 1.2,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: SimulationConfig =
            serde_json::from_str(r#"{"iterations": 500, "seed": {"fixed": 7}}"#).unwrap();
        assert_eq!(config.iterations, 500);
        assert_eq!(config.seed, SeedPolicy::Fixed(7));
        assert_eq!(config.partial_threshold, 0.8);
    }
}
