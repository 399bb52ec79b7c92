//! Engine facade held by the service layer
//!
//! Owns the parameter handle, the shared cache and the worker pool, and runs
//! the calculator → simulation → cache pipeline for single goals and batches.

use std::sync::Arc;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::batch::{self, BatchOutcome, GoalRepository};
use crate::cache::{CacheConfig, CacheStats, Fingerprint, ProbabilityCache};
use crate::calculator::{GoalCalculator, GoalPlan};
use crate::error::{GoalError, InvalidGoalError, InvalidGoalReason, SimulationError};
use crate::executor::WorkerPool;
use crate::model::{Goal, GoalId, ProbabilityReport, Profile};
use crate::params::{ParameterProvider, Parameters};
use crate::progress::{CancellationToken, SimulationProgress};
use crate::simulation::{self, SimulationConfig, SimulationInput};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Template for every evaluation; the iteration count may be overridden
    /// per call
    pub simulation: SimulationConfig,
    /// Worker threads (all cores when unset)
    pub worker_limit: Option<usize>,
    pub cache: CacheConfig,
}

pub struct GoalProbabilityEngine {
    parameters: Parameters,
    cache: Arc<ProbabilityCache>,
    pool: WorkerPool,
    config: EngineConfig,
}

impl GoalProbabilityEngine {
    pub fn new(parameters: Parameters, config: EngineConfig) -> Result<Self, SimulationError> {
        let cache = Arc::new(ProbabilityCache::new(config.cache));
        Self::with_cache(parameters, config, cache)
    }

    /// Engine sharing an existing cache
    pub fn with_cache(
        parameters: Parameters,
        config: EngineConfig,
        cache: Arc<ProbabilityCache>,
    ) -> Result<Self, SimulationError> {
        let pool = WorkerPool::new(config.worker_limit)?;
        Ok(Self {
            parameters,
            cache,
            pool,
            config,
        })
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ProbabilityCache> {
        &self.cache
    }

    pub(crate) fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// The configured simulation template, with `iterations` overriding its
    /// count when given
    #[must_use]
    pub fn simulation_config(&self, iterations: Option<usize>) -> SimulationConfig {
        let mut config = self.config.simulation.clone();
        if let Some(iterations) = iterations {
            config.iterations = iterations;
        }
        config
    }

    /// Success probability of one goal, served from cache unless
    /// `force_recalculate` is set
    pub fn calculate_goal_probability(
        &self,
        goal: &Goal,
        profile: &Profile,
        iterations: Option<usize>,
        force_recalculate: bool,
    ) -> Result<ProbabilityReport, GoalError> {
        let config = self.simulation_config(iterations);
        self.evaluate(
            goal,
            profile,
            &config,
            force_recalculate,
            &SimulationProgress::new(),
        )
    }

    /// Evaluate one goal under an explicit configuration
    pub fn evaluate(
        &self,
        goal: &Goal,
        profile: &Profile,
        config: &SimulationConfig,
        force_recalculate: bool,
        progress: &SimulationProgress,
    ) -> Result<ProbabilityReport, GoalError> {
        profile.validate()?;
        goal.validate()?;
        if config.iterations == 0 {
            return Err(InvalidGoalError::new(goal.id, InvalidGoalReason::ZeroIterations).into());
        }

        let as_of = config.valuation_date();
        let calculator = GoalCalculator::new(&self.parameters, as_of);
        let allocation = calculator.effective_allocation(goal, profile)?;
        let target = calculator.simulation_target(goal, profile)?;

        let fingerprint =
            Fingerprint::compute(goal, profile, self.parameters.digest(), config, as_of);
        if !force_recalculate && let Some(hit) = self.cache.get(fingerprint) {
            tracing::debug!(goal_id = %goal.id, %fingerprint, "Cache hit");
            return Ok(ProbabilityReport {
                result: hit.result,
                fingerprint,
                computed_at: hit.created_at,
                from_cache: true,
            });
        }

        let input = SimulationInput {
            target: target.amount,
            target_is_nominal: target.nominal,
            current_amount: goal.current_amount,
            monthly_contribution: goal.monthly_contribution,
            horizon_months: calculator.horizon_months(goal),
            allocation,
            market: *calculator.market(),
        };
        tracing::debug!(
            goal_id = %goal.id,
            category = %goal.category(),
            target = input.target,
            horizon_months = input.horizon_months,
            iterations = config.iterations,
            "Running simulation"
        );

        let result = simulation::simulate(&input, config, &self.pool, progress)
            .map(Arc::new)
            .map_err(|e| GoalError::simulation(goal.id, e))?;
        let computed_at = self
            .cache
            .put(fingerprint, goal.id, Arc::clone(&result), None);

        Ok(ProbabilityReport {
            result,
            fingerprint,
            computed_at,
            from_cache: false,
        })
    }

    /// Evaluate several goals of one profile concurrently
    pub fn calculate_goal_probabilities(
        &self,
        repository: &dyn GoalRepository,
        goal_ids: &[GoalId],
        profile: &Profile,
        iterations: Option<usize>,
        force_recalculate: bool,
    ) -> BatchOutcome {
        let config = self.simulation_config(iterations);
        self.evaluate_batch(
            repository,
            goal_ids,
            profile,
            &config,
            force_recalculate,
            &CancellationToken::new(),
        )
    }

    /// Batch evaluation under an explicit configuration and cancellation token
    pub fn evaluate_batch(
        &self,
        repository: &dyn GoalRepository,
        goal_ids: &[GoalId],
        profile: &Profile,
        config: &SimulationConfig,
        force_recalculate: bool,
        token: &CancellationToken,
    ) -> BatchOutcome {
        batch::run_batch(
            self,
            repository,
            goal_ids,
            profile,
            config,
            force_recalculate,
            token,
        )
    }

    /// Calculator outputs for a goal, valued at `as_of` (the configured
    /// valuation date or today when `None`)
    pub fn plan_goal(
        &self,
        goal: &Goal,
        profile: &Profile,
        as_of: Option<Date>,
    ) -> Result<GoalPlan, GoalError> {
        profile.validate()?;
        let as_of = as_of.unwrap_or_else(|| self.config.simulation.valuation_date());
        Ok(GoalCalculator::new(&self.parameters, as_of).plan(goal, profile)?)
    }

    /// Drop cached results for one goal, or all of them
    pub fn invalidate_cache(&self, goal_id: Option<GoalId>) -> usize {
        match goal_id {
            Some(goal_id) => self.cache.invalidate(goal_id),
            None => self.cache.invalidate_all(),
        }
    }

    #[must_use]
    pub fn get_cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Swap the parameter source. Every cached result was computed with the
    /// old figures, so the whole cache is cleared.
    pub fn replace_parameters(&mut self, provider: impl ParameterProvider + 'static) {
        self.parameters = Parameters::new(provider);
        let cleared = self.cache.invalidate_all();
        tracing::info!(cleared, "Parameters replaced, cache cleared");
    }
}

impl std::fmt::Debug for GoalProbabilityEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoalProbabilityEngine")
            .field("config", &self.config)
            .field("pool", &self.pool)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}
