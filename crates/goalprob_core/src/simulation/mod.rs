//! Monte Carlo simulation core
//!
//! Trials run in chunks on the [`WorkerPool`]. Every trial seeds its own
//! generator from the run's base seed and the trial index, so a run's output
//! depends only on its inputs, seed and iteration count, never on thread
//! scheduling. Chunks are merged in index order.
//!
//! Cancellation and the time budget are checked at the start of each chunk.
//! A run cut short by the budget returns what finished, flagged `truncated`.

pub mod aggregate;
mod config;
pub mod returns;
pub mod trial;

use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub use config::{
    DEFAULT_ITERATIONS, FINAL_ITERATIONS, INTERACTIVE_ITERATIONS, ReturnModel, SeedPolicy,
    SimulationConfig, TimeStep,
};

use crate::error::{SimulationError, SimulationTimeoutError};
use crate::executor::WorkerPool;
use crate::model::{Allocation, ProbabilityResult};
use crate::params::MarketAssumptions;
use crate::progress::SimulationProgress;
use aggregate::{RunContext, TrialBatch};
use returns::ReturnSampler;
use trial::TrialPlan;

/// Everything a run needs about the goal, already resolved and validated
#[derive(Debug, Clone)]
pub struct SimulationInput {
    pub target: f64,
    /// The target is already projected to the target date
    pub target_is_nominal: bool,
    pub current_amount: f64,
    pub monthly_contribution: f64,
    pub horizon_months: u32,
    /// Normalized weights
    pub allocation: Allocation,
    pub market: MarketAssumptions,
}

/// SplitMix64 finalizer, spreading consecutive trial indices across the
/// seed space
fn mix_seed(base: u64, index: u64) -> u64 {
    let mut z = base ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Base seed for a run
#[must_use]
pub fn resolve_seed(policy: SeedPolicy) -> u64 {
    match policy {
        SeedPolicy::Fixed(seed) => seed,
        SeedPolicy::Random => rand::rng().random(),
    }
}

enum ChunkOutcome {
    Done(TrialBatch),
    OutOfTime,
    Cancelled,
}

/// Run `config.iterations` trials and aggregate them.
///
/// The iteration count must already be checked to be non-zero.
pub fn simulate(
    input: &SimulationInput,
    config: &SimulationConfig,
    pool: &WorkerPool,
    progress: &SimulationProgress,
) -> Result<ProbabilityResult, SimulationError> {
    config.validate()?;
    if config.iterations == 0 {
        return Err(SimulationError::InvalidConfig(
            "iterations must be at least 1".to_string(),
        ));
    }

    let started = Instant::now();
    let deadline = config.time_budget.map(|budget| started + budget);
    let seed = resolve_seed(config.seed);
    let sampler = ReturnSampler::new(&input.market, &input.allocation, config.return_model)?;

    let monthly_target_growth = if config.inflation_adjusted_target && !input.target_is_nominal {
        (1.0 + input.market.inflation).powf(1.0 / 12.0) - 1.0
    } else {
        0.0
    };
    let plan = TrialPlan {
        horizon_months: input.horizon_months,
        starting_balance: input.current_amount,
        monthly_contribution: input.monthly_contribution,
        annual_contribution_increase: config.annual_contribution_increase,
        target: input.target,
        monthly_target_growth,
        partial_threshold: config.partial_threshold,
    };

    progress.reset(config.iterations);
    let chunks: Vec<(usize, usize)> = (0..config.iterations)
        .step_by(config.chunk_size)
        .map(|start| (start, (start + config.chunk_size).min(config.iterations)))
        .collect();

    let outcomes = pool.map(chunks, |(start, end)| {
        if progress.is_cancelled() {
            return ChunkOutcome::Cancelled;
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return ChunkOutcome::OutOfTime;
        }

        let mut batch = TrialBatch::with_capacity(end - start);
        for index in start..end {
            let mut rng = SmallRng::seed_from_u64(mix_seed(seed, index as u64));
            batch.record(trial::run_trial(&plan, &sampler, &mut rng));
        }
        progress.add(end - start);
        ChunkOutcome::Done(batch)
    });

    let mut merged = TrialBatch::with_capacity(config.iterations);
    let mut truncated = false;
    for outcome in outcomes {
        match outcome {
            ChunkOutcome::Done(batch) => merged.merge(batch),
            ChunkOutcome::OutOfTime => truncated = true,
            ChunkOutcome::Cancelled => {
                tracing::debug!(completed = merged.completed(), "Simulation cancelled");
                return Err(SimulationError::Cancelled);
            }
        }
    }

    if merged.completed() == 0 {
        return Err(SimulationTimeoutError {
            completed_trials: 0,
            budget: config.time_budget.unwrap_or(Duration::ZERO),
        }
        .into());
    }

    if merged.discarded() > 0 {
        tracing::warn!(
            discarded = merged.discarded(),
            completed = merged.completed(),
            "Discarded trials with invalid draws"
        );
    }
    if truncated {
        tracing::warn!(
            completed = merged.completed(),
            requested = config.iterations,
            "Simulation budget expired, returning partial result"
        );
    }

    let ctx = RunContext {
        target: input.target,
        horizon_months: input.horizon_months,
        volatility: input.market.volatility(&input.allocation),
        expected_return: input.market.expected_return(&input.allocation),
        seed,
        iterations_requested: config.iterations,
        truncated,
    };
    let result = aggregate::summarize(merged, &ctx);

    tracing::debug!(
        iterations = config.iterations,
        seed,
        success = result.success_probability,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Simulation complete"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AssetClass;

    fn input() -> SimulationInput {
        SimulationInput {
            target: 1_000_000.0,
            target_is_nominal: false,
            current_amount: 100_000.0,
            monthly_contribution: 8_000.0,
            horizon_months: 96,
            allocation: Allocation::new()
                .with(AssetClass::Equity, 0.6)
                .with(AssetClass::Debt, 0.4),
            market: MarketAssumptions::default(),
        }
    }

    fn config(seed: u64) -> SimulationConfig {
        SimulationConfig::default()
            .with_iterations(500)
            .with_seed(seed)
    }

    #[test]
    fn test_mix_seed_spreads_indices() {
        assert_ne!(mix_seed(1, 0), mix_seed(1, 1));
        assert_ne!(mix_seed(1, 0), mix_seed(2, 0));
        assert_eq!(mix_seed(5, 7), mix_seed(5, 7));
    }

    #[test]
    fn test_result_independent_of_chunking_and_pool() {
        let progress = SimulationProgress::new();
        let a = simulate(&input(), &config(11), &WorkerPool::sequential(), &progress).unwrap();

        let chunked = SimulationConfig {
            chunk_size: 7,
            ..config(11)
        };
        let pool = WorkerPool::new(Some(4)).unwrap();
        let b = simulate(&input(), &chunked, &pool, &progress).unwrap();

        assert_eq!(a, b);
        assert_eq!(progress.completed(), 500);
    }

    #[test]
    fn test_probabilities_in_range() {
        let result = simulate(
            &input(),
            &config(3),
            &WorkerPool::sequential(),
            &SimulationProgress::new(),
        )
        .unwrap();
        assert!((0.0..=1.0).contains(&result.success_probability));
        assert!(result.partial_success_probability >= result.success_probability);
        assert!(result.terminal.p10 <= result.terminal.p50);
        assert!(result.terminal.p50 <= result.terminal.p90);
        assert_eq!(result.diagnostics.iterations_completed, 500);
        assert_eq!(result.diagnostics.seed, 3);
        assert!(!result.diagnostics.truncated);
    }

    #[test]
    fn test_cancelled_before_start() {
        let progress = SimulationProgress::new();
        progress.cancel();
        let err = simulate(&input(), &config(1), &WorkerPool::sequential(), &progress).unwrap_err();
        assert_eq!(err, SimulationError::Cancelled);
    }

    #[test]
    fn test_zero_budget_times_out() {
        let config = config(1).with_time_budget(Duration::ZERO);
        let err = simulate(
            &input(),
            &config,
            &WorkerPool::sequential(),
            &SimulationProgress::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            SimulationError::Timeout(SimulationTimeoutError {
                completed_trials: 0,
                ..
            })
        ));
    }
}
