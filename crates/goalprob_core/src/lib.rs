//! Goal probability simulation and caching engine
//!
//! For a personal financial goal this crate estimates the probability that a
//! savings plan reaches its target amount by its target date under uncertain
//! market returns:
//! - Category calculators size the target, the required monthly saving and a
//!   recommended asset mix for 13 goal categories
//! - A Monte Carlo core projects month-by-month portfolio growth across many
//!   independent trials
//! - A fingerprint-keyed cache makes repeated evaluation cheap
//! - A batch coordinator evaluates all of a profile's goals concurrently with
//!   per-goal failure isolation
//!
//! ```ignore
//! use goalprob_core::{EngineConfig, GoalProbabilityEngine, Parameters};
//!
//! let engine = GoalProbabilityEngine::new(Parameters::defaults(), EngineConfig::default())?;
//! let report = engine.calculate_goal_probability(&goal, &profile, Some(1_000), false)?;
//! println!("{:.1}%", report.success_probability() * 100.0);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod batch;
pub mod cache;
pub mod calculator;
pub mod date_math;
pub mod engine;
pub mod error;
pub mod executor;
pub mod params;
pub mod progress;
pub mod simulation;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use batch::{BatchOutcome, GoalRepository, InMemoryGoals};
pub use cache::{CacheConfig, CacheStats, Fingerprint, ProbabilityCache};
pub use calculator::{GoalCalculator, GoalPlan};
pub use engine::{EngineConfig, GoalProbabilityEngine};
pub use error::{
    CacheCorruptionError, GoalError, InvalidGoalError, InvalidGoalReason, InvalidProfileError,
    SimulationError, SimulationTimeoutError,
};
pub use params::{MarketAssumptions, ParamKey, ParameterProvider, Parameters, StaticParameters};
pub use progress::{CancellationToken, SimulationProgress};
pub use simulation::{ReturnModel, SeedPolicy, SimulationConfig};
