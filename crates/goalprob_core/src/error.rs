use std::fmt;
use std::time::Duration;

use crate::cache::Fingerprint;
use crate::model::{AssetClass, GoalId};

/// Why a goal record was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidGoalReason {
    NegativeAmount { field: &'static str, value: f64 },
    NonFiniteAmount { field: &'static str },
    /// A rate or fraction outside its meaningful range
    OutOfRange { field: &'static str, value: f64 },
    /// A category input with no default was absent and no explicit target was set
    MissingField { field: &'static str },
    NonFiniteWeight(AssetClass),
    NegativeWeight { asset: AssetClass, weight: f64 },
    /// Every allocation weight is zero (or the allocation is empty)
    DegenerateAllocation,
    AllocationNotNormalized { total: f64 },
    /// A simulation was requested with zero trials
    ZeroIterations,
}

impl fmt::Display for InvalidGoalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidGoalReason::NegativeAmount { field, value } => {
                write!(f, "{field} must not be negative (got {value})")
            }
            InvalidGoalReason::NonFiniteAmount { field } => {
                write!(f, "{field} must be a finite number")
            }
            InvalidGoalReason::OutOfRange { field, value } => {
                write!(f, "{field} is out of range (got {value})")
            }
            InvalidGoalReason::MissingField { field } => {
                write!(f, "required field {field} is missing")
            }
            InvalidGoalReason::NonFiniteWeight(asset) => {
                write!(f, "allocation weight for {asset} is not finite")
            }
            InvalidGoalReason::NegativeWeight { asset, weight } => {
                write!(f, "allocation weight for {asset} is negative ({weight})")
            }
            InvalidGoalReason::DegenerateAllocation => {
                write!(f, "allocation has no positive weights")
            }
            InvalidGoalReason::AllocationNotNormalized { total } => {
                write!(f, "allocation weights sum to {total}, expected 1.0")
            }
            InvalidGoalReason::ZeroIterations => {
                write!(f, "simulation requires at least one iteration")
            }
        }
    }
}

/// A malformed goal. Not retried; surfaced to the caller with the goal id.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidGoalError {
    pub goal_id: GoalId,
    pub reason: InvalidGoalReason,
}

impl InvalidGoalError {
    #[must_use]
    pub fn new(goal_id: GoalId, reason: InvalidGoalReason) -> Self {
        Self { goal_id, reason }
    }
}

impl fmt::Display for InvalidGoalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.goal_id, self.reason)
    }
}

impl std::error::Error for InvalidGoalError {}

/// A malformed profile record
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidProfileError {
    NegativeField { field: &'static str, value: f64 },
    NonFiniteField { field: &'static str },
    AgeOutOfRange(u8),
}

impl fmt::Display for InvalidProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidProfileError::NegativeField { field, value } => {
                write!(f, "invalid profile: {field} must not be negative (got {value})")
            }
            InvalidProfileError::NonFiniteField { field } => {
                write!(f, "invalid profile: {field} must be a finite number")
            }
            InvalidProfileError::AgeOutOfRange(age) => {
                write!(f, "invalid profile: age {age} is out of range")
            }
        }
    }
}

impl std::error::Error for InvalidProfileError {}

/// The wall-clock budget ran out before any trial chunk finished
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationTimeoutError {
    pub completed_trials: usize,
    pub budget: Duration,
}

impl fmt::Display for SimulationTimeoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "simulation exceeded its {:?} budget after {} trials",
            self.budget, self.completed_trials
        )
    }
}

impl std::error::Error for SimulationTimeoutError {}

/// Errors raised by the simulation core itself
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    InvalidConfig(String),
    Timeout(SimulationTimeoutError),
    /// Cancelled through a cancellation token
    Cancelled,
    /// The worker thread pool could not be built
    WorkerPool(String),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::InvalidConfig(msg) => write!(f, "invalid simulation config: {msg}"),
            SimulationError::Timeout(e) => write!(f, "{e}"),
            SimulationError::Cancelled => write!(f, "simulation cancelled"),
            SimulationError::WorkerPool(msg) => write!(f, "worker pool error: {msg}"),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::Timeout(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SimulationTimeoutError> for SimulationError {
    fn from(e: SimulationTimeoutError) -> Self {
        SimulationError::Timeout(e)
    }
}

/// An internal cache invariant was violated. Never surfaced to callers: the
/// entry is evicted and the result recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheCorruptionError {
    pub fingerprint: Option<Fingerprint>,
    pub reason: String,
}

impl fmt::Display for CacheCorruptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.fingerprint {
            Some(fp) => write!(f, "cache entry {fp} corrupted: {}", self.reason),
            None => write!(f, "cache corrupted: {}", self.reason),
        }
    }
}

impl std::error::Error for CacheCorruptionError {}

/// Per-goal failure reported by the engine and the batch coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum GoalError {
    InvalidGoal(InvalidGoalError),
    InvalidProfile(InvalidProfileError),
    Simulation {
        goal_id: GoalId,
        source: SimulationError,
    },
    NotFound(GoalId),
    /// The batch was cancelled before this goal started
    Cancelled(GoalId),
}

impl GoalError {
    /// The goal the failure belongs to, when it is goal-specific
    #[must_use]
    pub fn goal_id(&self) -> Option<GoalId> {
        match self {
            GoalError::InvalidGoal(e) => Some(e.goal_id),
            GoalError::InvalidProfile(_) => None,
            GoalError::Simulation { goal_id, .. }
            | GoalError::NotFound(goal_id)
            | GoalError::Cancelled(goal_id) => Some(*goal_id),
        }
    }

    pub(crate) fn simulation(goal_id: GoalId, source: SimulationError) -> Self {
        match source {
            SimulationError::Cancelled => GoalError::Cancelled(goal_id),
            source => GoalError::Simulation { goal_id, source },
        }
    }
}

impl fmt::Display for GoalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GoalError::InvalidGoal(e) => write!(f, "{e}"),
            GoalError::InvalidProfile(e) => write!(f, "{e}"),
            GoalError::Simulation { goal_id, source } => {
                write!(f, "simulation failed for {goal_id}: {source}")
            }
            GoalError::NotFound(goal_id) => write!(f, "{goal_id} not found"),
            GoalError::Cancelled(goal_id) => write!(f, "evaluation of {goal_id} cancelled"),
        }
    }
}

impl std::error::Error for GoalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GoalError::InvalidGoal(e) => Some(e),
            GoalError::InvalidProfile(e) => Some(e),
            GoalError::Simulation { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<InvalidGoalError> for GoalError {
    fn from(e: InvalidGoalError) -> Self {
        GoalError::InvalidGoal(e)
    }
}

impl From<InvalidProfileError> for GoalError {
    fn from(e: InvalidProfileError) -> Self {
        GoalError::InvalidProfile(e)
    }
}
