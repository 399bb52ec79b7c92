//! Batch evaluation of a profile's goals.
//!
//! One task per goal runs on the engine's worker pool. Per-goal failures are
//! collected next to the successes and never abort siblings. Cancellation is
//! checked before each goal starts.

use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::engine::GoalProbabilityEngine;
use crate::error::GoalError;
use crate::model::{Goal, GoalId, ProbabilityReport, Profile};
use crate::progress::{CancellationToken, SimulationProgress};
use crate::simulation::SimulationConfig;

/// Read-only access to stored goals
pub trait GoalRepository: Send + Sync {
    fn goal(&self, id: GoalId) -> Option<Goal>;
}

/// Goals held in memory, keyed by id
#[derive(Debug, Clone, Default)]
pub struct InMemoryGoals {
    goals: FxHashMap<GoalId, Goal>,
}

impl InMemoryGoals {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, goal: Goal) {
        self.goals.insert(goal.id, goal);
    }

    /// Ids in ascending order
    #[must_use]
    pub fn ids(&self) -> Vec<GoalId> {
        let mut ids: Vec<GoalId> = self.goals.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.goals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}

impl FromIterator<Goal> for InMemoryGoals {
    fn from_iter<I: IntoIterator<Item = Goal>>(iter: I) -> Self {
        Self {
            goals: iter.into_iter().map(|goal| (goal.id, goal)).collect(),
        }
    }
}

impl GoalRepository for InMemoryGoals {
    fn goal(&self, id: GoalId) -> Option<Goal> {
        self.goals.get(&id).cloned()
    }
}

/// Per-goal results and errors of one batch
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub results: FxHashMap<GoalId, ProbabilityReport>,
    pub errors: FxHashMap<GoalId, GoalError>,
}

impl BatchOutcome {
    /// Every requested goal produced a result
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len() + self.errors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn run_batch(
    engine: &GoalProbabilityEngine,
    repository: &dyn GoalRepository,
    goal_ids: &[GoalId],
    profile: &Profile,
    config: &SimulationConfig,
    force_recalculate: bool,
    token: &CancellationToken,
) -> BatchOutcome {
    let started = Instant::now();
    let mut seen = FxHashSet::default();
    let ids: Vec<GoalId> = goal_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    tracing::info!(
        profile = %profile.id,
        goals = ids.len(),
        iterations = config.iterations,
        "Batch evaluation started"
    );

    let evaluated = engine.pool().map(ids, |goal_id| {
        if token.is_cancelled() {
            return (goal_id, Err(GoalError::Cancelled(goal_id)));
        }
        let Some(goal) = repository.goal(goal_id) else {
            return (goal_id, Err(GoalError::NotFound(goal_id)));
        };
        let progress = SimulationProgress::with_token(token.clone());
        let report = engine.evaluate(&goal, profile, config, force_recalculate, &progress);
        (goal_id, report)
    });

    let mut outcome = BatchOutcome::default();
    for (goal_id, report) in evaluated {
        match report {
            Ok(report) => {
                outcome.results.insert(goal_id, report);
            }
            Err(err) => {
                tracing::warn!(%goal_id, error = %err, "Goal evaluation failed");
                outcome.errors.insert(goal_id, err);
            }
        }
    }

    tracing::info!(
        profile = %profile.id,
        succeeded = outcome.results.len(),
        failed = outcome.errors.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Batch evaluation finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GoalKind;
    use jiff::civil::date;

    #[test]
    fn test_in_memory_goals() {
        let goals: InMemoryGoals = [3, 1, 2]
            .into_iter()
            .map(|id| Goal::new(GoalId(id), GoalKind::Custom {}, date(2030, 1, 1)))
            .collect();
        assert_eq!(goals.len(), 3);
        assert_eq!(goals.ids(), vec![GoalId(1), GoalId(2), GoalId(3)]);
        assert!(goals.goal(GoalId(2)).is_some());
        assert!(goals.goal(GoalId(9)).is_none());
    }
}
