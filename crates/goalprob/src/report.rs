//! Plain-text report of a batch evaluation

use std::fmt::{self, Display};

use goalprob_core::calculator::GoalPlan;
use goalprob_core::model::{Goal, GoalId, ProbabilityReport};
use goalprob_core::{BatchOutcome, CacheStats, GoalError};
use rustc_hash::FxHashMap;

use crate::util::{format_duration_months, format_inr, format_inr_compact, format_percentage};

/// Everything printed after a run: one block per goal, then cache counters
pub struct Report<'a> {
    pub goals: &'a [Goal],
    pub outcome: &'a BatchOutcome,
    pub plans: &'a FxHashMap<GoalId, GoalPlan>,
    pub cache: CacheStats,
}

fn write_probability(f: &mut fmt::Formatter<'_>, report: &ProbabilityReport) -> fmt::Result {
    let result = &report.result;
    writeln!(
        f,
        "  target            {} over {} months",
        format_inr(result.target_amount),
        result.horizon_months
    )?;
    writeln!(
        f,
        "  success           {} (partial {}){}",
        format_percentage(result.success_probability),
        format_percentage(result.partial_success_probability),
        if report.from_cache { " [cached]" } else { "" }
    )?;
    writeln!(
        f,
        "  median outcome    {} (p10 {}, p90 {})",
        format_inr_compact(result.terminal.p50),
        format_inr_compact(result.terminal.p10),
        format_inr_compact(result.terminal.p90)
    )?;
    writeln!(
        f,
        "  time to goal      {}",
        format_duration_months(result.time_to_goal.median_months)
    )?;
    if result.risk.shortfall_risk > 0.0 {
        writeln!(
            f,
            "  expected shortfall {}",
            format_inr_compact(result.risk.expected_shortfall)
        )?;
    }

    let diagnostics = &result.diagnostics;
    if diagnostics.truncated {
        writeln!(
            f,
            "  note: time budget hit after {} of {} trials",
            diagnostics.iterations_completed, diagnostics.iterations_requested
        )?;
    }
    if diagnostics.low_confidence {
        writeln!(
            f,
            "  note: low confidence ({} of {} trials discarded)",
            diagnostics.discarded_trials, diagnostics.iterations_completed
        )?;
    }
    Ok(())
}

fn write_plan(f: &mut fmt::Formatter<'_>, plan: &GoalPlan) -> fmt::Result {
    writeln!(
        f,
        "  required saving   {} / month",
        format_inr(plan.required_monthly_contribution)
    )?;
    writeln!(f, "  suggested mix     {}", plan.recommended_allocation)
}

impl Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for goal in self.goals {
            write!(f, "{}", goal.id)?;
            if !goal.title.is_empty() {
                write!(f, " {}", goal.title)?;
            }
            writeln!(f, " ({})", goal.category())?;

            match (
                self.outcome.results.get(&goal.id),
                self.outcome.errors.get(&goal.id),
            ) {
                (Some(report), _) => write_probability(f, report)?,
                (None, Some(GoalError::Cancelled(_))) => {
                    writeln!(f, "  probability unavailable: cancelled")?
                }
                (None, Some(err)) => writeln!(f, "  probability unavailable: {err}")?,
                (None, None) => writeln!(f, "  probability unavailable")?,
            }
            if let Some(plan) = self.plans.get(&goal.id) {
                write_plan(f, plan)?;
            }
            writeln!(f)?;
        }

        writeln!(
            f,
            "cache: {} entries, {} hits, {} misses, {} evictions (hit rate {})",
            self.cache.size,
            self.cache.hits,
            self.cache.misses,
            self.cache.evictions,
            format_percentage(self.cache.hit_rate())
        )
    }
}
