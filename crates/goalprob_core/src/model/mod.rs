mod allocation;
mod goal;
mod ids;
mod profile;
mod results;

pub use allocation::{Allocation, AssetClass, WEIGHT_TOLERANCE};
pub use goal::{Flexibility, Goal, GoalCategory, GoalKind, Importance};
pub use ids::{GoalId, ProfileId};
pub use profile::{Profile, RiskTolerance};
pub use results::{
    ProbabilityReport, ProbabilityResult, RiskMetrics, RunDiagnostics, TerminalPercentiles,
    TimeToGoal,
};
