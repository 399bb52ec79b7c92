//! Plan files: one profile, its goals and optional engine settings
//!
//! ```yaml
//! profile:
//!   id: 1
//!   age: 34
//!   monthly_income: 150000
//!   monthly_expenses: 50000
//! goals:
//!   - id: 1
//!     title: Rainy day fund
//!     category: emergency_fund
//!     target_date: 2026-01-01
//!     monthly_contribution: 27000
//! parameters:
//!   return.equity: 0.11
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use goalprob_core::model::{Goal, GoalId, Profile};
use goalprob_core::{InMemoryGoals, SimulationConfig, StaticParameters};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Error types for plan and parameter file loading
#[derive(Debug)]
pub enum PlanError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, message: String },
    DuplicateGoal(GoalId),
    Empty,
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            PlanError::Parse { path, message } => {
                write!(f, "failed to parse {}: {message}", path.display())
            }
            PlanError::DuplicateGoal(id) => write!(f, "{id} appears more than once"),
            PlanError::Empty => write!(f, "plan has no goals"),
        }
    }
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanFile {
    pub profile: Profile,
    pub goals: Vec<Goal>,
    /// Overrides for the default market and planning parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<StaticParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulation: Option<SimulationConfig>,
}

impl PlanFile {
    pub fn from_yaml(content: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(content)
    }

    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    /// Read and check a plan. Goal ids must be unique within the file.
    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let content = read(path)?;
        let plan = Self::from_yaml(&content).map_err(|e| PlanError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        plan.check()?;
        tracing::info!(
            path = %path.display(),
            goals = plan.goals.len(),
            "Loaded plan"
        );
        Ok(plan)
    }

    fn check(&self) -> Result<(), PlanError> {
        if self.goals.is_empty() {
            return Err(PlanError::Empty);
        }
        let mut seen = FxHashSet::default();
        for goal in &self.goals {
            if !seen.insert(goal.id) {
                return Err(PlanError::DuplicateGoal(goal.id));
            }
        }
        Ok(())
    }

    /// Goal ids in file order
    pub fn goal_ids(&self) -> Vec<GoalId> {
        self.goals.iter().map(|goal| goal.id).collect()
    }

    pub fn repository(&self) -> InMemoryGoals {
        self.goals.iter().cloned().collect()
    }
}

/// Load a flat `name: value` parameter file, JSON when the extension says
/// so and YAML otherwise
pub fn load_parameters(path: &Path) -> Result<StaticParameters, PlanError> {
    let content = read(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed: Result<StaticParameters, String> = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_saphyr::from_str(&content).map_err(|e| e.to_string())
    };
    let parameters = parsed.map_err(|message| PlanError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    tracing::info!(
        path = %path.display(),
        count = parameters.len(),
        "Loaded parameters"
    );
    Ok(parameters)
}

fn read(path: &Path) -> Result<String, PlanError> {
    fs::read_to_string(path).map_err(|source| PlanError::Io {
        path: path.to_path_buf(),
        source,
    })
}
