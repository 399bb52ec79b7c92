//! Command-line front end for the goal probability engine
//!
//! Loads a YAML plan (a profile and its goals), evaluates every goal with
//! [`goalprob_core::GoalProbabilityEngine`] and renders a text report.

pub mod logging;
pub mod plan;
pub mod report;
pub mod util;

pub use logging::init_logging;
pub use plan::{PlanError, PlanFile, load_parameters};
pub use report::Report;
