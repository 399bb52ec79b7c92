use std::path::PathBuf;

use clap::Parser;
use goalprob::{PlanFile, Report, init_logging, load_parameters};
use goalprob_core::{EngineConfig, GoalProbabilityEngine, Parameters, SimulationConfig};
use rustc_hash::FxHashMap;

#[derive(Parser, Debug)]
#[command(name = "goalprob")]
#[command(about = "Estimate the probability of reaching financial goals")]
struct Args {
    /// Plan file (YAML) with a profile and its goals
    plan: PathBuf,

    /// Monte Carlo trials per goal (overrides the plan file)
    #[arg(short = 'n', long)]
    iterations: Option<usize>,

    /// Use the 10,000-trial preset meant for final recommendations
    #[arg(long, conflicts_with = "iterations")]
    thorough: bool,

    /// Fixed base seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Worker thread limit (default: one per core)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Parameter file (YAML or JSON) replacing the plan's parameters
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Directory for goalprob.log (default: ~/.goalprob/)
    #[arg(long, conflicts_with = "log_stderr")]
    log_dir: Option<PathBuf>,

    /// Log to stderr instead of a file
    #[arg(long)]
    log_stderr: bool,
}

fn default_log_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".goalprob")
}

fn simulation_config(args: &Args, plan: &PlanFile) -> SimulationConfig {
    let mut config = if args.thorough {
        SimulationConfig {
            iterations: SimulationConfig::final_recommendation().iterations,
            ..plan.simulation.clone().unwrap_or_default()
        }
    } else {
        plan.simulation.clone().unwrap_or_default()
    };
    if let Some(iterations) = args.iterations {
        config.iterations = iterations;
    }
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }
    config
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let log_dir = (!args.log_stderr).then(|| args.log_dir.clone().unwrap_or_else(default_log_dir));
    init_logging(log_dir.as_deref(), &args.log_level)?;

    let plan = PlanFile::load(&args.plan)?;
    let parameters = match &args.params {
        Some(path) => load_parameters(path)?,
        None => plan.parameters.clone().unwrap_or_default(),
    };

    let config = EngineConfig {
        simulation: simulation_config(&args, &plan),
        worker_limit: args.workers,
        ..Default::default()
    };
    let engine = GoalProbabilityEngine::new(Parameters::new(parameters), config)?;

    let outcome = engine.calculate_goal_probabilities(
        &plan.repository(),
        &plan.goal_ids(),
        &plan.profile,
        None,
        false,
    );

    let mut plans = FxHashMap::default();
    for goal in &plan.goals {
        match engine.plan_goal(goal, &plan.profile, None) {
            Ok(goal_plan) => {
                plans.insert(goal.id, goal_plan);
            }
            Err(err) => tracing::warn!(goal_id = %goal.id, %err, "No calculator plan"),
        }
    }

    print!(
        "{}",
        Report {
            goals: &plan.goals,
            outcome: &outcome,
            plans: &plans,
            cache: engine.get_cache_stats(),
        }
    );

    tracing::info!(
        evaluated = outcome.results.len(),
        failed = outcome.errors.len(),
        "Run finished"
    );
    Ok(())
}
