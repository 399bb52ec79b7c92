//! Monthly return sampling
//!
//! Annual parameters are scaled to a monthly step: the mean divides by 12 and
//! the volatility by sqrt(12). Each asset class with a positive weight gets its
//! own draw every month; the portfolio return is the weighted sum.

use rand::Rng;
use rand_distr::{Distribution, LogNormal, Normal, StudentT};

use super::config::ReturnModel;
use crate::error::SimulationError;
use crate::model::{Allocation, AssetClass};
use crate::params::MarketAssumptions;

const MONTHS_PER_YEAR: f64 = 12.0;

#[derive(Debug, Clone)]
enum AssetDraw {
    Normal(Normal<f64>),
    /// Gross return `1 + r` is log-normal; the draw subtracts 1
    LogNormal(LogNormal<f64>),
    StudentT {
        mean: f64,
        scale: f64,
        dist: StudentT<f64>,
    },
}

impl AssetDraw {
    fn build(model: ReturnModel, mean: f64, std_dev: f64) -> Result<Self, SimulationError> {
        let invalid = |what: &str, e: &dyn std::fmt::Display| {
            SimulationError::InvalidConfig(format!("{what}: {e}"))
        };
        match model {
            ReturnModel::Normal => Normal::new(mean, std_dev)
                .map(AssetDraw::Normal)
                .map_err(|e| invalid("normal return", &e)),
            ReturnModel::LogNormal => {
                // Match the first two moments of 1 + r
                let gross = 1.0 + mean;
                let sigma_sq = (1.0 + (std_dev / gross).powi(2)).ln();
                let mu = gross.ln() - sigma_sq / 2.0;
                LogNormal::new(mu, sigma_sq.sqrt())
                    .map(AssetDraw::LogNormal)
                    .map_err(|e| invalid("log-normal return", &e))
            }
            ReturnModel::StudentT { df } => StudentT::new(df)
                .map(|dist| AssetDraw::StudentT {
                    mean,
                    // Unit-variance scaling so std_dev keeps its meaning
                    scale: std_dev * ((df - 2.0) / df).sqrt(),
                    dist,
                })
                .map_err(|e| invalid("Student-t return", &e)),
        }
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            AssetDraw::Normal(dist) => dist.sample(rng),
            AssetDraw::LogNormal(dist) => dist.sample(rng) - 1.0,
            AssetDraw::StudentT { mean, scale, dist } => mean + scale * dist.sample(rng),
        }
    }
}

/// Draws the portfolio's monthly return for one allocation
#[derive(Debug, Clone)]
pub struct ReturnSampler {
    legs: Vec<(f64, AssetDraw)>,
}

impl ReturnSampler {
    pub fn new(
        market: &MarketAssumptions,
        allocation: &Allocation,
        model: ReturnModel,
    ) -> Result<Self, SimulationError> {
        let legs = allocation
            .iter()
            .filter(|(_, weight)| *weight > 0.0)
            .map(|(asset, weight)| {
                let (mean, std_dev) = monthly_moments(market, asset);
                AssetDraw::build(model, mean, std_dev).map(|draw| (weight, draw))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { legs })
    }

    /// One month's weighted return, or `None` when any asset draw is
    /// non-finite or wipes the asset out (at or below -100%)
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<f64> {
        let mut total = 0.0;
        for (weight, draw) in &self.legs {
            let r = draw.sample(rng);
            if !r.is_finite() || r <= -1.0 {
                return None;
            }
            total += weight * r;
        }
        Some(total)
    }
}

fn monthly_moments(market: &MarketAssumptions, asset: AssetClass) -> (f64, f64) {
    (
        market.mean_return(asset) / MONTHS_PER_YEAR,
        market.asset_volatility(asset) / MONTHS_PER_YEAR.sqrt(),
    )
}
