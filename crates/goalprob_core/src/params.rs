//! Named scalar parameters (returns, volatilities, inflation, category defaults)
//!
//! Figures come from an external [`ParameterProvider`]. Every lookup goes
//! through [`Parameters`], which falls back to [`ParamKey::default_value`] when
//! a value is absent or unusable. The fallback table in that function is the
//! only place these numbers are written down.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHasher};
use serde::{Deserialize, Serialize};

use crate::model::{Allocation, AssetClass};

/// Source of named parameters
pub trait ParameterProvider: Send + Sync {
    fn get_parameter(&self, name: &str) -> Option<f64>;
}

/// In-memory parameter table, deserializable from a flat name → value map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticParameters(FxHashMap<String, f64>);

impl StaticParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl ParameterProvider for StaticParameters {
    fn get_parameter(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }
}

/// Every parameter the engine reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKey {
    /// Annual expected return of an asset class
    Return(AssetClass),
    /// Annual volatility of an asset class
    Volatility(AssetClass),
    Inflation,
    EducationInflation,
    RetirementWithdrawalRate,
    EarlyRetirementWithdrawalRate,
    EmergencyFundMonths,
    HomeDownPayment,
    VehicleDownPayment,
    InsuranceYears,
    CharitableGivingYears,
}

impl ParamKey {
    const SCALARS: [ParamKey; 9] = [
        ParamKey::Inflation,
        ParamKey::EducationInflation,
        ParamKey::RetirementWithdrawalRate,
        ParamKey::EarlyRetirementWithdrawalRate,
        ParamKey::EmergencyFundMonths,
        ParamKey::HomeDownPayment,
        ParamKey::VehicleDownPayment,
        ParamKey::InsuranceYears,
        ParamKey::CharitableGivingYears,
    ];

    /// Every key, in a fixed order
    pub fn all() -> impl Iterator<Item = ParamKey> {
        AssetClass::ALL
            .into_iter()
            .flat_map(|asset| [ParamKey::Return(asset), ParamKey::Volatility(asset)])
            .chain(Self::SCALARS)
    }

    /// Name used with [`ParameterProvider::get_parameter`]
    #[must_use]
    pub fn name(self) -> String {
        match self {
            ParamKey::Return(asset) => format!("return.{}", asset.name()),
            ParamKey::Volatility(asset) => format!("volatility.{}", asset.name()),
            ParamKey::Inflation => "inflation".to_string(),
            ParamKey::EducationInflation => "education.inflation_rate".to_string(),
            ParamKey::RetirementWithdrawalRate => "retirement.withdrawal_rate".to_string(),
            ParamKey::EarlyRetirementWithdrawalRate => {
                "early_retirement.withdrawal_rate".to_string()
            }
            ParamKey::EmergencyFundMonths => "emergency_fund.months".to_string(),
            ParamKey::HomeDownPayment => "home_purchase.down_payment_percent".to_string(),
            ParamKey::VehicleDownPayment => "vehicle.down_payment_percent".to_string(),
            ParamKey::InsuranceYears => "insurance.years".to_string(),
            ParamKey::CharitableGivingYears => "charitable_giving.years".to_string(),
        }
    }

    /// Fallback table used when the provider has no usable value.
    ///
    /// | name | default |
    /// |---|---|
    /// | `return.equity` / `volatility.equity` | 0.12 / 0.18 |
    /// | `return.debt` / `volatility.debt` | 0.07 / 0.05 |
    /// | `return.gold` / `volatility.gold` | 0.08 / 0.15 |
    /// | `return.cash` / `volatility.cash` | 0.04 / 0.01 |
    /// | `return.real_estate` / `volatility.real_estate` | 0.08 / 0.12 |
    /// | `inflation` | 0.06 |
    /// | `education.inflation_rate` | 0.10 |
    /// | `retirement.withdrawal_rate` | 0.04 |
    /// | `early_retirement.withdrawal_rate` | 0.035 |
    /// | `emergency_fund.months` | 6 |
    /// | `home_purchase.down_payment_percent` | 0.20 |
    /// | `vehicle.down_payment_percent` | 0.20 |
    /// | `insurance.years` | 1 |
    /// | `charitable_giving.years` | 1 |
    #[must_use]
    pub const fn default_value(self) -> f64 {
        match self {
            ParamKey::Return(asset) => match asset {
                AssetClass::Equity => 0.12,
                AssetClass::Debt => 0.07,
                AssetClass::Gold => 0.08,
                AssetClass::Cash => 0.04,
                AssetClass::RealEstate => 0.08,
            },
            ParamKey::Volatility(asset) => match asset {
                AssetClass::Equity => 0.18,
                AssetClass::Debt => 0.05,
                AssetClass::Gold => 0.15,
                AssetClass::Cash => 0.01,
                AssetClass::RealEstate => 0.12,
            },
            ParamKey::Inflation => 0.06,
            ParamKey::EducationInflation => 0.10,
            ParamKey::RetirementWithdrawalRate => 0.04,
            ParamKey::EarlyRetirementWithdrawalRate => 0.035,
            ParamKey::EmergencyFundMonths => 6.0,
            ParamKey::HomeDownPayment | ParamKey::VehicleDownPayment => 0.20,
            ParamKey::InsuranceYears | ParamKey::CharitableGivingYears => 1.0,
        }
    }

    /// Whether a supplied value is usable for this key
    fn accepts(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            ParamKey::Return(_) | ParamKey::Inflation | ParamKey::EducationInflation => {
                value > -1.0
            }
            ParamKey::Volatility(_) => value >= 0.0,
            ParamKey::RetirementWithdrawalRate
            | ParamKey::EarlyRetirementWithdrawalRate
            | ParamKey::HomeDownPayment
            | ParamKey::VehicleDownPayment => value > 0.0 && value <= 1.0,
            ParamKey::EmergencyFundMonths
            | ParamKey::InsuranceYears
            | ParamKey::CharitableGivingYears => value >= 0.0,
        }
    }
}

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Shared handle to a provider, failing closed to the default table
#[derive(Clone)]
pub struct Parameters {
    provider: Arc<dyn ParameterProvider>,
}

impl Parameters {
    pub fn new(provider: impl ParameterProvider + 'static) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    pub fn from_arc(provider: Arc<dyn ParameterProvider>) -> Self {
        Self { provider }
    }

    /// Parameters that always resolve to the default table
    #[must_use]
    pub fn defaults() -> Self {
        Self::new(StaticParameters::new())
    }

    /// Look up a parameter, substituting the documented default when absent
    /// or unusable
    #[must_use]
    pub fn get(&self, key: ParamKey) -> f64 {
        let name = key.name();
        match self.provider.get_parameter(&name) {
            Some(value) if key.accepts(value) => value,
            Some(value) => {
                let default = key.default_value();
                tracing::warn!(
                    parameter = %name,
                    value,
                    default,
                    "Unusable parameter value, using default"
                );
                default
            }
            None => {
                let default = key.default_value();
                tracing::debug!(parameter = %name, default, "Parameter absent, using default");
                default
            }
        }
    }

    /// Hash of every resolved value. Results computed under different
    /// figures never share a cache key.
    #[must_use]
    pub fn digest(&self) -> u64 {
        let mut h = FxHasher::default();
        for key in ParamKey::all() {
            self.get(key).to_bits().hash(&mut h);
        }
        h.finish()
    }

    /// Snapshot of the market figures used by the calculators and simulation
    #[must_use]
    pub fn market(&self) -> MarketAssumptions {
        let mut mean = [0.0; AssetClass::ALL.len()];
        let mut volatility = [0.0; AssetClass::ALL.len()];
        for asset in AssetClass::ALL {
            mean[asset.index()] = self.get(ParamKey::Return(asset));
            volatility[asset.index()] = self.get(ParamKey::Volatility(asset));
        }
        MarketAssumptions {
            mean,
            volatility,
            inflation: self.get(ParamKey::Inflation),
        }
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self::defaults()
    }
}

impl fmt::Debug for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameters").finish_non_exhaustive()
    }
}

/// Annual return and volatility per asset class, plus general inflation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketAssumptions {
    pub mean: [f64; AssetClass::ALL.len()],
    pub volatility: [f64; AssetClass::ALL.len()],
    pub inflation: f64,
}

impl MarketAssumptions {
    #[must_use]
    pub fn mean_return(&self, asset: AssetClass) -> f64 {
        self.mean[asset.index()]
    }

    #[must_use]
    pub fn asset_volatility(&self, asset: AssetClass) -> f64 {
        self.volatility[asset.index()]
    }

    /// Weighted annual expected return of an allocation
    #[must_use]
    pub fn expected_return(&self, allocation: &Allocation) -> f64 {
        allocation
            .iter()
            .map(|(asset, weight)| weight * self.mean_return(asset))
            .sum()
    }

    /// Annual volatility of an allocation, treating asset classes as
    /// uncorrelated
    #[must_use]
    pub fn volatility(&self, allocation: &Allocation) -> f64 {
        allocation
            .iter()
            .map(|(asset, weight)| (weight * self.asset_volatility(asset)).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

impl Default for MarketAssumptions {
    fn default() -> Self {
        Parameters::defaults().market()
    }
}
