//! Asset classes and portfolio allocations

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvalidGoalReason;

/// Weights may drift from 1.0 by this much before an allocation is rejected.
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// Broad asset class a goal's savings can be invested in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Debt,
    Gold,
    Cash,
    RealEstate,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Equity,
        AssetClass::Debt,
        AssetClass::Gold,
        AssetClass::Cash,
        AssetClass::RealEstate,
    ];

    /// Position of this class in per-asset arrays
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            AssetClass::Equity => "equity",
            AssetClass::Debt => "debt",
            AssetClass::Gold => "gold",
            AssetClass::Cash => "cash",
            AssetClass::RealEstate => "real_estate",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mapping of asset class to portfolio weight.
///
/// Stored ordered by asset class so that iteration (and therefore hashing and
/// random draw order) is stable across runs.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation(BTreeMap<AssetClass, f64>);

impl Allocation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (asset, weight) pairs. Repeated assets accumulate.
    pub fn from_weights<I>(weights: I) -> Self
    where
        I: IntoIterator<Item = (AssetClass, f64)>,
    {
        let mut map = BTreeMap::new();
        for (asset, weight) in weights {
            *map.entry(asset).or_insert(0.0) += weight;
        }
        Self(map)
    }

    /// Builder-style setter, replacing any existing weight for `asset`
    #[must_use]
    pub fn with(mut self, asset: AssetClass, weight: f64) -> Self {
        self.0.insert(asset, weight);
        self
    }

    #[must_use]
    pub fn weight(&self, asset: AssetClass) -> f64 {
        self.0.get(&asset).copied().unwrap_or(0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AssetClass, f64)> + '_ {
        self.0.iter().map(|(asset, weight)| (*asset, *weight))
    }

    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate the weights and rescale them to sum to exactly 1.0.
    ///
    /// Zero-weight entries are dropped. Fails for negative or non-finite
    /// weights, an all-zero allocation, or a total outside
    /// 1.0 ± [`WEIGHT_TOLERANCE`].
    pub fn normalized(&self) -> Result<Self, InvalidGoalReason> {
        for (asset, weight) in self.iter() {
            if !weight.is_finite() {
                return Err(InvalidGoalReason::NonFiniteWeight(asset));
            }
            if weight < 0.0 {
                return Err(InvalidGoalReason::NegativeWeight { asset, weight });
            }
        }

        let total = self.total();
        if total <= 0.0 {
            return Err(InvalidGoalReason::DegenerateAllocation);
        }
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(InvalidGoalReason::AllocationNotNormalized { total });
        }

        Ok(Self(
            self.0
                .iter()
                .filter(|(_, weight)| **weight > 0.0)
                .map(|(asset, weight)| (*asset, weight / total))
                .collect(),
        ))
    }
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (asset, weight) in self.iter() {
            if !first {
                f.write_str(", ")?;
            }
            write!(f, "{asset} {:.0}%", weight * 100.0)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_within_tolerance() {
        let allocation = Allocation::new()
            .with(AssetClass::Equity, 0.603)
            .with(AssetClass::Debt, 0.4);
        let normalized = allocation.normalized().unwrap();
        assert!((normalized.total() - 1.0).abs() < 1e-12);
        assert!(normalized.weight(AssetClass::Equity) > normalized.weight(AssetClass::Debt));
    }

    #[test]
    fn test_normalize_drops_zero_weights() {
        let allocation = Allocation::new()
            .with(AssetClass::Equity, 1.0)
            .with(AssetClass::Gold, 0.0);
        let normalized = allocation.normalized().unwrap();
        assert_eq!(normalized.iter().count(), 1);
    }

    #[test]
    fn test_all_zero_is_degenerate() {
        let allocation = Allocation::new()
            .with(AssetClass::Equity, 0.0)
            .with(AssetClass::Debt, 0.0);
        assert_eq!(
            allocation.normalized(),
            Err(InvalidGoalReason::DegenerateAllocation)
        );
        assert_eq!(
            Allocation::new().normalized(),
            Err(InvalidGoalReason::DegenerateAllocation)
        );
    }

    #[test]
    fn test_rejects_negative_and_unnormalized() {
        let negative = Allocation::new()
            .with(AssetClass::Equity, 1.2)
            .with(AssetClass::Cash, -0.2);
        assert!(matches!(
            negative.normalized(),
            Err(InvalidGoalReason::NegativeWeight {
                asset: AssetClass::Cash,
                ..
            })
        ));

        let percentages = Allocation::new()
            .with(AssetClass::Equity, 60.0)
            .with(AssetClass::Debt, 40.0);
        assert!(matches!(
            percentages.normalized(),
            Err(InvalidGoalReason::AllocationNotNormalized { .. })
        ));
    }

    #[test]
    fn test_serde_uses_asset_names() {
        let allocation = Allocation::new()
            .with(AssetClass::RealEstate, 0.25)
            .with(AssetClass::Equity, 0.75);
        let json = serde_json::to_string(&allocation).unwrap();
        assert_eq!(json, r#"{"equity":0.75,"real_estate":0.25}"#);
        let back: Allocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, allocation);
    }
}
