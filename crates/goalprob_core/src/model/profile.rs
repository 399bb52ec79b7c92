//! Household profile as read from the persistence layer

use serde::{Deserialize, Serialize};

use super::ids::ProfileId;
use crate::error::InvalidProfileError;

const MAX_AGE: u8 = 120;

/// Self-declared appetite for market risk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    /// Shift applied to the glide-path equity share
    #[must_use]
    pub const fn equity_tilt(self) -> f64 {
        match self {
            RiskTolerance::Conservative => -0.15,
            RiskTolerance::Moderate => 0.0,
            RiskTolerance::Aggressive => 0.10,
        }
    }
}

/// Demographic and cash-flow facts used to size goals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub age: u8,
    #[serde(default)]
    pub monthly_income: f64,
    #[serde(default)]
    pub monthly_expenses: f64,
    #[serde(default)]
    pub risk_tolerance: RiskTolerance,
    #[serde(default)]
    pub dependents: u8,
    #[serde(default)]
    pub retirement_age: Option<u8>,
}

impl Profile {
    #[must_use]
    pub fn new(id: ProfileId, age: u8) -> Self {
        Self {
            id,
            age,
            monthly_income: 0.0,
            monthly_expenses: 0.0,
            risk_tolerance: RiskTolerance::default(),
            dependents: 0,
            retirement_age: None,
        }
    }

    #[must_use]
    pub fn annual_expenses(&self) -> f64 {
        self.monthly_expenses * 12.0
    }

    pub fn validate(&self) -> Result<(), InvalidProfileError> {
        for (field, value) in [
            ("monthly_income", self.monthly_income),
            ("monthly_expenses", self.monthly_expenses),
        ] {
            if !value.is_finite() {
                return Err(InvalidProfileError::NonFiniteField { field });
            }
            if value < 0.0 {
                return Err(InvalidProfileError::NegativeField { field, value });
            }
        }

        if self.age > MAX_AGE {
            return Err(InvalidProfileError::AgeOutOfRange(self.age));
        }
        if let Some(retirement_age) = self.retirement_age
            && retirement_age > MAX_AGE
        {
            return Err(InvalidProfileError::AgeOutOfRange(retirement_age));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_profile() {
        let mut profile = Profile::new(ProfileId(1), 35);
        profile.monthly_income = 150_000.0;
        profile.monthly_expenses = 50_000.0;
        assert!(profile.validate().is_ok());
        assert_eq!(profile.annual_expenses(), 600_000.0);

        profile.monthly_expenses = -1.0;
        assert!(matches!(
            profile.validate(),
            Err(InvalidProfileError::NegativeField {
                field: "monthly_expenses",
                ..
            })
        ));

        profile.monthly_expenses = f64::INFINITY;
        assert!(matches!(
            profile.validate(),
            Err(InvalidProfileError::NonFiniteField { .. })
        ));
    }

    #[test]
    fn test_validate_age_range() {
        let profile = Profile::new(ProfileId(1), 130);
        assert_eq!(
            profile.validate(),
            Err(InvalidProfileError::AgeOutOfRange(130))
        );
    }
}
