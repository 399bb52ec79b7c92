//! Goal records as read from the persistence layer
//!
//! A [`Goal`] is validated once at the boundary ([`Goal::validate`]); the
//! calculators and the simulation core then work on it without re-checking
//! field presence. Category-specific inputs travel inside [`GoalKind`], so the
//! category and its inputs can never disagree.

use std::fmt;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use super::allocation::Allocation;
use super::ids::GoalId;
use crate::date_math::months_between;
use crate::error::{InvalidGoalError, InvalidGoalReason};

/// The closed set of goal categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalCategory {
    EmergencyFund,
    Retirement,
    EarlyRetirement,
    Education,
    HomePurchase,
    DebtRepayment,
    Discretionary,
    Vehicle,
    HomeImprovement,
    Insurance,
    #[serde(alias = "estate_planning")]
    LegacyPlanning,
    CharitableGiving,
    Custom,
}

impl GoalCategory {
    pub const ALL: [GoalCategory; 13] = [
        GoalCategory::EmergencyFund,
        GoalCategory::Retirement,
        GoalCategory::EarlyRetirement,
        GoalCategory::Education,
        GoalCategory::HomePurchase,
        GoalCategory::DebtRepayment,
        GoalCategory::Discretionary,
        GoalCategory::Vehicle,
        GoalCategory::HomeImprovement,
        GoalCategory::Insurance,
        GoalCategory::LegacyPlanning,
        GoalCategory::CharitableGiving,
        GoalCategory::Custom,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            GoalCategory::EmergencyFund => "emergency_fund",
            GoalCategory::Retirement => "retirement",
            GoalCategory::EarlyRetirement => "early_retirement",
            GoalCategory::Education => "education",
            GoalCategory::HomePurchase => "home_purchase",
            GoalCategory::DebtRepayment => "debt_repayment",
            GoalCategory::Discretionary => "discretionary",
            GoalCategory::Vehicle => "vehicle",
            GoalCategory::HomeImprovement => "home_improvement",
            GoalCategory::Insurance => "insurance",
            GoalCategory::LegacyPlanning => "legacy_planning",
            GoalCategory::CharitableGiving => "charitable_giving",
            GoalCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for GoalCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Category plus the inputs only that category uses.
///
/// Every input is optional at the schema level; the calculator decides which
/// ones are preferences (defaulted from parameters) and which are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum GoalKind {
    EmergencyFund {
        /// Months of expenses to hold
        #[serde(default)]
        months: Option<f64>,
    },
    Retirement {
        /// Annual spending in today's money (defaults to 12 x monthly expenses)
        #[serde(default)]
        annual_expenses: Option<f64>,
        #[serde(default)]
        withdrawal_rate: Option<f64>,
    },
    EarlyRetirement {
        #[serde(default)]
        annual_expenses: Option<f64>,
        #[serde(default)]
        withdrawal_rate: Option<f64>,
    },
    Education {
        #[serde(default)]
        years: Option<f64>,
        /// Yearly cost in today's money
        #[serde(default)]
        yearly_cost: Option<f64>,
    },
    HomePurchase {
        #[serde(default)]
        property_value: Option<f64>,
        #[serde(default)]
        down_payment_percent: Option<f64>,
    },
    DebtRepayment {
        #[serde(default)]
        outstanding_balance: Option<f64>,
        /// Annual interest rate charged on the balance
        #[serde(default)]
        interest_rate: Option<f64>,
    },
    Discretionary {},
    Vehicle {
        #[serde(default)]
        price: Option<f64>,
        #[serde(default)]
        down_payment_percent: Option<f64>,
    },
    HomeImprovement {
        #[serde(default)]
        estimated_cost: Option<f64>,
    },
    Insurance {
        #[serde(default)]
        annual_premium: Option<f64>,
        #[serde(default)]
        years: Option<f64>,
    },
    #[serde(alias = "estate_planning")]
    LegacyPlanning {
        #[serde(default)]
        bequest_amount: Option<f64>,
    },
    CharitableGiving {
        #[serde(default)]
        annual_donation: Option<f64>,
        #[serde(default)]
        years: Option<f64>,
    },
    Custom {},
}

impl GoalKind {
    #[must_use]
    pub fn category(&self) -> GoalCategory {
        match self {
            GoalKind::EmergencyFund { .. } => GoalCategory::EmergencyFund,
            GoalKind::Retirement { .. } => GoalCategory::Retirement,
            GoalKind::EarlyRetirement { .. } => GoalCategory::EarlyRetirement,
            GoalKind::Education { .. } => GoalCategory::Education,
            GoalKind::HomePurchase { .. } => GoalCategory::HomePurchase,
            GoalKind::DebtRepayment { .. } => GoalCategory::DebtRepayment,
            GoalKind::Discretionary {} => GoalCategory::Discretionary,
            GoalKind::Vehicle { .. } => GoalCategory::Vehicle,
            GoalKind::HomeImprovement { .. } => GoalCategory::HomeImprovement,
            GoalKind::Insurance { .. } => GoalCategory::Insurance,
            GoalKind::LegacyPlanning { .. } => GoalCategory::LegacyPlanning,
            GoalKind::CharitableGiving { .. } => GoalCategory::CharitableGiving,
            GoalKind::Custom {} => GoalCategory::Custom,
        }
    }

    /// Named category inputs, in declaration order
    #[must_use]
    pub fn inputs(&self) -> Vec<(&'static str, Option<f64>)> {
        match self {
            GoalKind::EmergencyFund { months } => vec![("months", *months)],
            GoalKind::Retirement {
                annual_expenses,
                withdrawal_rate,
            }
            | GoalKind::EarlyRetirement {
                annual_expenses,
                withdrawal_rate,
            } => vec![
                ("annual_expenses", *annual_expenses),
                ("withdrawal_rate", *withdrawal_rate),
            ],
            GoalKind::Education { years, yearly_cost } => {
                vec![("years", *years), ("yearly_cost", *yearly_cost)]
            }
            GoalKind::HomePurchase {
                property_value,
                down_payment_percent,
            } => vec![
                ("property_value", *property_value),
                ("down_payment_percent", *down_payment_percent),
            ],
            GoalKind::DebtRepayment {
                outstanding_balance,
                interest_rate,
            } => vec![
                ("outstanding_balance", *outstanding_balance),
                ("interest_rate", *interest_rate),
            ],
            GoalKind::Vehicle {
                price,
                down_payment_percent,
            } => vec![
                ("price", *price),
                ("down_payment_percent", *down_payment_percent),
            ],
            GoalKind::HomeImprovement { estimated_cost } => {
                vec![("estimated_cost", *estimated_cost)]
            }
            GoalKind::Insurance {
                annual_premium,
                years,
            } => vec![("annual_premium", *annual_premium), ("years", *years)],
            GoalKind::LegacyPlanning { bequest_amount } => {
                vec![("bequest_amount", *bequest_amount)]
            }
            GoalKind::CharitableGiving {
                annual_donation,
                years,
            } => vec![("annual_donation", *annual_donation), ("years", *years)],
            GoalKind::Discretionary {} | GoalKind::Custom {} => Vec::new(),
        }
    }

    /// Inputs that are fractions and must lie in (0, 1]
    fn is_fraction(field: &str) -> bool {
        matches!(field, "withdrawal_rate" | "down_payment_percent")
    }
}

/// How much the goal matters relative to others (priority hint only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

/// How negotiable the goal's amount and date are (priority hint only)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flexibility {
    Fixed,
    #[default]
    Somewhat,
    Flexible,
}

/// A financial goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    #[serde(default)]
    pub title: String,
    #[serde(flatten)]
    pub kind: GoalKind,
    /// Explicit target in today's money. Zero means "derive from category inputs".
    #[serde(default)]
    pub target_amount: f64,
    #[serde(default)]
    pub current_amount: f64,
    pub target_date: Date,
    #[serde(default)]
    pub monthly_contribution: f64,
    /// Chosen asset mix. `None` uses the recommended allocation.
    #[serde(default)]
    pub allocation: Option<Allocation>,
    #[serde(default)]
    pub importance: Importance,
    #[serde(default)]
    pub flexibility: Flexibility,
}

impl Goal {
    /// A goal with no savings yet and no explicit target or allocation
    #[must_use]
    pub fn new(id: GoalId, kind: GoalKind, target_date: Date) -> Self {
        Self {
            id,
            title: String::new(),
            kind,
            target_amount: 0.0,
            current_amount: 0.0,
            target_date,
            monthly_contribution: 0.0,
            allocation: None,
            importance: Importance::default(),
            flexibility: Flexibility::default(),
        }
    }

    #[must_use]
    pub fn category(&self) -> GoalCategory {
        self.kind.category()
    }

    /// Whole months from `as_of` to the target date (0 when already due)
    #[must_use]
    pub fn horizon_months(&self, as_of: Date) -> u32 {
        months_between(as_of, self.target_date)
    }

    /// The explicit target, when one was set
    #[must_use]
    pub fn explicit_target(&self) -> Option<f64> {
        (self.target_amount > 0.0).then_some(self.target_amount)
    }

    /// Check the record's invariants.
    ///
    /// Amounts must be finite and non-negative, category inputs too, rate-like
    /// inputs must be fractions in (0, 1], and a chosen allocation must
    /// normalize.
    pub fn validate(&self) -> Result<(), InvalidGoalError> {
        let invalid = |reason| InvalidGoalError::new(self.id, reason);

        for (field, value) in [
            ("target_amount", self.target_amount),
            ("current_amount", self.current_amount),
            ("monthly_contribution", self.monthly_contribution),
        ] {
            check_amount(field, value).map_err(invalid)?;
        }

        for (field, value) in self.kind.inputs() {
            let Some(value) = value else { continue };
            check_amount(field, value).map_err(invalid)?;
            if GoalKind::is_fraction(field) && (value <= 0.0 || value > 1.0) {
                return Err(invalid(InvalidGoalReason::OutOfRange { field, value }));
            }
        }

        if let Some(allocation) = &self.allocation {
            allocation.normalized().map_err(invalid)?;
        }

        Ok(())
    }
}

fn check_amount(field: &'static str, value: f64) -> Result<(), InvalidGoalReason> {
    if !value.is_finite() {
        return Err(InvalidGoalReason::NonFiniteAmount { field });
    }
    if value < 0.0 {
        return Err(InvalidGoalReason::NegativeAmount { field, value });
    }
    Ok(())
}
