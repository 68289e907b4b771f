//! Client and goal records as supplied by the request layer

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::portfolio::RiskLevel;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

/// A non-liquid holding that becomes available at some month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub asset_type: String,
    pub amount: f64,
    /// Months from today until the asset can be used
    #[serde(default)]
    pub unlock_month: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub birth_date: NaiveDate,
    pub sex: Sex,
    /// Average gross monthly income
    pub average_monthly_income: f64,
    #[serde(default)]
    pub liquid_capital: f64,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Client {
    pub fn new(birth_date: NaiveDate, sex: Sex, average_monthly_income: f64) -> Self {
        Self {
            birth_date,
            sex,
            average_monthly_income,
            liquid_capital: 0.0,
            assets: Vec::new(),
        }
    }

    /// Completed months of age at `date`
    pub fn age_months_at(&self, date: NaiveDate) -> i32 {
        let mut months = (date.year() - self.birth_date.year()) * 12
            + date.month() as i32
            - self.birth_date.month() as i32;
        if date.day() < self.birth_date.day() {
            months -= 1;
        }
        months
    }

    /// Completed years of age at `date`
    pub fn age_years_at(&self, date: NaiveDate) -> i32 {
        self.age_months_at(date).div_euclid(12)
    }

    pub fn annual_income(&self) -> f64 {
        self.average_monthly_income * 12.0
    }

    pub fn validate(&self, today: NaiveDate) -> EngineResult<()> {
        if self.average_monthly_income < 0.0 || !self.average_monthly_income.is_finite() {
            return Err(EngineError::Validation("client income must be non-negative".into()));
        }
        if self.liquid_capital < 0.0 || !self.liquid_capital.is_finite() {
            return Err(EngineError::Validation("client capital must be non-negative".into()));
        }
        if self.assets.iter().any(|a| a.amount < 0.0 || !a.amount.is_finite()) {
            return Err(EngineError::Validation("asset amounts must be non-negative".into()));
        }
        if self.birth_date > today {
            return Err(EngineError::Validation("birth date is in the future".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalType {
    #[serde(alias = "gos-pension")]
    Pension,
    PassiveIncome,
    Investment,
    Reserve,
    Life,
}

impl GoalType {
    /// Whether the goal is stated as a desired monthly income
    pub fn is_income_goal(&self) -> bool {
        matches!(self, GoalType::Pension)
    }
}

/// When the monthly contribution lands relative to that month's growth
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContributionTiming {
    /// End of month: grows from the following month
    #[default]
    Ordinary,
    /// Start of month: grows in the month it is paid
    AnnuityDue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub goal_type: GoalType,

    /// Authoritative for every type except pension
    #[serde(default)]
    pub target_amount: Option<f64>,

    /// Authoritative for pension goals, today's prices
    #[serde(default)]
    pub desired_monthly_income: Option<f64>,

    /// Months to the goal; 0 on a pension goal means "until retirement"
    pub term_months: i32,

    pub portfolio: String,
    pub risk_profile: RiskLevel,

    #[serde(default)]
    pub initial_capital: Option<f64>,

    /// Stated monthly replenishment; 0 when absent
    #[serde(default)]
    pub monthly_replenishment: Option<f64>,

    /// Annual percent; replaces inflation and expense growth for this goal
    #[serde(default)]
    pub inflation_rate: Option<f64>,

    #[serde(default)]
    pub contribution_timing: ContributionTiming,

    /// Whether state co-financing may be applied
    #[serde(default = "default_true")]
    pub cofinancing: bool,

    /// Inject the client's assets at their unlock months
    #[serde(default)]
    pub include_client_assets: bool,
}

impl Goal {
    pub fn new(id: &str, goal_type: GoalType, term_months: i32, risk_profile: RiskLevel) -> Self {
        Self {
            id: id.to_string(),
            goal_type,
            target_amount: None,
            desired_monthly_income: None,
            term_months,
            portfolio: "standard".to_string(),
            risk_profile,
            initial_capital: None,
            monthly_replenishment: None,
            inflation_rate: None,
            contribution_timing: ContributionTiming::default(),
            cofinancing: true,
            include_client_assets: false,
        }
    }

    pub fn with_target(mut self, target_amount: f64) -> Self {
        self.target_amount = Some(target_amount);
        self
    }

    pub fn with_desired_income(mut self, monthly_income: f64) -> Self {
        self.desired_monthly_income = Some(monthly_income);
        self
    }

    pub fn with_replenishment(mut self, monthly: f64) -> Self {
        self.monthly_replenishment = Some(monthly);
        self
    }

    pub fn with_initial_capital(mut self, capital: f64) -> Self {
        self.initial_capital = Some(capital);
        self
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital.unwrap_or(0.0)
    }

    pub fn monthly_replenishment(&self) -> f64 {
        self.monthly_replenishment.unwrap_or(0.0)
    }

    /// Reject out-of-domain input before any simulation runs
    pub fn validate(&self) -> EngineResult<()> {
        let fail = |msg: String| Err(EngineError::Validation(format!("goal '{}': {}", self.id, msg)));

        if self.term_months < 0 {
            return fail(format!("negative term {}", self.term_months));
        }
        for (name, value) in [
            ("initial capital", self.initial_capital),
            ("monthly replenishment", self.monthly_replenishment),
        ] {
            if let Some(v) = value {
                if v < 0.0 || !v.is_finite() {
                    return fail(format!("{} must be non-negative", name));
                }
            }
        }
        if let Some(rate) = self.inflation_rate {
            if rate <= -100.0 || !rate.is_finite() {
                return fail(format!("inflation rate {} out of range", rate));
            }
        }

        if self.goal_type.is_income_goal() {
            match self.desired_monthly_income {
                Some(v) if v >= 0.0 && v.is_finite() => Ok(()),
                Some(_) => fail("desired monthly income must be non-negative".into()),
                None => fail("pension goal needs a desired monthly income".into()),
            }
        } else {
            match self.target_amount {
                Some(v) if v >= 0.0 && v.is_finite() => Ok(()),
                Some(_) => fail("target amount must be non-negative".into()),
                None => fail("goal needs a target amount".into()),
            }
        }
    }
}
