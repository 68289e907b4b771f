//! Flat system settings store and the typed views read from it

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A typed settings value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SettingValue {
    String(String),
    Number(f64),
    Json(serde_json::Value),
}

/// Key -> value store for global parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemSettings {
    values: HashMap<String, SettingValue>,
}

impl SystemSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: SettingValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn with_number(mut self, key: &str, value: f64) -> Self {
        self.insert(key, SettingValue::Number(value));
        self
    }

    pub fn with_string(mut self, key: &str, value: &str) -> Self {
        self.insert(key, SettingValue::String(value.to_string()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Numeric value for `key`; a present value of another type is an error
    pub fn number(&self, key: &str) -> EngineResult<Option<f64>> {
        match self.values.get(key) {
            None => Ok(None),
            Some(SettingValue::Number(n)) => Ok(Some(*n)),
            Some(SettingValue::Json(serde_json::Value::Number(n))) => Ok(n.as_f64()),
            Some(other) => Err(EngineError::Configuration(format!(
                "setting '{}' must be numeric, found {:?}",
                key, other
            ))),
        }
    }

    pub fn number_or(&self, key: &str, default: f64) -> EngineResult<f64> {
        Ok(self.number(key)?.unwrap_or(default))
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(SettingValue::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn json(&self, key: &str) -> Option<&serde_json::Value> {
        match self.values.get(key) {
            Some(SettingValue::Json(v)) => Some(v),
            _ => None,
        }
    }

    /// Defaults used by `RateTables::default_market`
    pub fn default_market() -> Self {
        Self::new()
            .with_number(keys::INFLATION_RATE, 4.0)
            .with_number(keys::EXPENSE_GROWTH_RATE, 4.0)
            .with_number(keys::PDS_MAX_STATE_AMOUNT, 36_000.0)
            .with_number(keys::PDS_MIN_CONTRIBUTION, 2_000.0)
            .with_number(keys::PDS_DURATION_YEARS, 10.0)
            .with_string(keys::PDS_INCOME_BASIS, "gross")
    }
}

/// Well-known setting keys
pub mod keys {
    pub const INFLATION_RATE: &str = "inflation_rate";
    pub const EXPENSE_GROWTH_RATE: &str = "expense_growth_rate";
    pub const CONTRIBUTION_INDEXATION_RATE: &str = "contribution_indexation_rate";

    pub const PDS_MAX_STATE_AMOUNT: &str = "pds_max_state_amount_per_year";
    pub const PDS_MIN_CONTRIBUTION: &str = "pds_min_contribution_per_year";
    pub const PDS_INCOME_BASIS: &str = "pds_income_basis";
    pub const PDS_DURATION_YEARS: &str = "pds_duration_years";
    pub const PDS_MATCH_MONTH: &str = "pds_match_month";

    pub const PENSION_RETIREMENT_AGES: &str = "pension_retirement_ages";
    pub const PENSION_WORK_START_AGE: &str = "pension_work_start_age";
    pub const PENSION_INSURANCE_RATE: &str = "pension_insurance_rate";
    pub const PENSION_STANDARD_RATE: &str = "pension_standard_rate";
    pub const PENSION_MAX_IPK_PER_YEAR: &str = "pension_max_ipk_per_year";
    pub const PENSION_FIXED_PAYMENT: &str = "pension_fixed_payment";
    pub const PENSION_POINT_COST: &str = "pension_point_cost";
    pub const PENSION_SALARY_CAP: &str = "pension_salary_cap";
    pub const PENSION_POINT_VALUE_GROWTH: &str = "pension_point_value_growth";
    pub const PENSION_IPK_PAST_COEF: &str = "pension_ipk_past_coef";
    pub const PENSION_PAYOUT_MONTHS: &str = "pension_payout_months";
}

/// Macro-economic rates, all annual percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EconomicSettings {
    pub inflation_rate: f64,
    pub expense_growth_rate: f64,
    /// Annual contribution indexation; inflation when absent
    pub contribution_indexation_rate: Option<f64>,
}

impl EconomicSettings {
    pub fn from_settings(settings: &SystemSettings) -> EngineResult<Self> {
        let inflation_rate = settings.number_or(keys::INFLATION_RATE, 4.0)?;
        Ok(Self {
            inflation_rate,
            expense_growth_rate: settings.number_or(keys::EXPENSE_GROWTH_RATE, inflation_rate)?,
            contribution_indexation_rate: settings.number(keys::CONTRIBUTION_INDEXATION_RATE)?,
        })
    }

    /// Replace every rate with a goal-level inflation override
    pub fn with_override(self, inflation_rate: Option<f64>) -> Self {
        match inflation_rate {
            Some(rate) => Self {
                inflation_rate: rate,
                expense_growth_rate: rate,
                contribution_indexation_rate: None,
            },
            None => self,
        }
    }

    /// Monthly contribution indexation percent, geometric
    pub fn monthly_indexation_percent(&self) -> f64 {
        let annual = self.contribution_indexation_rate.unwrap_or(self.inflation_rate);
        annual_to_monthly_percent(annual)
    }
}

/// Geometric conversion of an annual percent rate to a monthly percent rate
pub fn annual_to_monthly_percent(annual_percent: f64) -> f64 {
    ((1.0 + annual_percent / 100.0).powf(1.0 / 12.0) - 1.0) * 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetirementAges {
    pub male: u32,
    pub female: u32,
}

/// State pension constants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PensionSettings {
    pub retirement_ages: RetirementAges,
    pub work_start_age: u32,
    /// Insurance contribution rate actually paid (decimal)
    pub insurance_rate: f64,
    /// Standard rate the IPK formula is normalised against (decimal)
    pub standard_rate: f64,
    pub max_ipk_per_year: f64,
    /// Fixed monthly payment, today's prices
    pub fixed_payment: f64,
    /// Cost of one IPK point, today's prices
    pub point_cost: f64,
    /// Annual contribution base ceiling, today's prices
    pub salary_cap: f64,
    /// Annual percent growth of point cost and fixed payment
    pub point_value_growth: f64,
    /// Share of a full current-year IPK assumed for each past working year
    pub ipk_past_coef: f64,
    /// Expected payout (survival) period in months
    pub payout_months: u32,
}

impl Default for PensionSettings {
    fn default() -> Self {
        Self {
            retirement_ages: RetirementAges { male: 65, female: 60 },
            work_start_age: 22,
            insurance_rate: 0.16,
            standard_rate: 0.16,
            max_ipk_per_year: 10.0,
            fixed_payment: 8_907.70,
            point_cost: 145.69,
            salary_cap: 2_759_000.0,
            point_value_growth: 4.0,
            ipk_past_coef: 0.8,
            payout_months: 264,
        }
    }
}

impl PensionSettings {
    pub fn from_settings(settings: &SystemSettings) -> EngineResult<Self> {
        let d = Self::default();

        let retirement_ages = match settings.json(keys::PENSION_RETIREMENT_AGES) {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                EngineError::Configuration(format!(
                    "setting '{}' is not {{male, female}}: {}",
                    keys::PENSION_RETIREMENT_AGES,
                    e
                ))
            })?,
            None => d.retirement_ages,
        };

        let pension = Self {
            retirement_ages,
            work_start_age: settings
                .number_or(keys::PENSION_WORK_START_AGE, d.work_start_age as f64)?
                as u32,
            insurance_rate: settings.number_or(keys::PENSION_INSURANCE_RATE, d.insurance_rate)?,
            standard_rate: settings.number_or(keys::PENSION_STANDARD_RATE, d.standard_rate)?,
            max_ipk_per_year: settings.number_or(keys::PENSION_MAX_IPK_PER_YEAR, d.max_ipk_per_year)?,
            fixed_payment: settings.number_or(keys::PENSION_FIXED_PAYMENT, d.fixed_payment)?,
            point_cost: settings.number_or(keys::PENSION_POINT_COST, d.point_cost)?,
            salary_cap: settings.number_or(keys::PENSION_SALARY_CAP, d.salary_cap)?,
            point_value_growth: settings
                .number_or(keys::PENSION_POINT_VALUE_GROWTH, d.point_value_growth)?,
            ipk_past_coef: settings.number_or(keys::PENSION_IPK_PAST_COEF, d.ipk_past_coef)?,
            payout_months: settings
                .number_or(keys::PENSION_PAYOUT_MONTHS, d.payout_months as f64)?
                as u32,
        };

        if pension.salary_cap <= 0.0 || pension.standard_rate <= 0.0 {
            return Err(EngineError::Configuration(
                "pension salary cap and standard rate must be positive".into(),
            ));
        }
        Ok(pension)
    }
}
