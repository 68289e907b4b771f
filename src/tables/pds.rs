//! State co-financing (PDS) parameters and income brackets

use serde::{Deserialize, Serialize};

use super::settings::{keys, SystemSettings};
use crate::error::{EngineError, EngineResult};

/// Calendar month in which the prior year's contributions are matched (August)
pub const PDS_MATCH_MONTH: u32 = 8;

/// Which income the bracket lookup is made against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeBasis {
    Gross,
    Net,
}

/// Global co-financing parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PdsSettings {
    pub max_state_cofin_amount_per_year: f64,
    pub min_contribution_for_support_per_year: f64,
    pub income_basis: IncomeBasis,
    /// Number of contribution years eligible for matching
    pub duration_years: u32,
    /// Calendar month (1-12) the match is paid in
    pub match_month: u32,
}

impl Default for PdsSettings {
    fn default() -> Self {
        Self {
            max_state_cofin_amount_per_year: 36_000.0,
            min_contribution_for_support_per_year: 2_000.0,
            income_basis: IncomeBasis::Gross,
            duration_years: 10,
            match_month: PDS_MATCH_MONTH,
        }
    }
}

impl PdsSettings {
    pub fn from_settings(settings: &SystemSettings) -> EngineResult<Self> {
        let d = Self::default();

        let income_basis = match settings.string(keys::PDS_INCOME_BASIS) {
            None | Some("gross") => IncomeBasis::Gross,
            Some("net") => IncomeBasis::Net,
            Some(other) => {
                return Err(EngineError::Configuration(format!(
                    "unknown PDS income basis '{}'",
                    other
                )))
            }
        };

        let match_month = settings.number_or(keys::PDS_MATCH_MONTH, d.match_month as f64)? as u32;
        if !(1..=12).contains(&match_month) {
            return Err(EngineError::Configuration(format!(
                "PDS match month {} is not a calendar month",
                match_month
            )));
        }

        Ok(Self {
            max_state_cofin_amount_per_year: settings
                .number_or(keys::PDS_MAX_STATE_AMOUNT, d.max_state_cofin_amount_per_year)?,
            min_contribution_for_support_per_year: settings
                .number_or(keys::PDS_MIN_CONTRIBUTION, d.min_contribution_for_support_per_year)?,
            income_basis,
            duration_years: settings
                .number_or(keys::PDS_DURATION_YEARS, d.duration_years as f64)?
                as u32,
            match_month,
        })
    }
}

/// Income tier with its matching ratio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdsIncomeBracket {
    /// Average monthly income, inclusive lower bound
    pub income_from: f64,
    /// Exclusive upper bound; `None` = unbounded
    pub income_to: Option<f64>,
    pub ratio_numerator: f64,
    pub ratio_denominator: f64,
}

impl PdsIncomeBracket {
    pub fn contains(&self, monthly_income: f64) -> bool {
        monthly_income >= self.income_from
            && self.income_to.map_or(true, |to| monthly_income < to)
    }

    pub fn ratio(&self) -> f64 {
        if self.ratio_denominator > 0.0 {
            self.ratio_numerator / self.ratio_denominator
        } else {
            0.0
        }
    }
}

/// Default 1:1 / 1:2 / 1:4 tiers
pub fn default_income_brackets() -> Vec<PdsIncomeBracket> {
    vec![
        PdsIncomeBracket {
            income_from: 0.0,
            income_to: Some(80_000.0),
            ratio_numerator: 1.0,
            ratio_denominator: 1.0,
        },
        PdsIncomeBracket {
            income_from: 80_000.0,
            income_to: Some(150_000.0),
            ratio_numerator: 1.0,
            ratio_denominator: 2.0,
        },
        PdsIncomeBracket {
            income_from: 150_000.0,
            income_to: None,
            ratio_numerator: 1.0,
            ratio_denominator: 4.0,
        },
    ]
}

/// Bracket containing `monthly_income`, first match wins
pub fn find_bracket(brackets: &[PdsIncomeBracket], monthly_income: f64) -> Option<&PdsIncomeBracket> {
    brackets.iter().find(|b| b.contains(monthly_income))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_ratios() {
        let brackets = default_income_brackets();
        assert_eq!(find_bracket(&brackets, 50_000.0).unwrap().ratio(), 1.0);
        assert_eq!(find_bracket(&brackets, 80_000.0).unwrap().ratio(), 0.5);
        assert_eq!(find_bracket(&brackets, 1_000_000.0).unwrap().ratio(), 0.25);
        assert!(find_bracket(&brackets, -1.0).is_none());
    }

    #[test]
    fn test_settings_from_store() {
        let settings = SystemSettings::default_market().with_string(keys::PDS_INCOME_BASIS, "net");
        let pds = PdsSettings::from_settings(&settings).unwrap();
        assert_eq!(pds.income_basis, IncomeBasis::Net);
        assert_eq!(pds.duration_years, 10);
        assert_eq!(pds.match_month, PDS_MATCH_MONTH);

        let bad = SystemSettings::new().with_number(keys::PDS_MATCH_MONTH, 13.0);
        assert!(PdsSettings::from_settings(&bad).is_err());
    }
}
