//! State co-financing (PDS) matching
//!
//! Contributions made in simulation year N-1 are matched in the match month
//! (August by default) of year N, at the ratio of the client's income tier
//! and up to the annual cap. Only the first `duration_years` contribution
//! years are matched.

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use super::engine::{Lump, LumpKind};
use crate::error::{EngineError, EngineResult};
use crate::tables::{find_bracket, IncomeBasis, PdsIncomeBracket, PdsSettings, TaxSchedule};

/// State match paid in one year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyBenefit {
    /// Simulation year the benefit is paid in
    pub year: u32,
    /// Simulation year whose contributions are matched
    pub matched_contribution_year: u32,
    pub contribution: f64,
    pub ratio: f64,
    pub benefit: f64,
    /// True when the annual cap bound the benefit
    pub capped: bool,
    /// Month index the benefit is paid in, 0-based
    pub injection_month: u32,
}

/// All benefits for one contribution schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CofinancingSchedule {
    pub benefits: Vec<YearlyBenefit>,
}

impl CofinancingSchedule {
    pub fn total(&self) -> f64 {
        self.benefits.iter().map(|b| b.benefit).sum()
    }

    /// Benefits paid inside the term, as lumps for the simulator
    pub fn lumps(&self, term_months: u32) -> Vec<Lump> {
        self.within(term_months)
            .map(|b| Lump {
                month: b.injection_month,
                amount: b.benefit,
                kind: LumpKind::Cofinancing,
            })
            .collect()
    }

    pub fn within(&self, term_months: u32) -> impl Iterator<Item = &YearlyBenefit> {
        self.benefits.iter().filter(move |b| b.injection_month < term_months)
    }

    /// Benefits that would be paid after the term ends
    pub fn beyond(&self, term_months: u32) -> impl Iterator<Item = &YearlyBenefit> {
        self.benefits.iter().filter(move |b| b.injection_month >= term_months)
    }

    /// Payment year -> benefit
    pub fn by_year(&self) -> BTreeMap<u32, f64> {
        self.benefits.iter().map(|b| (b.year, b.benefit)).collect()
    }
}

/// Co-financing rules bound to one client's income tier
#[derive(Debug, Clone)]
pub struct CofinancingCalculator {
    settings: PdsSettings,
    /// `None` when the client's income falls in no tier
    ratio: Option<f64>,
    relevant_income: f64,
}

impl CofinancingCalculator {
    /// Resolve the client's tier. A net income basis needs the tax scale.
    pub fn new(
        settings: &PdsSettings,
        brackets: &[PdsIncomeBracket],
        gross_monthly_income: f64,
        tax: Option<&TaxSchedule>,
    ) -> EngineResult<Self> {
        let relevant_income = match settings.income_basis {
            IncomeBasis::Gross => gross_monthly_income,
            IncomeBasis::Net => {
                let tax = tax.ok_or_else(|| {
                    EngineError::Configuration("net income basis requires a tax scale".into())
                })?;
                tax.net_income(gross_monthly_income * 12.0) / 12.0
            }
        };

        let ratio = find_bracket(brackets, relevant_income).map(|b| b.ratio());
        if ratio.is_none() {
            debug!("income {:.2} falls in no co-financing tier", relevant_income);
        }

        Ok(Self {
            settings: settings.clone(),
            ratio,
            relevant_income,
        })
    }

    pub fn ratio(&self) -> Option<f64> {
        self.ratio
    }

    pub fn relevant_income(&self) -> f64 {
        self.relevant_income
    }

    pub fn settings(&self) -> &PdsSettings {
        &self.settings
    }

    /// Month index of the match month in simulation year `year`
    pub fn injection_month(&self, year: u32) -> u32 {
        (year - 1) * 12 + (self.settings.match_month - 1)
    }

    /// Benefits for a per-year contribution history (index 0 = year 1)
    pub fn schedule(&self, yearly_contributions: &[f64], duration_years: u32) -> CofinancingSchedule {
        let mut schedule = CofinancingSchedule::default();
        let Some(ratio) = self.ratio else {
            return schedule;
        };

        for year in 2..=duration_years + 1 {
            let matched_year = year - 1;
            let contribution = yearly_contributions
                .get((matched_year - 1) as usize)
                .copied()
                .unwrap_or(0.0);
            if contribution < self.settings.min_contribution_for_support_per_year {
                continue;
            }

            let uncapped = contribution * ratio;
            let cap = self.settings.max_state_cofin_amount_per_year;
            let benefit = uncapped.min(cap);
            if benefit <= 0.0 {
                continue;
            }

            schedule.benefits.push(YearlyBenefit {
                year,
                matched_contribution_year: matched_year,
                contribution,
                ratio,
                benefit,
                capped: uncapped > cap,
                injection_month: self.injection_month(year),
            });
        }

        schedule
    }
}

/// Payment year -> state benefit for a contribution history.
///
/// `client_income` is the monthly income already on `settings.income_basis`:
/// the tier is looked up on it as given and no tax is applied here. Use
/// `CofinancingCalculator::new` with a tax scale to start from gross income.
pub fn apply_cofinancing(
    yearly_contributions: &[f64],
    client_income: f64,
    settings: &PdsSettings,
    income_brackets: &[PdsIncomeBracket],
    duration_years: u32,
) -> BTreeMap<u32, f64> {
    let ratio = find_bracket(income_brackets, client_income).map(|b| b.ratio());
    let calculator = CofinancingCalculator {
        settings: settings.clone(),
        ratio,
        relevant_income: client_income,
    };
    calculator.schedule(yearly_contributions, duration_years).by_year()
}
