//! State pension (IPK point based) estimate
//!
//! Benefit = fixed payment + IPK total * point cost. Past working years are
//! not known, so each is credited `ipk_past_coef` of the current year's IPK;
//! future years until retirement are credited in full. Fixed payment and
//! point cost grow at the point-value growth rate to the retirement date,
//! and the result is discounted back at inflation for today's prices.

use chrono::{Months, NaiveDate};
use serde::Serialize;

use crate::client::{Client, Sex};
use crate::tables::PensionSettings;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatePensionEstimate {
    /// Benefit in today's prices
    pub monthly_current: f64,
    /// Benefit in prices of the retirement date
    pub monthly_future: f64,
    pub ipk_per_year: f64,
    pub ipk_total: f64,
    pub past_years: f64,
    pub future_years: f64,
    pub retirement_age: u32,
    pub months_to_retirement: u32,
    pub retirement_date: Option<NaiveDate>,
}

pub struct StatePensionEstimator {
    settings: PensionSettings,
    /// Annual percent used to discount the future benefit
    inflation_rate: f64,
}

impl StatePensionEstimator {
    pub fn new(settings: PensionSettings, inflation_rate: f64) -> Self {
        Self { settings, inflation_rate }
    }

    pub fn retirement_age(&self, sex: Sex) -> u32 {
        match sex {
            Sex::Male => self.settings.retirement_ages.male,
            Sex::Female => self.settings.retirement_ages.female,
        }
    }

    /// Whole months from `date` until the client reaches retirement age
    pub fn months_to_retirement(&self, client: &Client, date: NaiveDate) -> u32 {
        let retirement_months = self.retirement_age(client.sex) as i32 * 12;
        (retirement_months - client.age_months_at(date)).max(0) as u32
    }

    /// IPK points earned by one year of contributions at the client's income
    pub fn ipk_per_year(&self, annual_income: f64) -> f64 {
        let s = &self.settings;
        let contributed = annual_income.max(0.0).min(s.salary_cap) * s.insurance_rate;
        let full = s.salary_cap * s.standard_rate;
        (s.max_ipk_per_year * contributed / full).min(s.max_ipk_per_year)
    }

    pub fn estimate(&self, client: &Client, current_date: NaiveDate) -> StatePensionEstimate {
        let s = &self.settings;
        let retirement_age = self.retirement_age(client.sex);
        let months_to_retirement = self.months_to_retirement(client, current_date);

        let working_span = retirement_age.saturating_sub(s.work_start_age) as f64;
        let age_years = client.age_years_at(current_date) as f64;
        let past_years = (age_years - s.work_start_age as f64).clamp(0.0, working_span);
        let future_years = months_to_retirement as f64 / 12.0;

        let ipk_per_year = self.ipk_per_year(client.annual_income());
        let ipk_total = ipk_per_year * (past_years * s.ipk_past_coef + future_years);
        let today_value = s.fixed_payment + ipk_total * s.point_cost;

        let (monthly_current, monthly_future) = if months_to_retirement == 0 {
            (today_value, today_value)
        } else {
            let years = months_to_retirement as f64 / 12.0;
            let future = today_value * (1.0 + s.point_value_growth / 100.0).powf(years);
            let current = future / (1.0 + self.inflation_rate / 100.0).powf(years);
            (current, future)
        };

        StatePensionEstimate {
            monthly_current,
            monthly_future,
            ipk_per_year,
            ipk_total,
            past_years,
            future_years,
            retirement_age,
            months_to_retirement,
            retirement_date: current_date.checked_add_months(Months::new(months_to_retirement)),
        }
    }
}

/// Estimate discounted at the point-value growth rate
pub fn estimate_state_pension(
    client: &Client,
    pension_settings: &PensionSettings,
    current_date: NaiveDate,
) -> StatePensionEstimate {
    let inflation = pension_settings.point_value_growth;
    StatePensionEstimator::new(pension_settings.clone(), inflation).estimate(client, current_date)
}
