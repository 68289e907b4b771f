//! Trajectory output structures for simulations

use serde::{Deserialize, Serialize};

use crate::round_money;

/// A single simulated month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRow {
    /// Month index, 0-based
    pub month: u32,
    /// Simulation year, 1-based (`month / 12 + 1`)
    pub year: u32,

    pub bop_balance: f64,
    /// Indexed regular contribution
    pub contribution: f64,
    /// State co-financing paid in this month
    pub cofinancing: f64,
    /// Other lump sums (unlocked assets)
    pub lump_sum: f64,
    pub growth: f64,
    pub eop_balance: f64,
}

impl MonthRow {
    pub fn new(month: u32) -> Self {
        Self {
            month,
            year: month / 12 + 1,
            bop_balance: 0.0,
            contribution: 0.0,
            cofinancing: 0.0,
            lump_sum: 0.0,
            growth: 0.0,
            eop_balance: 0.0,
        }
    }
}

/// Aggregates for one simulation year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    pub year: u32,
    pub contributions: f64,
    pub cofinancing: f64,
    pub lump_sums: f64,
    pub growth: f64,
    pub end_balance: f64,
}

/// Full result of one simulator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub initial_capital: f64,
    pub months: Vec<MonthRow>,
    /// Regular contributions per simulation year, index 0 = year 1
    pub yearly_contributions: Vec<f64>,
}

impl Trajectory {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            months: Vec::new(),
            yearly_contributions: Vec::new(),
        }
    }

    pub fn add_row(&mut self, row: MonthRow) {
        let year_index = (row.year - 1) as usize;
        if self.yearly_contributions.len() <= year_index {
            self.yearly_contributions.resize(year_index + 1, 0.0);
        }
        self.yearly_contributions[year_index] += row.contribution;
        self.months.push(row);
    }

    /// Balance after the last month; the initial capital for a zero term
    pub fn final_balance(&self) -> f64 {
        self.months.last().map(|r| r.eop_balance).unwrap_or(self.initial_capital)
    }

    pub fn balances(&self) -> Vec<f64> {
        self.months.iter().map(|r| r.eop_balance).collect()
    }

    pub fn total_cofinancing(&self) -> f64 {
        self.months.iter().map(|r| r.cofinancing).sum()
    }

    /// Month-by-month sum of two runs over the same term.
    ///
    /// The simulator is linear, so the capital leg and the contribution leg
    /// can be run with their own yields and added.
    pub fn combine(&self, other: &Trajectory) -> Trajectory {
        let mut combined = Trajectory::new(self.initial_capital + other.initial_capital);
        let len = self.months.len().max(other.months.len());
        let empty = MonthRow::new(0);

        for i in 0..len {
            let a = self.months.get(i).unwrap_or(&empty);
            let b = other.months.get(i).unwrap_or(&empty);
            let mut row = MonthRow::new(i as u32);
            row.bop_balance = a.bop_balance + b.bop_balance;
            row.contribution = a.contribution + b.contribution;
            row.cofinancing = a.cofinancing + b.cofinancing;
            row.lump_sum = a.lump_sum + b.lump_sum;
            row.growth = a.growth + b.growth;
            row.eop_balance = a.eop_balance + b.eop_balance;
            combined.add_row(row);
        }

        combined
    }

    /// Per-year aggregates for charting, amounts rounded to cents
    pub fn yearly_summary(&self) -> Vec<YearSummary> {
        let mut years: Vec<YearSummary> = Vec::new();
        for row in &self.months {
            if years.last().map_or(true, |y| y.year != row.year) {
                years.push(YearSummary {
                    year: row.year,
                    contributions: 0.0,
                    cofinancing: 0.0,
                    lump_sums: 0.0,
                    growth: 0.0,
                    end_balance: 0.0,
                });
            }
            if let Some(year) = years.last_mut() {
                year.contributions += row.contribution;
                year.cofinancing += row.cofinancing;
                year.lump_sums += row.lump_sum;
                year.growth += row.growth;
                year.end_balance = row.eop_balance;
            }
        }

        for year in &mut years {
            year.contributions = round_money(year.contributions);
            year.cofinancing = round_money(year.cofinancing);
            year.lump_sums = round_money(year.lump_sums);
            year.growth = round_money(year.growth);
            year.end_balance = round_money(year.end_balance);
        }
        years
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(month: u32, contribution: f64, eop_balance: f64) -> MonthRow {
        MonthRow {
            contribution,
            eop_balance,
            ..MonthRow::new(month)
        }
    }

    #[test]
    fn test_yearly_contributions_by_year_index() {
        let mut t = Trajectory::new(0.0);
        for m in 0..25 {
            t.add_row(row(m, 10.0, m as f64));
        }
        assert_eq!(t.yearly_contributions, vec![120.0, 120.0, 10.0]);
        assert_eq!(t.final_balance(), 24.0);

        let summary = t.yearly_summary();
        assert_eq!(summary.len(), 3);
        assert_eq!(summary[1].end_balance, 23.0);
    }

    #[test]
    fn test_empty_final_balance_is_initial() {
        assert_eq!(Trajectory::new(500.0).final_balance(), 500.0);
    }

    #[test]
    fn test_combine() {
        let mut a = Trajectory::new(100.0);
        let mut b = Trajectory::new(0.0);
        a.add_row(row(0, 0.0, 101.0));
        b.add_row(row(0, 5.0, 5.0));

        let c = a.combine(&b);
        assert_eq!(c.initial_capital, 100.0);
        assert_eq!(c.final_balance(), 106.0);
        assert_eq!(c.yearly_contributions, vec![5.0]);
    }
}
