//! Month-by-month capital simulator

use log::debug;
use serde::{Deserialize, Serialize};

use super::state::SimulationState;
use super::trajectory::{MonthRow, Trajectory};
use crate::client::ContributionTiming;

/// Configuration for a simulator run
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Number of months to simulate
    pub term_months: u32,

    /// Expected annual yield, percent
    pub annual_yield_percent: f64,

    /// Monthly contribution indexation, percent
    pub monthly_indexation_percent: f64,

    /// Contribution timing within the month
    pub timing: ContributionTiming,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            term_months: 360, // 30 years
            annual_yield_percent: 0.0,
            monthly_indexation_percent: 0.0,
            timing: ContributionTiming::Ordinary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LumpKind {
    Cofinancing,
    Asset,
}

/// One-off amount paid into the account at a given month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lump {
    /// Month index, 0-based
    pub month: u32,
    pub amount: f64,
    pub kind: LumpKind,
}

/// Geometric monthly rate for an annual percent yield
pub fn monthly_rate(annual_yield_percent: f64) -> f64 {
    (1.0 + annual_yield_percent / 100.0).powf(1.0 / 12.0) - 1.0
}

/// Capital simulator
pub struct Simulator {
    config: SimulationConfig,
    monthly_yield: f64,
}

impl Simulator {
    pub fn new(config: SimulationConfig) -> Self {
        let monthly_yield = monthly_rate(config.annual_yield_percent);
        Self { config, monthly_yield }
    }

    /// Run without lump sums
    pub fn run(&self, initial_capital: f64, monthly_contribution: f64) -> Trajectory {
        self.run_with_lumps(initial_capital, monthly_contribution, &[])
    }

    /// Run the simulation, paying `lumps` in alongside the month's contribution.
    /// Lumps outside the term are ignored.
    pub fn run_with_lumps(
        &self,
        initial_capital: f64,
        monthly_contribution: f64,
        lumps: &[Lump],
    ) -> Trajectory {
        let mut trajectory = Trajectory::new(initial_capital);
        let mut state = SimulationState::new(initial_capital);
        let indexation = self.config.monthly_indexation_percent / 100.0;

        for lump in lumps.iter().filter(|l| l.month >= self.config.term_months) {
            debug!(
                "{:?} lump of {:.2} at month {} is beyond the {}-month term",
                lump.kind, lump.amount, lump.month, self.config.term_months
            );
        }

        for month in 0..self.config.term_months {
            state.advance_to(month, indexation);
            let row = self.calculate_month(&state, monthly_contribution, lumps);
            state.eop_balance = row.eop_balance;
            trajectory.add_row(row);
        }

        trajectory
    }

    fn calculate_month(&self, state: &SimulationState, monthly_contribution: f64, lumps: &[Lump]) -> MonthRow {
        let mut row = MonthRow::new(state.month);
        row.bop_balance = state.bop_balance;
        row.contribution = monthly_contribution * state.indexation_factor;

        for lump in lumps.iter().filter(|l| l.month == state.month) {
            match lump.kind {
                LumpKind::Cofinancing => row.cofinancing += lump.amount,
                LumpKind::Asset => row.lump_sum += lump.amount,
            }
        }

        let inflow = row.contribution + row.cofinancing + row.lump_sum;
        match self.config.timing {
            ContributionTiming::Ordinary => {
                row.growth = state.bop_balance * self.monthly_yield;
                row.eop_balance = state.bop_balance + row.growth + inflow;
            }
            ContributionTiming::AnnuityDue => {
                row.growth = (state.bop_balance + inflow) * self.monthly_yield;
                row.eop_balance = state.bop_balance + inflow + row.growth;
            }
        }

        row
    }
}

/// Single-call form of the simulator
pub fn simulate(
    initial_capital: f64,
    monthly_contribution: f64,
    term_months: u32,
    annual_yield_percent: f64,
    monthly_indexation_percent: f64,
    contribution_timing: ContributionTiming,
) -> Trajectory {
    Simulator::new(SimulationConfig {
        term_months,
        annual_yield_percent,
        monthly_indexation_percent,
        timing: contribution_timing,
    })
    .run(initial_capital, monthly_contribution)
}

/// Regular contributions per simulation year without running the balance
pub fn yearly_contributions(monthly_contribution: f64, term_months: u32, monthly_indexation_percent: f64) -> Vec<f64> {
    let indexation = monthly_indexation_percent / 100.0;
    let mut years = vec![0.0; ((term_months + 11) / 12) as usize];
    for month in 0..term_months {
        years[(month / 12) as usize] += monthly_contribution * (1.0 + indexation).powi(month as i32);
    }
    years
}
