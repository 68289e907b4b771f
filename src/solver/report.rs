//! Per-goal output handed to the request layer

use serde::Serialize;

use crate::client::GoalType;
use crate::error::EngineError;
use crate::pension::StatePensionEstimate;
use crate::projection::{YearSummary, YearlyBenefit};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalSummary {
    pub goal_type: GoalType,
    pub term_months: u32,
    /// Capital the goal needs at the end of the term
    pub target_amount: f64,
    pub initial_capital: f64,
    /// Final balance with the stated contribution, co-financing included
    pub projected_value: f64,
    pub projected_value_without_cofinancing: f64,
    pub recommended_replenishment: f64,
    pub recommended_replenishment_without_cofinancing: f64,
    pub has_gap: bool,
    pub converged: bool,
    pub converged_without_cofinancing: bool,
    pub initial_capital_yield_percent: f64,
    pub top_up_yield_percent: f64,
    pub degraded_yield: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PensionGap {
    pub has_gap: bool,
    /// Today's prices
    pub desired_monthly_income: f64,
    /// Prices at the end of the term
    pub desired_monthly_income_future: f64,
    pub gap_monthly_current: f64,
    pub gap_monthly_future: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CofinancingReport {
    pub ratio: Option<f64>,
    /// Monthly income the tier was chosen on
    pub relevant_income: f64,
    pub total_benefit: f64,
    pub yearly: Vec<YearlyBenefit>,
    /// Benefits earned but payable only after the term
    pub beyond_horizon: Vec<YearlyBenefit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalReport {
    pub goal_id: String,
    pub summary: GoalSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_pension: Option<StatePensionEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pension_gap: Option<PensionGap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pds_cofinancing: Option<CofinancingReport>,
    /// Yearly breakdown of the recommended plan
    pub yearly: Vec<YearSummary>,
    /// Month-end balances of the recommended plan
    pub trajectory: Vec<f64>,
    pub warnings: Vec<String>,
}

/// Result of one goal in a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GoalOutcome {
    Resolved(Box<GoalReport>),
    Failed { goal_id: String, error: String },
}

impl GoalOutcome {
    pub fn failed(goal_id: &str, error: &EngineError) -> Self {
        GoalOutcome::Failed {
            goal_id: goal_id.to_string(),
            error: error.to_string(),
        }
    }

    pub fn goal_id(&self) -> &str {
        match self {
            GoalOutcome::Resolved(report) => &report.goal_id,
            GoalOutcome::Failed { goal_id, .. } => goal_id,
        }
    }

    pub fn report(&self) -> Option<&GoalReport> {
        match self {
            GoalOutcome::Resolved(report) => Some(report),
            GoalOutcome::Failed { .. } => None,
        }
    }
}
