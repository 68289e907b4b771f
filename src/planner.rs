//! Goal planner for batch resolution
//!
//! Holds one rate-table snapshot and resolves any number of goals against it.
//! Goals are independent, so a batch runs in parallel and one goal's failure
//! never affects the others.

use std::path::Path;

use chrono::NaiveDate;
use log::warn;
use rayon::prelude::*;

use crate::client::{Client, Goal};
use crate::error::{EngineError, EngineResult, LoadError};
use crate::portfolio::{Bucket, PortfolioAllocator, PortfolioYield};
use crate::solver::{GapResolver, GoalOutcome, GoalReport};
use crate::tables::RateTables;

/// Pre-loaded planner
///
/// # Example
/// ```ignore
/// let planner = GoalPlanner::from_csv(today)?;
/// for outcome in planner.resolve_all(&client, &goals) {
///     println!("{}: {:?}", outcome.goal_id(), outcome.report().map(|r| r.summary.has_gap));
/// }
/// ```
#[derive(Debug, Clone)]
pub struct GoalPlanner {
    tables: RateTables,
    today: NaiveDate,
}

impl GoalPlanner {
    /// Planner over the built-in market tables
    pub fn new(today: NaiveDate) -> Self {
        Self::with_tables(RateTables::default_market(), today)
    }

    /// Planner over tables loaded from data/tables/
    pub fn from_csv(today: NaiveDate) -> Result<Self, LoadError> {
        Ok(Self::with_tables(RateTables::from_csv()?, today))
    }

    /// Planner over tables loaded from a specific directory
    pub fn from_csv_path(path: &Path, today: NaiveDate) -> Result<Self, LoadError> {
        Ok(Self::with_tables(RateTables::from_csv_path(path)?, today))
    }

    pub fn with_tables(tables: RateTables, today: NaiveDate) -> Self {
        Self { tables, today }
    }

    pub fn tables(&self) -> &RateTables {
        &self.tables
    }

    /// Blended yields of both buckets for the goal's risk profile
    pub fn portfolio_yield(&self, goal: &Goal, term_months: u32) -> EngineResult<PortfolioYield> {
        let portfolio = self.tables.portfolios.get(&goal.portfolio).ok_or_else(|| {
            EngineError::Configuration(format!("unknown portfolio '{}'", goal.portfolio))
        })?;
        let profile = portfolio.profile(goal.risk_profile).ok_or_else(|| {
            EngineError::Configuration(format!(
                "portfolio '{}' has no {} profile",
                goal.portfolio,
                goal.risk_profile.as_str()
            ))
        })?;

        let allocator = PortfolioAllocator::new(&self.tables.products);
        let initial = allocator.resolve_yield_best_effort(
            profile,
            Bucket::InitialCapital,
            goal.initial_capital(),
            term_months,
        );
        let top_up = allocator.resolve_yield_best_effort(
            profile,
            Bucket::TopUp,
            goal.monthly_replenishment() * 12.0,
            term_months,
        );
        Ok(PortfolioYield::from_buckets(initial, top_up))
    }

    /// Resolve one goal end to end
    pub fn resolve_goal(&self, client: &Client, goal: &Goal) -> EngineResult<GoalReport> {
        let resolver = GapResolver::new(&self.tables, self.today);
        let term_months = resolver.effective_term(goal, client)?;
        let portfolio_yield = self.portfolio_yield(goal, term_months)?;
        resolver.resolve(goal, client, &portfolio_yield)
    }

    /// Resolve every goal; output order matches `goals`
    pub fn resolve_all(&self, client: &Client, goals: &[Goal]) -> Vec<GoalOutcome> {
        goals
            .par_iter()
            .map(|goal| match self.resolve_goal(client, goal) {
                Ok(report) => GoalOutcome::Resolved(Box::new(report)),
                Err(err) => {
                    warn!("goal '{}' failed: {}", goal.id, err);
                    GoalOutcome::failed(&goal.id, &err)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{GoalType, Sex};
    use crate::portfolio::RiskLevel;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn client() -> Client {
        Client::new(NaiveDate::from_ymd_opt(1990, 9, 1).unwrap(), Sex::Female, 95_000.0)
    }

    #[test]
    fn test_batch_isolates_failures() {
        let planner = GoalPlanner::new(today());
        let goals = vec![
            Goal::new("ok", GoalType::Reserve, 24, RiskLevel::Conservative).with_target(300_000.0),
            Goal::new("bad-term", GoalType::Life, -5, RiskLevel::Balanced).with_target(1.0),
            {
                let mut g = Goal::new("bad-portfolio", GoalType::Investment, 12, RiskLevel::Balanced)
                    .with_target(1.0);
                g.portfolio = "nope".into();
                g
            },
            Goal::new("pension", GoalType::Pension, 0, RiskLevel::Aggressive).with_desired_income(70_000.0),
        ];

        let outcomes = planner.resolve_all(&client(), &goals);
        let ids: Vec<&str> = outcomes.iter().map(|o| o.goal_id()).collect();
        assert_eq!(ids, vec!["ok", "bad-term", "bad-portfolio", "pension"]);

        assert!(outcomes[0].report().is_some());
        assert!(matches!(&outcomes[1], GoalOutcome::Failed { error, .. } if error.contains("validation")));
        assert!(matches!(&outcomes[2], GoalOutcome::Failed { error, .. } if error.contains("configuration")));
        assert!(outcomes[3].report().unwrap().state_pension.is_some());
    }

    #[test]
    fn test_portfolio_yield_per_bucket() {
        let planner = GoalPlanner::new(today());
        let goal = Goal::new("g", GoalType::Investment, 120, RiskLevel::Balanced)
            .with_target(1.0)
            .with_initial_capital(100_000.0);

        let yields = planner.portfolio_yield(&goal, 120).unwrap();
        // 60% bonds at 11% + 40% equity at 16%
        assert!((yields.initial_capital_percent - 13.0).abs() < 1e-9);
        assert!((yields.top_up_percent - 13.0).abs() < 1e-9);
        assert!(!yields.degraded);
    }

    #[test]
    fn test_degraded_yield_still_resolves() {
        let mut tables = RateTables::default_market();
        if let Some(portfolio) = tables.portfolios.get_mut("standard") {
            for profile in &mut portfolio.profiles {
                profile.top_up[0].share_percent = 10.0;
            }
        }
        let planner = GoalPlanner::with_tables(tables, today());
        let goal = Goal::new("g", GoalType::Investment, 60, RiskLevel::Conservative).with_target(800_000.0);

        let report = planner.resolve_goal(&client(), &goal).unwrap();
        assert!(report.summary.degraded_yield);
        assert!(!report.warnings.is_empty());
    }

    #[test]
    fn test_csv_tables_match_builtin_shape() {
        let planner = GoalPlanner::from_csv(today()).unwrap();
        let goal = Goal::new("g", GoalType::Investment, 120, RiskLevel::Balanced)
            .with_target(2_000_000.0)
            .with_replenishment(5_000.0);

        let report = planner.resolve_goal(&client(), &goal).unwrap();
        assert!(report.summary.converged);
        assert_eq!(report.trajectory.len(), 120);
    }

    #[test]
    fn test_sample_request() {
        let planner = GoalPlanner::from_csv(today()).unwrap();
        let request = crate::client::load_request("data/requests/sample.json").unwrap();

        let outcomes = planner.resolve_all(&request.client, &request.goals);
        assert_eq!(outcomes.len(), request.goals.len());
        assert!(outcomes.iter().all(|o| o.report().is_some()));

        let json = serde_json::to_value(&outcomes).unwrap();
        assert_eq!(json[0]["status"], "resolved");
        assert!(json[0]["state_pension"].is_object());
        assert!(json[2].get("pds_cofinancing").is_none());
    }
}
