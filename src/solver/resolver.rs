//! Gap resolution: finds the monthly contribution that meets a goal
//!
//! The balance is split into a capital leg (initial capital and unlocked
//! assets, grown at the initial-capital yield) and a contribution leg
//! (indexed contributions plus co-financing, grown at the top-up yield).
//! Every probe of the search re-runs the contribution leg end to end because
//! co-financing is a non-linear function of the contribution.

use chrono::NaiveDate;
use log::{debug, info, warn};

use super::report::{CofinancingReport, GoalReport, GoalSummary, PensionGap};
use super::search::{bisect, SearchConfig, SearchOutcome};
use crate::client::{Client, Goal};
use crate::error::{EngineError, EngineResult};
use crate::pension::{StatePensionEstimate, StatePensionEstimator};
use crate::portfolio::PortfolioYield;
use crate::projection::{
    monthly_rate, yearly_contributions, CofinancingCalculator, CofinancingSchedule, Lump, LumpKind,
    SimulationConfig, Simulator, Trajectory,
};
use crate::round_money;
use crate::tables::{EconomicSettings, IncomeBasis, PdsSettings, PensionSettings, RateTables};

/// Capital needed to pay `monthly_income` for `months` months at `annual_yield_percent`
pub fn annuity_capital(monthly_income: f64, annual_yield_percent: f64, months: u32) -> f64 {
    let r = monthly_rate(annual_yield_percent);
    if r.abs() < 1e-12 {
        monthly_income * months as f64
    } else {
        monthly_income * (1.0 - (1.0 + r).powi(-(months as i32))) / r
    }
}

/// One resolution pass, with or without co-financing
#[derive(Debug, Clone)]
pub struct Resolution {
    pub projected_value: f64,
    pub recommended_replenishment: f64,
    pub converged: bool,
    pub iterations: u32,
    /// Trajectory of the recommended plan
    pub trajectory: Trajectory,
    pub cofinancing: CofinancingSchedule,
}

/// Everything fixed for a goal before the search starts
struct GoalSetup {
    term_months: u32,
    capital_leg: Trajectory,
    top_up: Simulator,
    indexation_percent: f64,
    cofinancing: Option<(CofinancingCalculator, u32)>,
}

impl GoalSetup {
    /// Combined trajectory and co-financing for one contribution level
    fn run(&self, monthly_contribution: f64, with_cofinancing: bool) -> (Trajectory, CofinancingSchedule) {
        let schedule = match (&self.cofinancing, with_cofinancing) {
            (Some((calculator, duration_years)), true) => {
                let yearly = yearly_contributions(monthly_contribution, self.term_months, self.indexation_percent);
                calculator.schedule(&yearly, *duration_years)
            }
            _ => CofinancingSchedule::default(),
        };
        let lumps = schedule.lumps(self.term_months);
        let contribution_leg = self.top_up.run_with_lumps(0.0, monthly_contribution, &lumps);
        (self.capital_leg.combine(&contribution_leg), schedule)
    }

    fn final_balance(&self, monthly_contribution: f64, with_cofinancing: bool) -> f64 {
        self.run(monthly_contribution, with_cofinancing).0.final_balance()
    }
}

pub struct GapResolver<'a> {
    tables: &'a RateTables,
    today: NaiveDate,
    search: SearchConfig,
}

impl<'a> GapResolver<'a> {
    pub fn new(tables: &'a RateTables, today: NaiveDate) -> Self {
        Self {
            tables,
            today,
            search: SearchConfig::default(),
        }
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    fn economic(&self, goal: &Goal) -> EngineResult<EconomicSettings> {
        Ok(EconomicSettings::from_settings(&self.tables.settings)?.with_override(goal.inflation_rate))
    }

    fn pension_estimator(&self, goal: &Goal) -> EngineResult<StatePensionEstimator> {
        let pension = PensionSettings::from_settings(&self.tables.settings)?;
        Ok(StatePensionEstimator::new(pension, self.economic(goal)?.inflation_rate))
    }

    /// Goal term; a pension goal with no term runs until retirement
    pub fn effective_term(&self, goal: &Goal, client: &Client) -> EngineResult<u32> {
        if goal.term_months < 0 {
            return Err(EngineError::Validation(format!(
                "goal '{}': negative term {}",
                goal.id, goal.term_months
            )));
        }
        if goal.goal_type.is_income_goal() && goal.term_months == 0 {
            return Ok(self.pension_estimator(goal)?.months_to_retirement(client, self.today));
        }
        Ok(goal.term_months as u32)
    }

    pub fn resolve(&self, goal: &Goal, client: &Client, portfolio_yield: &PortfolioYield) -> EngineResult<GoalReport> {
        goal.validate()?;
        client.validate(self.today)?;

        let mut warnings = portfolio_yield.warnings.clone();
        let economic = self.economic(goal)?;
        let term_months = self.effective_term(goal, client)?;
        let setup = self.setup(goal, client, portfolio_yield, &economic, term_months, &mut warnings)?;

        let mut state_pension = None;
        let mut pension_gap = None;
        let target_amount = match goal.desired_monthly_income {
            Some(desired) if goal.goal_type.is_income_goal() => {
                let estimate = self.pension_estimator(goal)?.estimate(client, self.today);
                let years = term_months as f64 / 12.0;
                let desired_future = desired * (1.0 + economic.expense_growth_rate / 100.0).powf(years);
                let payout_months = PensionSettings::from_settings(&self.tables.settings)?.payout_months;

                // capital only has to fund what the state pension leaves uncovered
                let gap_future = (desired_future - estimate.monthly_future).max(0.0);
                pension_gap = Some(pension_gap_for(desired, desired_future, &estimate));
                state_pension = Some(rounded_estimate(estimate));
                annuity_capital(gap_future, portfolio_yield.top_up_percent, payout_months)
            }
            _ => goal.target_amount.unwrap_or(0.0),
        };

        let with = self.resolve_once(goal, &setup, target_amount, true, &mut warnings);
        let without = if setup.cofinancing.is_some() {
            self.resolve_once(goal, &setup, target_amount, false, &mut warnings)
        } else {
            with.clone()
        };

        let has_gap = match &pension_gap {
            Some(gap) => gap.has_gap,
            None => with.projected_value < target_amount,
        };

        let pds_cofinancing = setup.cofinancing.as_ref().map(|(calculator, _)| CofinancingReport {
            ratio: calculator.ratio(),
            relevant_income: round_money(calculator.relevant_income()),
            total_benefit: round_money(with.cofinancing.within(term_months).map(|b| b.benefit).sum()),
            yearly: with.cofinancing.within(term_months).cloned().collect(),
            beyond_horizon: with.cofinancing.beyond(term_months).cloned().collect(),
        });

        let dropped = with.cofinancing.beyond(term_months).count();
        if dropped > 0 {
            warnings.push(format!(
                "{} co-financing payment(s) fall after the {}-month term and are not projected",
                dropped, term_months
            ));
        }

        info!(
            "goal '{}': target {:.2}, projected {:.2}, recommended {:.2} after {} probes ({:.2} without co-financing)",
            goal.id,
            target_amount,
            with.projected_value,
            with.recommended_replenishment,
            with.iterations,
            without.recommended_replenishment
        );

        Ok(GoalReport {
            goal_id: goal.id.clone(),
            summary: GoalSummary {
                goal_type: goal.goal_type,
                term_months,
                target_amount: round_money(target_amount),
                initial_capital: round_money(setup.capital_leg.initial_capital),
                projected_value: round_money(with.projected_value),
                projected_value_without_cofinancing: round_money(without.projected_value),
                recommended_replenishment: round_money(with.recommended_replenishment),
                recommended_replenishment_without_cofinancing: round_money(without.recommended_replenishment),
                has_gap,
                converged: with.converged,
                converged_without_cofinancing: without.converged,
                initial_capital_yield_percent: portfolio_yield.initial_capital_percent,
                top_up_yield_percent: portfolio_yield.top_up_percent,
                degraded_yield: portfolio_yield.degraded,
            },
            state_pension,
            pension_gap,
            pds_cofinancing,
            yearly: with.trajectory.yearly_summary(),
            trajectory: with.trajectory.balances().into_iter().map(round_money).collect(),
            warnings,
        })
    }

    fn setup(
        &self,
        goal: &Goal,
        client: &Client,
        portfolio_yield: &PortfolioYield,
        economic: &EconomicSettings,
        term_months: u32,
        warnings: &mut Vec<String>,
    ) -> EngineResult<GoalSetup> {
        let mut initial_capital = goal.initial_capital();
        let mut asset_lumps = Vec::new();
        if goal.include_client_assets {
            for asset in &client.assets {
                if asset.unlock_month == 0 {
                    initial_capital += asset.amount;
                } else if asset.unlock_month < term_months {
                    asset_lumps.push(Lump {
                        month: asset.unlock_month,
                        amount: asset.amount,
                        kind: LumpKind::Asset,
                    });
                } else {
                    warnings.push(format!(
                        "{} asset of {:.2} unlocks at month {}, after the {}-month term",
                        asset.asset_type, asset.amount, asset.unlock_month, term_months
                    ));
                }
            }
        }

        let indexation_percent = economic.monthly_indexation_percent();
        let config = |annual_yield_percent: f64| SimulationConfig {
            term_months,
            annual_yield_percent,
            monthly_indexation_percent: indexation_percent,
            timing: goal.contribution_timing,
        };

        let capital_leg = Simulator::new(config(portfolio_yield.initial_capital_percent))
            .run_with_lumps(initial_capital, 0.0, &asset_lumps);
        let top_up = Simulator::new(config(portfolio_yield.top_up_percent));

        let cofinancing = if goal.cofinancing && !self.tables.pds_brackets.is_empty() {
            let pds = PdsSettings::from_settings(&self.tables.settings)?;
            let tax = match pds.income_basis {
                IncomeBasis::Net => Some(self.tables.tax_schedule()?),
                IncomeBasis::Gross => None,
            };
            let calculator = CofinancingCalculator::new(
                &pds,
                &self.tables.pds_brackets,
                client.average_monthly_income,
                tax.as_ref(),
            )?;
            Some((calculator, pds.duration_years))
        } else {
            None
        };

        Ok(GoalSetup {
            term_months,
            capital_leg,
            top_up,
            indexation_percent,
            cofinancing,
        })
    }

    fn resolve_once(
        &self,
        goal: &Goal,
        setup: &GoalSetup,
        target_amount: f64,
        with_cofinancing: bool,
        warnings: &mut Vec<String>,
    ) -> Resolution {
        let stated = goal.monthly_replenishment();
        let (trajectory, cofinancing) = setup.run(stated, with_cofinancing);
        let projected_value = trajectory.final_balance();

        // a zero target (no pension gap) lands here too, so no search runs
        if projected_value >= target_amount {
            debug!("goal '{}': stated contribution {:.2} already meets target", goal.id, stated);
            return Resolution {
                projected_value,
                recommended_replenishment: stated,
                converged: true,
                iterations: 0,
                trajectory,
                cofinancing,
            };
        }

        let upper = target_amount.max(stated);
        let outcome: SearchOutcome = bisect(
            |contribution| setup.final_balance(contribution, with_cofinancing),
            target_amount,
            0.0,
            upper,
            &self.search,
        );

        if !outcome.converged {
            let err = EngineError::NonConvergence {
                iterations: outcome.iterations,
                closest: outcome.achieved,
                target: target_amount,
            };
            warn!("goal '{}': {}", goal.id, err);
            warnings.push(err.to_string());
        }

        let (trajectory, cofinancing) = setup.run(outcome.value, with_cofinancing);
        Resolution {
            projected_value,
            recommended_replenishment: outcome.value,
            converged: outcome.converged,
            iterations: outcome.iterations,
            trajectory,
            cofinancing,
        }
    }
}

fn pension_gap_for(desired: f64, desired_future: f64, estimate: &StatePensionEstimate) -> PensionGap {
    let gap_monthly_future = desired_future - estimate.monthly_future;
    PensionGap {
        has_gap: gap_monthly_future > 0.0,
        desired_monthly_income: round_money(desired),
        desired_monthly_income_future: round_money(desired_future),
        gap_monthly_current: round_money(desired - estimate.monthly_current),
        gap_monthly_future: round_money(gap_monthly_future),
    }
}

fn rounded_estimate(estimate: StatePensionEstimate) -> StatePensionEstimate {
    StatePensionEstimate {
        monthly_current: round_money(estimate.monthly_current),
        monthly_future: round_money(estimate.monthly_future),
        ..estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ContributionTiming, GoalType, Sex};
    use crate::portfolio::RiskLevel;
    use crate::projection::{simulate, YearlyBenefit};
    use crate::tables::{keys, TaxBracket};
    use approx::assert_abs_diff_eq;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    fn client() -> Client {
        Client::new(NaiveDate::from_ymd_opt(1985, 5, 20).unwrap(), Sex::Male, 70_000.0)
    }

    fn investment(target: f64, term: i32) -> Goal {
        Goal::new("inv", GoalType::Investment, term, RiskLevel::Balanced)
            .with_target(target)
            .with_initial_capital(100_000.0)
    }

    #[test]
    fn test_annuity_capital() {
        assert_abs_diff_eq!(annuity_capital(1_000.0, 0.0, 240), 240_000.0);
        let capital = annuity_capital(1_000.0, 8.0, 240);
        assert!(capital < 240_000.0 && capital > 100_000.0);
    }

    #[test]
    fn test_cofinancing_adds_compounded_benefits() {
        // 100k initial, 10k/month, 15 years, 0.33%/month indexation, 13% yield,
        // 1:1 tier capped at 36k for 10 years
        let term = 180;
        let r = monthly_rate(13.0);
        let pds = PdsSettings::default();
        let calculator =
            CofinancingCalculator::new(&pds, &crate::tables::default_income_brackets(), 50_000.0, None).unwrap();

        let yearly = yearly_contributions(10_000.0, term, 0.33);
        let schedule = calculator.schedule(&yearly, pds.duration_years);
        assert_eq!(schedule.benefits.len(), 10);
        assert!(schedule.benefits.iter().all(|b| b.capped && b.benefit == 36_000.0));

        let config = SimulationConfig {
            term_months: term,
            annual_yield_percent: 13.0,
            monthly_indexation_percent: 0.33,
            timing: ContributionTiming::Ordinary,
        };
        let with = Simulator::new(config.clone()).run_with_lumps(100_000.0, 10_000.0, &schedule.lumps(term));
        let without = simulate(100_000.0, 10_000.0, term, 13.0, 0.33, ContributionTiming::Ordinary);

        let compounded: f64 = schedule
            .benefits
            .iter()
            .map(|b: &YearlyBenefit| b.benefit * (1.0 + r).powi((term - 1 - b.injection_month) as i32))
            .sum();
        let uplift = with.final_balance() - without.final_balance();
        assert!(uplift >= compounded - 1e-3);
        assert_abs_diff_eq!(uplift, compounded, epsilon = 1e-2);
    }

    #[test]
    fn test_gap_closed_by_search() {
        let tables = RateTables::default_market();
        let resolver = GapResolver::new(&tables, today());
        let goal = investment(3_000_000.0, 120);

        let report = resolver.resolve(&goal, &client(), &PortfolioYield::uniform(13.0)).unwrap();
        let summary = &report.summary;

        assert!(summary.has_gap);
        assert!(summary.converged && summary.converged_without_cofinancing);
        assert!(summary.recommended_replenishment > 0.0);
        assert!(summary.recommended_replenishment < summary.recommended_replenishment_without_cofinancing);

        let final_balance = *report.trajectory.last().unwrap();
        assert!((final_balance - 3_000_000.0).abs() <= 300.01);
        assert_eq!(report.trajectory.len(), 120);
        assert_eq!(report.yearly.len(), 10);

        let pds = report.pds_cofinancing.as_ref().unwrap();
        assert_eq!(pds.ratio, Some(1.0));
        assert_eq!(pds.yearly.len(), 9); // years 2..=10 fall inside a 10-year term
        assert_eq!(pds.beyond_horizon.len(), 1);
    }

    #[test]
    fn test_stated_contribution_meets_target() {
        let tables = RateTables::default_market();
        let resolver = GapResolver::new(&tables, today());
        let goal = investment(500_000.0, 60).with_replenishment(10_000.0);

        let report = resolver.resolve(&goal, &client(), &PortfolioYield::uniform(10.0)).unwrap();
        assert!(!report.summary.has_gap);
        assert_eq!(report.summary.recommended_replenishment, 10_000.0);
        assert_eq!(report.summary.recommended_replenishment_without_cofinancing, 10_000.0);
        assert!(report.summary.projected_value > report.summary.projected_value_without_cofinancing);
    }

    #[test]
    fn test_cofinancing_disabled() {
        let tables = RateTables::default_market();
        let resolver = GapResolver::new(&tables, today());
        let mut goal = investment(1_000_000.0, 60);
        goal.cofinancing = false;

        let report = resolver.resolve(&goal, &client(), &PortfolioYield::uniform(10.0)).unwrap();
        assert!(report.pds_cofinancing.is_none());
        assert_eq!(
            report.summary.recommended_replenishment,
            report.summary.recommended_replenishment_without_cofinancing
        );
    }

    #[test]
    fn test_pension_goal_reports_state_pension() {
        let tables = RateTables::default_market();
        let resolver = GapResolver::new(&tables, today());
        let goal = Goal::new("pension", GoalType::Pension, 0, RiskLevel::Conservative)
            .with_desired_income(90_000.0);

        let report = resolver.resolve(&goal, &client(), &PortfolioYield::uniform(9.0)).unwrap();
        let pension = report.state_pension.as_ref().unwrap();
        let gap = report.pension_gap.as_ref().unwrap();

        // born May 1985, male: 65 in May 2050
        assert_eq!(report.summary.term_months, 305);
        assert!(pension.monthly_future > pension.monthly_current);
        assert_eq!(gap.has_gap, report.summary.has_gap);
        assert!(gap.has_gap);
        assert!(report.summary.recommended_replenishment > 0.0);

        // only the part the state pension leaves uncovered is capitalised
        let payout = PensionSettings::default().payout_months;
        assert_abs_diff_eq!(
            report.summary.target_amount,
            annuity_capital(gap.gap_monthly_future, 9.0, payout),
            epsilon = 1.0
        );
        assert!(report.summary.target_amount < annuity_capital(gap.desired_monthly_income_future, 9.0, payout));
    }

    #[test]
    fn test_state_pension_covers_desired_income() {
        let tables = RateTables::default_market();
        let resolver = GapResolver::new(&tables, today());
        let wealthy = Client::new(NaiveDate::from_ymd_opt(1985, 5, 20).unwrap(), Sex::Male, 300_000.0);
        // below the fixed payment alone, and both grow at 4%
        let goal = Goal::new("pension", GoalType::Pension, 0, RiskLevel::Balanced).with_desired_income(5_000.0);

        let report = resolver.resolve(&goal, &wealthy, &PortfolioYield::uniform(10.0)).unwrap();
        let gap = report.pension_gap.as_ref().unwrap();
        let summary = &report.summary;

        assert!(!gap.has_gap);
        assert!(gap.gap_monthly_future < 0.0);
        assert!(!summary.has_gap);
        assert_eq!(summary.target_amount, 0.0);
        assert_eq!(summary.recommended_replenishment, 0.0);
        assert_eq!(summary.recommended_replenishment_without_cofinancing, 0.0);
        assert!(summary.converged && summary.converged_without_cofinancing);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_cofinancing_threshold_straddling_target() {
        let tables = RateTables::default_market();
        let resolver = GapResolver::new(&tables, today());
        let goal = Goal::new("jump", GoalType::Investment, 24, RiskLevel::Balanced).with_target(5_000.0);

        // at 0% the year-1 match of 2_000 lifts the balance from about 4_100 to about 6_100
        let report = resolver.resolve(&goal, &client(), &PortfolioYield::uniform(0.0)).unwrap();
        let summary = &report.summary;

        assert!(!summary.converged);
        assert!(report.warnings.iter().any(|w| w.contains("did not converge")));
        let final_balance = *report.trajectory.last().unwrap();
        assert!(final_balance > 6_000.0);

        let pds = report.pds_cofinancing.as_ref().unwrap();
        assert_eq!(pds.yearly.len(), 1);
        assert!(pds.yearly[0].contribution >= 2_000.0 && pds.yearly[0].contribution < 2_000.1);

        // without the match the balance is continuous in the contribution
        assert!(summary.converged_without_cofinancing);
        assert!(summary.recommended_replenishment < summary.recommended_replenishment_without_cofinancing);
    }

    #[test]
    fn test_recommendation_bound_by_cofinancing_cap() {
        let tables = RateTables::default_market();
        let resolver = GapResolver::new(&tables, today());
        let goal = investment(3_000_000.0, 120);

        let report = resolver.resolve(&goal, &client(), &PortfolioYield::uniform(13.0)).unwrap();
        assert!(report.summary.converged);
        assert!(report.summary.recommended_replenishment * 12.0 > 36_000.0);

        let pds = report.pds_cofinancing.as_ref().unwrap();
        assert!(pds.yearly.iter().all(|b| b.capped && b.benefit == 36_000.0));
        assert_abs_diff_eq!(pds.total_benefit, 9.0 * 36_000.0);
    }

    #[test]
    fn test_deterministic() {
        let tables = RateTables::default_market();
        let resolver = GapResolver::new(&tables, today());
        let goal = investment(2_000_000.0, 96);
        let yields = PortfolioYield::uniform(11.0);

        let first = resolver.resolve(&goal, &client(), &yields).unwrap();
        let second = resolver.resolve(&goal, &client(), &yields).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_negative_term_rejected() {
        let tables = RateTables::default_market();
        let resolver = GapResolver::new(&tables, today());
        let goal = investment(1_000.0, -12);

        let err = resolver.resolve(&goal, &client(), &PortfolioYield::uniform(5.0)).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_zero_term_gap_does_not_converge() {
        let tables = RateTables::default_market();
        let resolver = GapResolver::new(&tables, today());
        let goal = investment(1_000_000.0, 0);

        let report = resolver.resolve(&goal, &client(), &PortfolioYield::uniform(5.0)).unwrap();
        assert!(report.summary.has_gap);
        assert!(!report.summary.converged);
        assert_eq!(report.summary.projected_value, 100_000.0);
        assert!(report.warnings.iter().any(|w| w.contains("did not converge")));
    }

    #[test]
    fn test_bad_tax_scale_fails_net_basis_goal() {
        let mut tables = RateTables::default_market();
        tables.settings = tables.settings.clone().with_string(keys::PDS_INCOME_BASIS, "net");
        tables.tax_brackets = vec![TaxBracket {
            order_index: 1,
            income_from: 1_000.0,
            income_to: 2_000.0,
            rate: 0.13,
        }];
        let resolver = GapResolver::new(&tables, today());

        let err = resolver
            .resolve(&investment(1_000_000.0, 60), &client(), &PortfolioYield::uniform(5.0))
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_assets_unlock_into_capital_leg() {
        let tables = RateTables::default_market();
        let resolver = GapResolver::new(&tables, today());
        let mut client = client();
        client.assets = vec![
            crate::client::Asset { asset_type: "deposit".into(), amount: 50_000.0, unlock_month: 0 },
            crate::client::Asset { asset_type: "bond".into(), amount: 20_000.0, unlock_month: 6 },
            crate::client::Asset { asset_type: "car".into(), amount: 1_000.0, unlock_month: 99 },
        ];
        let mut goal = investment(10_000_000.0, 12);
        goal.include_client_assets = true;
        goal.cofinancing = false;

        let report = resolver.resolve(&goal, &client, &PortfolioYield::uniform(0.0)).unwrap();
        assert_eq!(report.summary.initial_capital, 150_000.0);
        assert_eq!(report.summary.projected_value, 170_000.0);
        assert!(report.warnings.iter().any(|w| w.contains("car")));
    }
}
