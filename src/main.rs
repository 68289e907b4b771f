//! Goal Planner CLI
//!
//! Resolves every goal of a JSON request against a directory of rate tables
//! and prints the per-goal reports as JSON.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use log::info;

use goal_planner::client::load_request;
use goal_planner::{GoalOutcome, GoalPlanner, RateTables};

#[derive(Debug, Parser)]
#[command(name = "goal_planner")]
#[command(about = "Project financial goals and resolve the contribution gap")]
struct Args {
    /// Directory holding the rate-table CSV files
    #[arg(long, default_value = "data/tables")]
    tables: PathBuf,

    /// Client and goals as JSON
    #[arg(long)]
    request: PathBuf,

    /// Valuation date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long, help = "Pretty-print the JSON output")]
    pretty: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let today = args.date.unwrap_or_else(|| chrono::Local::now().date_naive());
    let tables = RateTables::from_csv_path(&args.tables)
        .with_context(|| format!("loading rate tables from {}", args.tables.display()))?;
    let request = load_request(&args.request)
        .with_context(|| format!("loading request {}", args.request.display()))?;

    info!(
        "resolving {} goals as of {} ({} products, {} portfolios)",
        request.goals.len(),
        today,
        tables.products.len(),
        tables.portfolios.len()
    );

    let planner = GoalPlanner::with_tables(tables, today);
    let outcomes = planner.resolve_all(&request.client, &request.goals);

    let failed = outcomes
        .iter()
        .filter(|o| matches!(o, GoalOutcome::Failed { .. }))
        .count();
    info!("{} resolved, {} failed", outcomes.len() - failed, failed);

    let json = if args.pretty {
        serde_json::to_string_pretty(&outcomes)?
    } else {
        serde_json::to_string(&outcomes)?
    };
    println!("{}", json);

    Ok(())
}
