//! Gap resolution over the capital simulator

mod search;
mod resolver;
mod report;

pub use search::{bisect, SearchConfig, SearchOutcome};
pub use resolver::{annuity_capital, GapResolver, Resolution};
pub use report::{CofinancingReport, GoalOutcome, GoalReport, GoalSummary, PensionGap};
