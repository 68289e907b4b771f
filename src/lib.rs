//! Goal Planner - projection and gap-resolution engine for financial goals
//!
//! This library provides:
//! - Month-by-month capital simulation with indexed contributions
//! - State co-financing (PDS) of voluntary contributions
//! - Progressive income tax and state pension (IPK) estimation
//! - Blended portfolio yields per risk profile
//! - Contribution search closing the gap to each goal's target

pub mod error;
pub mod tables;
pub mod client;
pub mod portfolio;
pub mod projection;
pub mod pension;
pub mod solver;
pub mod planner;

// Re-export commonly used types
pub use error::{EngineError, EngineResult, LoadError};
pub use client::{Client, Goal, GoalType, GoalRequest};
pub use tables::RateTables;
pub use portfolio::{PortfolioYield, RiskLevel};
pub use projection::{simulate, Simulator, Trajectory};
pub use pension::{estimate_state_pension, StatePensionEstimate};
pub use solver::{GapResolver, GoalOutcome, GoalReport};
pub use planner::GoalPlanner;

/// Round a currency amount to cents
pub fn round_money(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
