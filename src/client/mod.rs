//! Client and goal input records

mod data;
pub mod loader;

pub use data::{Asset, Client, ContributionTiming, Goal, GoalType, Sex};
pub use loader::{load_request, load_request_from_reader, GoalRequest};
