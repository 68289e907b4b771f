//! Capital simulation and co-financing

mod state;
mod engine;
mod trajectory;
mod cofinancing;

pub use state::SimulationState;
pub use engine::{monthly_rate, simulate, yearly_contributions, Lump, LumpKind, SimulationConfig, Simulator};
pub use trajectory::{MonthRow, Trajectory, YearSummary};
pub use cofinancing::{apply_cofinancing, CofinancingCalculator, CofinancingSchedule, YearlyBenefit};
