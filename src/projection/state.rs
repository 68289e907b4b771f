//! Running state of a simulation

/// State of the simulated account at a point in time
#[derive(Debug, Clone)]
pub struct SimulationState {
    /// Current month index (0-based)
    pub month: u32,

    /// Beginning of period balance
    pub bop_balance: f64,

    /// End of period balance
    pub eop_balance: f64,

    /// Contribution indexation factor for the current month
    pub indexation_factor: f64,
}

impl SimulationState {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            month: 0,
            bop_balance: initial_capital,
            eop_balance: initial_capital,
            indexation_factor: 1.0,
        }
    }

    /// Move to month `month`; BOP comes from the prior EOP
    pub fn advance_to(&mut self, month: u32, monthly_indexation: f64) {
        self.month = month;
        self.indexation_factor = (1.0 + monthly_indexation).powi(month as i32);
        self.bop_balance = self.eop_balance;
    }
}
