//! Error taxonomy for goal resolution and table loading

use thiserror::Error;

/// Errors raised while resolving a single goal
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Missing or malformed rate tables; fatal to the goal being resolved
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Portfolio shares invalid or a product reference cannot be resolved
    #[error("allocation error: {0}")]
    Allocation(String),

    /// Contribution search exhausted its iteration budget
    #[error(
        "search did not converge after {iterations} iterations \
         (closest balance {closest:.2}, target {target:.2})"
    )]
    NonConvergence {
        iterations: u32,
        closest: f64,
        target: f64,
    },

    /// Goal or client input out of domain
    #[error("validation error: {0}")]
    Validation(String),
}

/// Errors raised while loading tables or requests from disk
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed {file}: {reason}")]
    Malformed { file: String, reason: String },
}

impl From<LoadError> for EngineError {
    fn from(err: LoadError) -> Self {
        EngineError::Configuration(err.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
