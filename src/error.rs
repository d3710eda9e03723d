//! Error types shared across the simulation pipeline.

use thiserror::Error;

/// Errors that abort a single simulation run or trial.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    /// State became non-finite, or the integrator ran out of its step budget.
    #[error("numerical divergence at t = {time_min:.4} min: {reason}")]
    NumericalDivergence { time_min: f64, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

impl SimulationError {
    pub fn divergence(time_min: f64, reason: impl Into<String>) -> Self {
        SimulationError::NumericalDivergence {
            time_min,
            reason: reason.into(),
        }
    }
}

/// Configuration validation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{field} must be {requirement}, got {value}")]
    OutOfRange {
        field: &'static str,
        requirement: &'static str,
        value: f64,
    },

    #[error("response window does not fit the trajectory: {0}")]
    Window(String),

    #[error("mixture distribution is invalid: {0}")]
    Mixture(String),
}

pub type Result<T> = std::result::Result<T, SimulationError>;
