//! Error types for the spend library

use thiserror::Error;

/// Errors raised while configuring or querying spend components
#[derive(Debug, Error, PartialEq)]
pub enum SpendError {
    /// Alert thresholds must be finite, positive and strictly ascending
    #[error("invalid budget thresholds: warning={warning}, critical={critical}, exceeded={exceeded}")]
    InvalidThresholds {
        warning: f64,
        critical: f64,
        exceeded: f64,
    },

    #[error("tick interval must be greater than zero")]
    ZeroTickInterval,

    #[error("monthly budget must be a positive amount, got {0}")]
    InvalidBudget(f64),

    #[error("unknown experiment: {0}")]
    UnknownExperiment(String),
}

pub type Result<T> = std::result::Result<T, SpendError>;
