//! Kernel error type

use thiserror::Error;
use crate::temporal::TemporalError;

/// Errors raised while building the ledger's environment
///
/// Ledger operations report `LedgerError`; this type covers what happens
/// before any closure is touched: reading settings and interpreting dates and
/// timezones.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Temporal error: {0}")]
    Temporal(#[from] TemporalError),

    /// Settings are unreadable or describe an unusable ledger
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl CoreError {
    pub fn configuration(message: impl Into<String>) -> Self {
        CoreError::Configuration(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, CoreError::Configuration(_))
    }
}
