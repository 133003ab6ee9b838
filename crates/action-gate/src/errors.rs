//! Error types for result validation

use thiserror::Error;

/// Gate error enumeration
#[derive(Debug, Error, Clone)]
pub enum GateError {
    /// Rule pattern does not compile
    #[error("Invalid rule pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Rule definition is unusable
    #[error("Invalid rule: {0}")]
    InvalidRule(String),
}

impl GateError {
    /// Rule errors are configuration mistakes and never go away on retry
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            GateError::InvalidPattern { .. } | GateError::InvalidRule(_) => 2,
        }
    }
}
