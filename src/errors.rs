//! Error handling module
//!
//! `ResilienceError` covers failures of this subsystem itself. Failures of the
//! automation primitive being guarded travel as [`OperationError`] and are
//! handed back to the caller untouched.

use action_gate::GateError;
use action_locator::LocatorError;
use memory_center::MemoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResilienceError {
    #[error(transparent)]
    Locator(#[from] LocatorError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl ResilienceError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ResilienceError::Locator(err) => err.is_retryable(),
            ResilienceError::Memory(err) => err.is_retryable(),
            ResilienceError::Gate(err) => err.is_retryable(),
            ResilienceError::Config(_) | ResilienceError::Cancelled => false,
        }
    }
}

impl From<serde_yaml::Error> for ResilienceError {
    fn from(err: serde_yaml::Error) -> Self {
        ResilienceError::Config(err.to_string())
    }
}

pub type ResilienceResult<T> = Result<T, ResilienceError>;

/// Failure reported by the guarded browser operation
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct OperationError {
    pub message: String,
    /// Raw stack trace, when the driver provides one
    #[serde(default)]
    pub stack: Option<String>,
}

impl OperationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl From<LocatorError> for OperationError {
    fn from(err: LocatorError) -> Self {
        OperationError::new(err.to_string())
    }
}
