//! Error types for locator system

use thiserror::Error;

/// Locator error enumeration
#[derive(Debug, Error, Clone)]
pub enum LocatorError {
    /// Selector could not be parsed or evaluated
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Page-side query or evaluation failed
    #[error("DOM query failed: {0}")]
    Query(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LocatorError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, LocatorError::Query(_))
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            LocatorError::Internal(_) => 3,
            LocatorError::Query(_) => 2,
            LocatorError::InvalidSelector(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(LocatorError::Query("detached".into()).is_retryable());
        assert!(!LocatorError::InvalidSelector("##".into()).is_retryable());
        assert!(!LocatorError::Internal("bad snapshot".into()).is_retryable());
    }

    #[test]
    fn severity_ordering() {
        assert_eq!(LocatorError::Internal("x".into()).severity(), 3);
        assert_eq!(LocatorError::Query("x".into()).severity(), 2);
        assert_eq!(LocatorError::InvalidSelector("x".into()).severity(), 1);
    }
}
