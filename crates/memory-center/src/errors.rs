use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl MemoryError {
    /// Io failures may clear up on the next write; the others will not
    pub fn is_retryable(&self) -> bool {
        matches!(self, MemoryError::Io(_))
    }
}

pub type MemoryResult<T> = Result<T, MemoryError>;
