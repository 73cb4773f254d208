use thiserror::Error;

/// Unified error type for the bill/expense engine.
///
/// `Conflict`, `NotFound`, `Precondition` and `Validation` are surfaced to the
/// caller as-is; the engine never retries or silently resolves them.
#[derive(Debug, Error)]
pub enum BillError {
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Precondition failed: {0}")]
    Precondition(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, BillError>;

impl From<std::io::Error> for BillError {
    fn from(err: std::io::Error) -> Self {
        BillError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for BillError {
    fn from(err: serde_json::Error) -> Self {
        BillError::Storage(err.to_string())
    }
}
