//! Crate-wide error hierarchy for the dispute engine.
//!
//! Only hard failures travel through [`EngineError`]: store writes, bad
//! configuration, invalid arguments. Soft outcomes (no report, unusable
//! reasoning response, a single failed letter) are values, not errors.

use credit_report::NormalizeError;
use dispute_store::StoreError;
use reasoning_service::ReasoningError;
use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Reasoning-service configuration or call failure that was not routed
    /// to a fallback.
    #[error(transparent)]
    Reasoning(#[from] ReasoningError),

    /// Input validation errors (zero round size, unknown format hint, ...).
    #[error("validation error: {0}")]
    Validation(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Store(StoreError::Serde(e))
    }
}
