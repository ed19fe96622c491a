//! Unified error types for the store crate.

use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Update or read-by-id on a document that does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing / serialization errors.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Document body, patch or identifier the store refuses to accept.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}
