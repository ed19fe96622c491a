use thiserror::Error;

/// Result alias for normalizer entry points.
pub type NormalizeResult<T> = std::result::Result<T, NormalizeError>;

/// Hard normalizer failures.
///
/// Missing or malformed optional fields are never errors; they surface as
/// warnings on a partial outcome instead.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Payload kind the normalizer cannot route (unrecognized binary).
    #[error("[CreditReport] unsupported report format: {0}")]
    UnsupportedFormat(String),

    /// Caller forced the JSON path but the text is not JSON.
    #[error("[CreditReport] payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// OCR / PDF text extraction failed or is not available.
    #[error("[CreditReport] text extraction unavailable: {0}")]
    Extraction(String),
}
