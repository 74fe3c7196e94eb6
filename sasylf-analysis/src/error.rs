//! Analysis errors

use thiserror::Error;

/// Analysis result type
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while decoding checker output
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("checker produced no output")]
    EmptyOutput,

    #[error("checker output is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
