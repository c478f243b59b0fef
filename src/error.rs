//! Error types for Restrun

use thiserror::Error;

/// Errors that can occur during analysis
///
/// "No data" is never an error: operations that can legitimately find nothing
/// return `Ok(None)` instead.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Sample provider failed: {0}")]
    ProviderError(String),

    #[error("Invalid analysis window: {0}")]
    InvalidWindow(String),

    #[error("Invalid cardio record: {0}")]
    InvalidRecord(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
