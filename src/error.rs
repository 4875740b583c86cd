//! Error types for RSB scoring

use thiserror::Error;

/// Errors that can occur during scoring and analysis
///
/// Rejected subjects are not errors; see [`crate::types::Rejection`].
#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("Failed to parse subject payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    #[error("Invalid test design: {0}")]
    InvalidDesign(String),

    #[error("No valid data: {0}")]
    NoValidData(String),

    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    #[error("Subject source error: {0}")]
    Source(String),

    #[error("Export error: {0}")]
    Export(String),
}
