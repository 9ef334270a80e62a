//! CLI error types.

use risk_core::types::AggregationError;
use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Bad command-line argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration file could not be read or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input is not a valid aggregation request.
    #[error("Invalid input {path}: {source}")]
    Input {
        /// Input path.
        path: String,
        /// Parse failure.
        source: serde_json::Error,
    },

    /// Aggregation was rejected or failed.
    #[error("Aggregation failed [{code}]: {0}", code = .0.code())]
    Aggregation(#[from] AggregationError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Output could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}

impl From<csv::Error> for CliError {
    fn from(e: csv::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}

/// CLI result type.
pub type Result<T> = std::result::Result<T, CliError>;
