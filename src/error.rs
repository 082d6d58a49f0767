//! Error types for the open court tooling.
//!
//! Aggregation and table functions never fail; errors only come from reading
//! files, parsing arguments, importing sheets and loading configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CourtError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// One entry per failing field, reported together.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<config::ConfigError> for CourtError {
    fn from(err: config::ConfigError) -> Self {
        CourtError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CourtError>;
