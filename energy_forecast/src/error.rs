//! Error types for the energy_forecast crate

use chrono::NaiveDate;
use thiserror::Error;

/// Custom error types for the energy_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// One or more startup dependencies are not loaded
    #[error("Service not ready: {0} not loaded")]
    ServiceNotReady(String),

    /// Not enough rows before the requested date to build a window
    #[error("Not enough data before {date} for prediction (need {required} prior rows)")]
    InsufficientHistory { date: NaiveDate, required: usize },

    /// A predictor slot of the ensemble is empty
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Required feature columns are missing from a data source
    #[error("Missing columns: {}", .0.join(", "))]
    Schema(Vec<String>),

    /// Scaler used before its parameters were fitted or loaded
    #[error("Scaler has not been fitted")]
    NotFitted,

    /// A window does not have the configured shape
    #[error("Window shape mismatch: expected {expected:?}, got {actual:?}")]
    WindowShape {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Error raised while evaluating a model
    #[error("Model error: {0}")]
    ModelError(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error reading or parsing configuration
    #[error("Config error: {0}")]
    ConfigError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error writing CSV output
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<polars::prelude::PolarsError> for ForecastError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::ConfigError(err.to_string())
    }
}
