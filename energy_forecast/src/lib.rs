//! # Energy Forecast
//!
//! A Rust library for windowed inference and multi-day forecasting of daily
//! building energy signals.
//!
//! ## Features
//!
//! - Daily multivariate tables loaded from CSV (polars)
//! - Min-max and standard feature scaling with persisted parameters
//! - Fixed-length history windows anchored on a date
//! - Feed-forward and LSTM predictors evaluated from JSON weight files
//! - An ensemble that averages both predictors elementwise
//! - Autoregressive forecasting that feeds normalized predictions back
//! - Accuracy evaluation of point predictions over a date range
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use energy_forecast::config::ServiceConfig;
//! use energy_forecast::service::ServiceContext;
//! use chrono::NaiveDate;
//!
//! let config = ServiceConfig::from_file("service.toml")?;
//! let context = ServiceContext::load(&config)?;
//!
//! // Prediction for one day from the thirty days before it
//! let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
//! let point = context.predict_at(date)?;
//! println!("{}", serde_json::to_string_pretty(&point)?);
//!
//! // Three months past the end of the table
//! let forecast = context.forecast_months(3)?;
//! forecast.write_csv(std::io::stdout())?;
//! # Ok::<(), energy_forecast::ForecastError>(())
//! ```

pub mod config;
pub mod data;
pub mod ensemble;
pub mod error;
pub mod forecaster;
pub mod metrics;
pub mod models;
pub mod prediction;
pub mod scaler;
pub mod service;
pub mod utils;
pub mod window;

// Re-export commonly used types
pub use crate::config::{HorizonPolicy, ServiceConfig};
pub use crate::data::{DataLoader, FeatureSchema, TimeSeriesTable};
pub use crate::ensemble::EnsemblePredictor;
pub use crate::error::{ForecastError, Result};
pub use crate::forecaster::AutoregressiveForecaster;
pub use crate::models::Predictor;
pub use crate::prediction::{ForecastResult, PointPrediction, PredictionVector};
pub use crate::scaler::FeatureScaler;
pub use crate::service::{Readiness, ServiceContext};
pub use crate::window::Window;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
