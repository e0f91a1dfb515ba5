//! Autoregressive multi-step forecasting
//!
//! Each step runs the ensemble on a normalized rolling window, reports the
//! denormalized prediction for the next day and then advances the window
//! with the normalized prediction itself. The reported value is never fed
//! back, so no scale round trip enters the carried state.
//!
//! Steps are strictly sequential: step `i + 1` reads step `i`'s output.

use crate::data::TimeSeriesTable;
use crate::ensemble::EnsemblePredictor;
use crate::error::{ForecastError, Result};
use crate::prediction::{ForecastPoint, ForecastResult, PredictionVector};
use crate::scaler::FeatureScaler;
use crate::utils::forecast_end;
use crate::window::{last_window, Window};
use tracing::debug;

/// Rolls the ensemble forward from the end of a table
#[derive(Debug, Clone, Copy)]
pub struct AutoregressiveForecaster<'a> {
    ensemble: &'a EnsemblePredictor,
    scaler: &'a FeatureScaler,
    window_length: usize,
}

impl<'a> AutoregressiveForecaster<'a> {
    /// Create a forecaster over loaded dependencies
    pub fn new(ensemble: &'a EnsemblePredictor, scaler: &'a FeatureScaler, window_length: usize) -> Self {
        Self {
            ensemble,
            scaler,
            window_length,
        }
    }

    /// Normalized window over the table's last `window_length` rows
    pub fn initial_window(&self, table: &TimeSeriesTable) -> Result<Window> {
        let last_date = table
            .last_date()
            .ok_or_else(|| ForecastError::DataError("Table is empty".to_string()))?;
        let raw = last_window(table, self.window_length).ok_or_else(|| {
            ForecastError::InsufficientHistory {
                date: last_date.succ_opt().unwrap_or(last_date),
                required: self.window_length,
            }
        })?;
        raw.ensure_finite()?;

        Window::new(self.scaler.normalize(raw.values())?, self.window_length)
    }

    /// Forecast exactly `horizon_days` days after the table's last date
    pub fn forecast(&self, table: &TimeSeriesTable, horizon_days: usize) -> Result<ForecastResult> {
        let mut window = self.initial_window(table)?;
        let last_date = table
            .last_date()
            .ok_or_else(|| ForecastError::DataError("Table is empty".to_string()))?;
        forecast_end(last_date, horizon_days)?;
        let schema = table.schema().clone();

        let mut points = Vec::new();
        for step in 0..horizon_days {
            let date = forecast_end(last_date, step + 1)?;
            let normalized = self.ensemble.predict_step(&window)?;
            let reported = self.scaler.denormalize_row(&normalized)?;
            debug!(step, %date, "forecast step");

            points.push(ForecastPoint {
                date,
                prediction: PredictionVector::new(schema.clone(), reported)?,
            });
            window.advance(&normalized)?;
        }

        Ok(ForecastResult::new(schema, points))
    }
}
