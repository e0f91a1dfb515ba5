//! Metrics for evaluating prediction accuracy

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::Serialize;

/// Calculate accuracy metrics for predicted vs actual values
pub fn forecast_accuracy(predicted: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if predicted.len() != actual.len() || predicted.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "Predicted and actual values must have the same non-zero length".to_string(),
        ));
    }

    let n = predicted.len() as f64;

    let errors: Vec<f64> = predicted
        .iter()
        .zip(actual.iter())
        .map(|(&p, &a)| a - p)
        .collect();

    // Mean Absolute Error
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

    // Mean Squared Error
    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;

    let rmse = mse.sqrt();

    // Mean Absolute Percentage Error over non-zero actuals
    let nonzero = actual.iter().filter(|&&a| a != 0.0).count();
    let mape = if nonzero == 0 {
        0.0
    } else {
        actual
            .iter()
            .zip(errors.iter())
            .filter(|(&a, _)| a != 0.0)
            .map(|(&a, &e)| (e.abs() / a.abs()) * 100.0)
            .sum::<f64>()
            / nonzero as f64
    };

    // Symmetric Mean Absolute Percentage Error
    let smape = actual
        .iter()
        .zip(predicted.iter())
        .map(|(&a, &p)| {
            let denom = a.abs() + p.abs();
            if denom == 0.0 {
                0.0
            } else {
                200.0 * (a - p).abs() / denom
            }
        })
        .sum::<f64>()
        / n;

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse,
        mape,
        smape,
    })
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  SMAPE: {:.4}%", self.smape)?;
        Ok(())
    }
}

/// Accuracy of one feature
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureAccuracy {
    pub feature: String,
    #[serde(flatten)]
    pub accuracy: ForecastAccuracy,
}

/// Accuracy of point predictions over a date range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Number of dates that had enough history to predict
    pub evaluated: usize,
    /// Dates in range skipped for non-finite values in their window or row
    pub skipped: usize,
    pub features: Vec<FeatureAccuracy>,
}

impl std::fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Evaluation {} to {} ({} dates, {} skipped):",
            self.from, self.to, self.evaluated, self.skipped
        )?;
        for feature in &self.features {
            writeln!(f, "{}", feature.feature)?;
            write!(f, "{}", feature.accuracy)?;
        }
        Ok(())
    }
}
