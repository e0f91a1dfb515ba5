//! Inference service over the dependencies loaded at startup
//!
//! [`ServiceContext`] is built once, then shared read-only between requests.
//! A dependency that fails to load leaves its slot empty and is reported by
//! [`ServiceContext::readiness`]; the others still load. Every prediction
//! checks all slots first and fails with
//! [`ForecastError::ServiceNotReady`] if any is empty.

use crate::config::{HorizonPolicy, ServiceConfig};
use crate::data::{DataLoader, FeatureSchema, TimeSeriesTable};
use crate::ensemble::EnsemblePredictor;
use crate::error::{ForecastError, Result};
use crate::forecaster::AutoregressiveForecaster;
use crate::metrics::{forecast_accuracy, EvaluationReport, FeatureAccuracy};
use crate::models::{load_predictor, InputTopology, Predictor};
use crate::prediction::{ForecastResult, ModelComponents, PointPrediction, PredictionVector};
use crate::scaler::FeatureScaler;
use crate::window::{window_ending_at, Window};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// A startup dependency of the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    FeedForwardModel,
    RecurrentModel,
    Scaler,
    Dataset,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dependency::FeedForwardModel => "feed-forward model",
            Dependency::RecurrentModel => "recurrent model",
            Dependency::Scaler => "scaler",
            Dependency::Dataset => "dataset",
        };
        f.write_str(name)
    }
}

/// Why a dependency did not load
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadFailure {
    pub dependency: Dependency,
    pub message: String,
}

/// Load state of every dependency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Readiness {
    pub ready: bool,
    pub feed_forward_model: bool,
    pub recurrent_model: bool,
    pub scaler: bool,
    pub dataset: bool,
    pub table_rows: usize,
    pub errors: Vec<LoadFailure>,
}

/// Loaded table, scaler and predictors plus the settings they were checked against
#[derive(Debug)]
pub struct ServiceContext {
    window_length: usize,
    horizon: HorizonPolicy,
    schema: Arc<FeatureSchema>,
    table: Option<TimeSeriesTable>,
    scaler: Option<FeatureScaler>,
    ensemble: EnsemblePredictor,
    load_errors: Vec<LoadFailure>,
}

impl ServiceContext {
    /// Load every dependency named by the configuration.
    ///
    /// Only an invalid configuration is an error; dependency failures are
    /// logged and recorded.
    pub fn load(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;
        let schema = Arc::new(config.schema()?);
        let window_length = config.window_length;
        let sources = &config.data;
        let mut errors = Vec::new();

        let feed_forward = load_dependency(Dependency::FeedForwardModel, &mut errors, || {
            let predictor = load_predictor(&sources.feed_forward_model, InputTopology::Flat)?;
            check_predictor(predictor.as_ref(), window_length, schema.len())?;
            Ok(predictor)
        });
        let recurrent = load_dependency(Dependency::RecurrentModel, &mut errors, || {
            let predictor = load_predictor(&sources.recurrent_model, InputTopology::Sequence)?;
            check_predictor(predictor.as_ref(), window_length, schema.len())?;
            Ok(predictor)
        });
        let scaler = load_dependency(Dependency::Scaler, &mut errors, || {
            let scaler = FeatureScaler::load(&sources.scaler)?;
            check_scaler(&scaler, &schema)?;
            Ok(scaler)
        });
        let table = load_dependency(Dependency::Dataset, &mut errors, || {
            DataLoader::from_csv(&sources.table, schema.clone())
        });

        let context = Self {
            window_length,
            horizon: config.horizon,
            schema,
            table,
            scaler,
            ensemble: EnsemblePredictor::from_slots(feed_forward, recurrent),
            load_errors: errors,
        };
        info!(ready = context.is_ready(), "service context loaded");
        Ok(context)
    }

    /// Assemble a context from dependencies already in memory.
    ///
    /// Each dependency is checked as in [`ServiceContext::load`]; one that
    /// does not fit the configuration is recorded and left out.
    pub fn from_parts(
        config: &ServiceConfig,
        table: Option<TimeSeriesTable>,
        scaler: Option<FeatureScaler>,
        feed_forward: Option<Box<dyn Predictor>>,
        recurrent: Option<Box<dyn Predictor>>,
    ) -> Result<Self> {
        config.validate()?;
        let schema = Arc::new(config.schema()?);
        let window_length = config.window_length;
        let mut errors = Vec::new();

        let feed_forward = feed_forward.and_then(|p| {
            load_dependency(Dependency::FeedForwardModel, &mut errors, || {
                check_topology(p.as_ref(), InputTopology::Flat)?;
                check_predictor(p.as_ref(), window_length, schema.len())?;
                Ok(p)
            })
        });
        let recurrent = recurrent.and_then(|p| {
            load_dependency(Dependency::RecurrentModel, &mut errors, || {
                check_topology(p.as_ref(), InputTopology::Sequence)?;
                check_predictor(p.as_ref(), window_length, schema.len())?;
                Ok(p)
            })
        });
        let scaler = scaler.and_then(|s| {
            load_dependency(Dependency::Scaler, &mut errors, || {
                check_scaler(&s, &schema)?;
                Ok(s)
            })
        });
        let table = table.and_then(|t| {
            load_dependency(Dependency::Dataset, &mut errors, || {
                if t.schema().as_ref() != schema.as_ref() {
                    return Err(ForecastError::DataError(
                        "Table features differ from the configured features".to_string(),
                    ));
                }
                Ok(t)
            })
        });

        Ok(Self {
            window_length,
            horizon: config.horizon,
            schema,
            table,
            scaler,
            ensemble: EnsemblePredictor::from_slots(feed_forward, recurrent),
            load_errors: errors,
        })
    }

    /// Feature schema shared by all dependencies
    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    /// Rows of history per model input
    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Horizon policy for forecasts
    pub fn horizon(&self) -> HorizonPolicy {
        self.horizon
    }

    /// The loaded table, if any
    pub fn table(&self) -> Option<&TimeSeriesTable> {
        self.table.as_ref()
    }

    /// The ensemble
    pub fn ensemble(&self) -> &EnsemblePredictor {
        &self.ensemble
    }

    /// Check every dependency loaded
    pub fn is_ready(&self) -> bool {
        self.missing().is_empty()
    }

    /// Report the load state of each dependency
    pub fn readiness(&self) -> Readiness {
        Readiness {
            ready: self.is_ready(),
            feed_forward_model: self.ensemble.feed_forward().is_some(),
            recurrent_model: self.ensemble.recurrent().is_some(),
            scaler: self.scaler.is_some(),
            dataset: self.table.is_some(),
            table_rows: self.table.as_ref().map_or(0, TimeSeriesTable::len),
            errors: self.load_errors.clone(),
        }
    }

    fn missing(&self) -> Vec<Dependency> {
        let mut missing = Vec::new();
        if self.ensemble.feed_forward().is_none() {
            missing.push(Dependency::FeedForwardModel);
        }
        if self.ensemble.recurrent().is_none() {
            missing.push(Dependency::RecurrentModel);
        }
        if self.scaler.is_none() {
            missing.push(Dependency::Scaler);
        }
        if self.table.is_none() {
            missing.push(Dependency::Dataset);
        }
        missing
    }

    fn ensure_ready(&self) -> Result<(&TimeSeriesTable, &FeatureScaler)> {
        match (&self.table, &self.scaler) {
            (Some(table), Some(scaler)) if self.ensemble.is_complete() => Ok((table, scaler)),
            _ => {
                let missing: Vec<String> = self.missing().iter().map(|d| d.to_string()).collect();
                Err(ForecastError::ServiceNotReady(missing.join(", ")))
            }
        }
    }

    /// Predict every feature at `date` from the rows before it
    #[instrument(skip(self))]
    pub fn predict_at(&self, date: NaiveDate) -> Result<PointPrediction> {
        let (table, scaler) = self.ensure_ready()?;

        let raw = window_ending_at(table, date, self.window_length).ok_or(
            ForecastError::InsufficientHistory {
                date,
                required: self.window_length,
            },
        )?;
        raw.ensure_finite()?;

        let window = Window::new(scaler.normalize(raw.values())?, self.window_length)?;
        let output = self.ensemble.predict_components(&window)?;

        let to_vector = |values: &[f64]| -> Result<PredictionVector> {
            PredictionVector::new(self.schema.clone(), scaler.denormalize_row(values)?)
        };

        Ok(PointPrediction {
            date,
            prediction: to_vector(&output.combined)?,
            components: ModelComponents {
                feed_forward: to_vector(&output.feed_forward)?,
                recurrent: to_vector(&output.recurrent)?,
            },
        })
    }

    /// Forecast `days` days after the table's last date, subject to the cap
    #[instrument(skip(self))]
    pub fn forecast_days(&self, days: usize) -> Result<ForecastResult> {
        let (table, scaler) = self.ensure_ready()?;
        let days = self.horizon.cap(days);
        AutoregressiveForecaster::new(&self.ensemble, scaler, self.window_length).forecast(table, days)
    }

    /// Forecast a horizon given in months
    pub fn forecast_months(&self, months: usize) -> Result<ForecastResult> {
        self.forecast_days(self.horizon.days_for_months(months))
    }

    /// Compare point predictions against the table for dates in `[from, to]`
    #[instrument(skip(self))]
    pub fn evaluate_range(&self, from: NaiveDate, to: NaiveDate) -> Result<EvaluationReport> {
        if from > to {
            return Err(ForecastError::InvalidParameter(format!(
                "Evaluation range start {} is after end {}",
                from, to
            )));
        }
        let (table, _) = self.ensure_ready()?;

        let width = self.schema.len();
        let mut predicted = vec![Vec::new(); width];
        let mut actual = vec![Vec::new(); width];
        let mut skipped = 0usize;

        for (index, &date) in table.dates().iter().enumerate() {
            if date < from || date > to || index < self.window_length {
                continue;
            }
            let row = table
                .row(index)
                .ok_or_else(|| ForecastError::DataError(format!("Missing row {}", index)))?;

            let window_is_finite = window_ending_at(table, date, self.window_length)
                .map_or(false, |w| w.ensure_finite().is_ok());
            if !window_is_finite || row.iter().any(|v| !v.is_finite()) {
                warn!(%date, "skipping date with non-finite values");
                skipped += 1;
                continue;
            }

            let prediction = self.predict_at(date)?;
            for j in 0..width {
                predicted[j].push(prediction.prediction.values()[j]);
                actual[j].push(row[j]);
            }
        }

        let evaluated = predicted.first().map_or(0, Vec::len);
        if evaluated == 0 {
            return Err(ForecastError::InsufficientHistory {
                date: from,
                required: self.window_length,
            });
        }

        let features = self
            .schema
            .names()
            .iter()
            .zip(predicted.iter().zip(&actual))
            .map(|(name, (p, a))| {
                Ok(FeatureAccuracy {
                    feature: name.clone(),
                    accuracy: forecast_accuracy(p, a)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(EvaluationReport {
            from,
            to,
            evaluated,
            skipped,
            features,
        })
    }
}

fn load_dependency<T>(
    dependency: Dependency,
    errors: &mut Vec<LoadFailure>,
    load: impl FnOnce() -> Result<T>,
) -> Option<T> {
    match load() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(%dependency, error = %e, "dependency not loaded");
            errors.push(LoadFailure {
                dependency,
                message: e.to_string(),
            });
            None
        }
    }
}

fn check_topology(predictor: &dyn Predictor, expected: InputTopology) -> Result<()> {
    if predictor.topology() != expected {
        return Err(ForecastError::ModelError(format!(
            "{} consumes {:?} input, expected {:?}",
            predictor.name(),
            predictor.topology(),
            expected
        )));
    }
    Ok(())
}

fn check_predictor(predictor: &dyn Predictor, window_length: usize, features: usize) -> Result<()> {
    let expected_input = match predictor.topology() {
        InputTopology::Flat => window_length * features,
        InputTopology::Sequence => features,
    };
    if predictor.input_size() != expected_input || predictor.output_size() != features {
        return Err(ForecastError::ModelError(format!(
            "{} maps {} inputs to {} outputs, expected {} to {}",
            predictor.name(),
            predictor.input_size(),
            predictor.output_size(),
            expected_input,
            features
        )));
    }
    Ok(())
}

fn check_scaler(scaler: &FeatureScaler, schema: &FeatureSchema) -> Result<()> {
    if !scaler.is_fitted() {
        return Err(ForecastError::NotFitted);
    }
    if scaler.feature_count() != schema.len() {
        return Err(ForecastError::InvalidParameter(format!(
            "Scaler covers {} features, expected {}",
            scaler.feature_count(),
            schema.len()
        )));
    }
    Ok(())
}
