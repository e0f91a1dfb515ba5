//! Dual-model ensemble combining a feed-forward and a recurrent predictor

use crate::error::{ForecastError, Result};
use crate::models::{ModelInput, Predictor};
use crate::window::Window;
use tracing::debug;

/// Outputs of both predictors and their mean, all in model space
#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleOutput {
    pub feed_forward: Vec<f64>,
    pub recurrent: Vec<f64>,
    pub combined: Vec<f64>,
}

/// Averages a feed-forward and a recurrent predictor.
///
/// Either slot may be empty when its model failed to load; prediction then
/// fails with [`ForecastError::ModelUnavailable`] rather than falling back to
/// the remaining model.
#[derive(Debug, Default)]
pub struct EnsemblePredictor {
    feed_forward: Option<Box<dyn Predictor>>,
    recurrent: Option<Box<dyn Predictor>>,
}

impl EnsemblePredictor {
    /// Create an ensemble with both predictors present
    pub fn new(feed_forward: Box<dyn Predictor>, recurrent: Box<dyn Predictor>) -> Self {
        Self {
            feed_forward: Some(feed_forward),
            recurrent: Some(recurrent),
        }
    }

    /// Create an ensemble from possibly empty slots
    pub fn from_slots(
        feed_forward: Option<Box<dyn Predictor>>,
        recurrent: Option<Box<dyn Predictor>>,
    ) -> Self {
        Self {
            feed_forward,
            recurrent,
        }
    }

    /// The feed-forward predictor, if loaded
    pub fn feed_forward(&self) -> Option<&dyn Predictor> {
        self.feed_forward.as_deref()
    }

    /// The recurrent predictor, if loaded
    pub fn recurrent(&self) -> Option<&dyn Predictor> {
        self.recurrent.as_deref()
    }

    /// Check both slots are filled
    pub fn is_complete(&self) -> bool {
        self.feed_forward.is_some() && self.recurrent.is_some()
    }

    /// Run both predictors on a normalized window and keep each output
    pub fn predict_components(&self, window: &Window) -> Result<EnsembleOutput> {
        let feed_forward = self
            .feed_forward
            .as_deref()
            .ok_or_else(|| ForecastError::ModelUnavailable("feed-forward model".to_string()))?;
        let recurrent = self
            .recurrent
            .as_deref()
            .ok_or_else(|| ForecastError::ModelUnavailable("recurrent model".to_string()))?;

        let flat = window.flattened();
        let ff_out = feed_forward.predict(ModelInput::Flat(flat.view()))?;
        let rnn_out = recurrent.predict(ModelInput::Sequence(window.values()))?;

        let width = window.feature_count();
        for (predictor, out) in [(feed_forward, &ff_out), (recurrent, &rnn_out)] {
            if out.len() != width {
                return Err(ForecastError::ModelError(format!(
                    "{} returned {} values, expected {}",
                    predictor.name(),
                    out.len(),
                    width
                )));
            }
        }

        let combined = ff_out
            .iter()
            .zip(&rnn_out)
            .map(|(a, b)| (a + b) / 2.0)
            .collect();
        debug!(
            feed_forward = feed_forward.name(),
            recurrent = recurrent.name(),
            "ensemble step"
        );

        Ok(EnsembleOutput {
            feed_forward: ff_out,
            recurrent: rnn_out,
            combined,
        })
    }

    /// Mean of both predictors' outputs for a normalized window
    pub fn predict_step(&self, window: &Window) -> Result<Vec<f64>> {
        Ok(self.predict_components(window)?.combined)
    }
}
