//! Per-feature linear scaling between table units and model space

use crate::data::TimeSeriesTable;
use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Fitted scaling parameters, as persisted on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerParams {
    /// Maps `[data_min, data_max]` onto `feature_range`
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
        #[serde(default = "default_feature_range")]
        feature_range: (f64, f64),
    },
    /// Maps each feature to zero mean and unit variance
    Standard { mean: Vec<f64>, std: Vec<f64> },
}

fn default_feature_range() -> (f64, f64) {
    (0.0, 1.0)
}

impl ScalerParams {
    /// Number of features these parameters cover
    pub fn feature_count(&self) -> usize {
        match self {
            ScalerParams::MinMax { data_min, .. } => data_min.len(),
            ScalerParams::Standard { mean, .. } => mean.len(),
        }
    }

    /// Resolve into `(scale, offset)` so that `normalized = x * scale + offset`
    fn linear_terms(&self) -> Result<(Vec<f64>, Vec<f64>)> {
        match self {
            ScalerParams::MinMax {
                data_min,
                data_max,
                feature_range: (lo, hi),
            } => {
                if data_min.len() != data_max.len() {
                    return Err(ForecastError::InvalidParameter(format!(
                        "data_min has {} entries but data_max has {}",
                        data_min.len(),
                        data_max.len()
                    )));
                }
                if !(lo < hi) {
                    return Err(ForecastError::InvalidParameter(format!(
                        "Feature range ({}, {}) must be increasing",
                        lo, hi
                    )));
                }

                let mut scale = Vec::with_capacity(data_min.len());
                let mut offset = Vec::with_capacity(data_min.len());
                for (&min, &max) in data_min.iter().zip(data_max) {
                    let range = max - min;
                    // Constant features keep their spread
                    let range = if range == 0.0 { 1.0 } else { range };
                    let s = (hi - lo) / range;
                    scale.push(s);
                    offset.push(lo - min * s);
                }
                Ok((scale, offset))
            }
            ScalerParams::Standard { mean, std } => {
                if mean.len() != std.len() {
                    return Err(ForecastError::InvalidParameter(format!(
                        "mean has {} entries but std has {}",
                        mean.len(),
                        std.len()
                    )));
                }

                let mut scale = Vec::with_capacity(mean.len());
                let mut offset = Vec::with_capacity(mean.len());
                for (&m, &sd) in mean.iter().zip(std) {
                    let sd = if sd == 0.0 { 1.0 } else { sd };
                    scale.push(1.0 / sd);
                    offset.push(-m / sd);
                }
                Ok((scale, offset))
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    params: ScalerParams,
    scale: Array1<f64>,
    offset: Array1<f64>,
}

/// Feature scaler; unfitted until parameters are fitted or loaded
#[derive(Debug, Clone, Default)]
pub struct FeatureScaler {
    fitted: Option<Fitted>,
}

impl FeatureScaler {
    /// Create a scaler from known parameters
    pub fn from_params(params: ScalerParams) -> Result<Self> {
        let (scale, offset) = params.linear_terms()?;
        if scale.iter().chain(&offset).any(|v| !v.is_finite()) {
            return Err(ForecastError::InvalidParameter(
                "Scaler parameters must be finite".to_string(),
            ));
        }

        Ok(Self {
            fitted: Some(Fitted {
                params,
                scale: Array1::from(scale),
                offset: Array1::from(offset),
            }),
        })
    }

    /// Fit min/max parameters on every row of a table
    pub fn fit_min_max(table: &TimeSeriesTable, feature_range: (f64, f64)) -> Result<Self> {
        let values = Self::training_values(table)?;
        let data_min = values.columns().into_iter().map(|c| Statistics::min(c.iter())).collect();
        let data_max = values.columns().into_iter().map(|c| Statistics::max(c.iter())).collect();

        Self::from_params(ScalerParams::MinMax {
            data_min,
            data_max,
            feature_range,
        })
    }

    /// Fit mean/std parameters on every row of a table
    pub fn fit_standard(table: &TimeSeriesTable) -> Result<Self> {
        let values = Self::training_values(table)?;
        let mean = values.columns().into_iter().map(|c| Statistics::mean(c.iter())).collect();
        let std = values
            .columns()
            .into_iter()
            .map(|c| Statistics::population_std_dev(c.iter()))
            .collect();

        Self::from_params(ScalerParams::Standard { mean, std })
    }

    fn training_values(table: &TimeSeriesTable) -> Result<ArrayView2<'_, f64>> {
        let values = table.values();
        if values.nrows() == 0 {
            return Err(ForecastError::DataError(
                "Cannot fit a scaler on an empty table".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(
                "Cannot fit a scaler on non-finite values".to_string(),
            ));
        }
        Ok(values)
    }

    /// Load parameters from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let params: ScalerParams = serde_json::from_reader(reader)?;
        let scaler = Self::from_params(params)?;
        info!(path = %path.display(), features = scaler.feature_count(), "scaler loaded");
        Ok(scaler)
    }

    /// Save parameters as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let params = self.params().ok_or(ForecastError::NotFitted)?;
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, params)?;
        Ok(())
    }

    /// Check whether parameters are present
    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Get the fitted parameters
    pub fn params(&self) -> Option<&ScalerParams> {
        self.fitted.as_ref().map(|f| &f.params)
    }

    /// Number of features, `0` when unfitted
    pub fn feature_count(&self) -> usize {
        self.fitted.as_ref().map_or(0, |f| f.scale.len())
    }

    fn fitted_for(&self, width: usize) -> Result<&Fitted> {
        let fitted = self.fitted.as_ref().ok_or(ForecastError::NotFitted)?;
        if fitted.scale.len() != width {
            return Err(ForecastError::InvalidParameter(format!(
                "Scaler covers {} features, input has {}",
                fitted.scale.len(),
                width
            )));
        }
        Ok(fitted)
    }

    /// Map rows of raw feature values into model space
    pub fn normalize(&self, rows: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let fitted = self.fitted_for(rows.ncols())?;
        Ok(&rows * &fitted.scale + &fitted.offset)
    }

    /// Map rows of model-space values back into table units
    pub fn denormalize(&self, rows: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let fitted = self.fitted_for(rows.ncols())?;
        Ok((&rows - &fitted.offset) / &fitted.scale)
    }

    /// Map a single raw feature vector into model space
    pub fn normalize_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        let rows = ArrayView2::from_shape((1, row.len()), row)
            .map_err(|e| ForecastError::DataError(e.to_string()))?;
        Ok(self.normalize(rows)?.into_raw_vec())
    }

    /// Map a single model-space vector back into table units
    pub fn denormalize_row(&self, row: &[f64]) -> Result<Vec<f64>> {
        let rows = ArrayView2::from_shape((1, row.len()), row)
            .map_err(|e| ForecastError::DataError(e.to_string()))?;
        Ok(self.denormalize(rows)?.into_raw_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_unfitted_scaler_fails() {
        let scaler = FeatureScaler::default();
        assert!(!scaler.is_fitted());
        assert!(matches!(
            scaler.normalize(array![[1.0, 2.0]].view()),
            Err(ForecastError::NotFitted)
        ));
        assert!(matches!(
            scaler.denormalize_row(&[1.0]),
            Err(ForecastError::NotFitted)
        ));
    }

    #[test]
    fn test_min_max_maps_range() {
        let scaler = FeatureScaler::from_params(ScalerParams::MinMax {
            data_min: vec![10.0, -5.0],
            data_max: vec![20.0, 5.0],
            feature_range: (0.0, 1.0),
        })
        .unwrap();

        let normalized = scaler
            .normalize(array![[10.0, -5.0], [20.0, 5.0], [15.0, 0.0]].view())
            .unwrap();
        let expected = array![[0.0, 0.0], [1.0, 1.0], [0.5, 0.5]];
        for (got, want) in normalized.iter().zip(expected.iter()) {
            assert_relative_eq!(*got, *want, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_constant_feature_does_not_divide_by_zero() {
        let scaler = FeatureScaler::from_params(ScalerParams::Standard {
            mean: vec![3.0],
            std: vec![0.0],
        })
        .unwrap();

        assert_eq!(scaler.normalize_row(&[3.0]).unwrap(), vec![0.0]);
        assert_eq!(scaler.denormalize_row(&[0.0]).unwrap(), vec![3.0]);
    }

    #[test]
    fn test_width_mismatch() {
        let scaler = FeatureScaler::from_params(ScalerParams::Standard {
            mean: vec![0.0, 0.0],
            std: vec![1.0, 1.0],
        })
        .unwrap();

        assert!(matches!(
            scaler.normalize_row(&[1.0]),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_invalid_feature_range() {
        let result = FeatureScaler::from_params(ScalerParams::MinMax {
            data_min: vec![0.0],
            data_max: vec![1.0],
            feature_range: (1.0, 1.0),
        });
        assert!(result.is_err());
    }
}
