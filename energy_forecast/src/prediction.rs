//! Prediction and forecast results in table units

use crate::data::FeatureSchema;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::io::Write;
use std::sync::Arc;

/// One predicted value per feature, in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionVector {
    schema: Arc<FeatureSchema>,
    values: Vec<f64>,
}

impl PredictionVector {
    /// Pair values with the feature schema
    pub fn new(schema: Arc<FeatureSchema>, values: Vec<f64>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(ForecastError::ModelError(format!(
                "Prediction has {} values for {} features",
                values.len(),
                schema.len()
            )));
        }
        Ok(Self { schema, values })
    }

    /// Values in schema order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of a feature by name
    pub fn get(&self, feature: &str) -> Option<f64> {
        self.schema.index_of(feature).map(|i| self.values[i])
    }

    /// `(feature, value)` pairs in schema order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.schema
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}

impl Serialize for PredictionVector {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}

/// Denormalized outputs of the individual predictors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelComponents {
    pub feed_forward: PredictionVector,
    pub recurrent: PredictionVector,
}

/// Ensemble prediction for one date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointPrediction {
    pub date: NaiveDate,
    pub prediction: PredictionVector,
    pub components: ModelComponents,
}

/// Forecast for one future day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub prediction: PredictionVector,
}

/// Consecutive daily forecasts following the last known date
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    #[serde(skip)]
    schema: Arc<FeatureSchema>,
    forecast: Vec<ForecastPoint>,
}

impl ForecastResult {
    /// Create a result from points
    pub fn new(schema: Arc<FeatureSchema>, forecast: Vec<ForecastPoint>) -> Self {
        Self { schema, forecast }
    }

    /// Forecast points in date order
    pub fn points(&self) -> &[ForecastPoint] {
        &self.forecast
    }

    /// Number of forecasted days
    pub fn len(&self) -> usize {
        self.forecast.len()
    }

    /// Check if nothing was forecast
    pub fn is_empty(&self) -> bool {
        self.forecast.is_empty()
    }

    /// Forecast dates in order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.forecast.iter().map(|p| p.date).collect()
    }

    /// Serialize as `{"forecast": [...]}`
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Write `date,<feature>...` rows
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let mut header = vec!["date".to_string()];
        header.extend(self.schema.names().iter().cloned());
        csv_writer.write_record(&header)?;

        for point in &self.forecast {
            let mut record = vec![point.date.format("%Y-%m-%d").to_string()];
            record.extend(point.prediction.values().iter().map(|v| v.to_string()));
            csv_writer.write_record(&record)?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn schema() -> Arc<FeatureSchema> {
        Arc::new(FeatureSchema::new(["load", "solar"]).unwrap())
    }

    #[test]
    fn test_vector_serializes_in_schema_order() {
        let vector = PredictionVector::new(schema(), vec![2.5, 1.0]).unwrap();
        assert_eq!(
            serde_json::to_string(&vector).unwrap(),
            r#"{"load":2.5,"solar":1.0}"#
        );
        assert_eq!(vector.get("solar"), Some(1.0));
        assert_eq!(vector.get("wind"), None);
    }

    #[test]
    fn test_vector_length_checked() {
        assert!(PredictionVector::new(schema(), vec![1.0]).is_err());
    }

    #[test]
    fn test_forecast_exports() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let result = ForecastResult::new(
            schema(),
            vec![ForecastPoint {
                date,
                prediction: PredictionVector::new(schema(), vec![3.0, 0.5]).unwrap(),
            }],
        );

        assert_eq!(
            result.to_json().unwrap(),
            r#"{"forecast":[{"date":"2024-02-01","prediction":{"load":3.0,"solar":0.5}}]}"#
        );

        let mut out = Vec::new();
        result.write_csv(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "date,load,solar\n2024-02-01,3,0.5\n"
        );
    }
}
