//! Time series table handling for forecasting

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use ndarray::{s, Array2, ArrayView1, ArrayView2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub mod synthetic;

/// Feature columns the models were trained on, in model order.
pub const DEFAULT_FEATURES: [&str; 6] = [
    "consumption_Staff_quarters",
    "consumption_Academic_blocks",
    "consumption_Hostels",
    "consumption_Chiller plant",
    "consumption_STP",
    "power_generation_by_solar_panels",
];

/// Ordered feature names shared by the table, the scaler and both predictors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Create a schema from feature names, rejecting empty or duplicate names
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names
            .into_iter()
            .map(|n| {
                let n: String = n.into();
                n.trim().to_string()
            })
            .collect();
        if names.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Feature schema must contain at least one feature".to_string(),
            ));
        }
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(ForecastError::InvalidParameter(
                    "Feature names must not be empty".to_string(),
                ));
            }
            if names[..i].contains(name) {
                return Err(ForecastError::InvalidParameter(format!(
                    "Duplicate feature name '{}'",
                    name
                )));
            }
        }
        Ok(Self { names })
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed schema
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Feature names in model order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of a feature by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            names: DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Daily feature observations, strictly increasing by date
#[derive(Debug, Clone)]
pub struct TimeSeriesTable {
    schema: Arc<FeatureSchema>,
    dates: Vec<NaiveDate>,
    /// One row per date, one column per feature
    values: Array2<f64>,
}

impl TimeSeriesTable {
    /// Build a table from `(date, features)` rows.
    ///
    /// Rows must already be strictly increasing by date and every row must
    /// have one value per schema feature.
    pub fn from_rows(schema: Arc<FeatureSchema>, rows: Vec<(NaiveDate, Vec<f64>)>) -> Result<Self> {
        let width = schema.len();
        let mut dates = Vec::with_capacity(rows.len());
        let mut flat = Vec::with_capacity(rows.len() * width);

        for (date, row) in rows {
            if row.len() != width {
                return Err(ForecastError::DataError(format!(
                    "Row for {} has {} values, expected {}",
                    date,
                    row.len(),
                    width
                )));
            }
            if let Some(&prev) = dates.last() {
                if date <= prev {
                    return Err(ForecastError::DataError(format!(
                        "Dates must be strictly increasing ({} follows {})",
                        date, prev
                    )));
                }
            }
            dates.push(date);
            flat.extend(row);
        }

        let values = Array2::from_shape_vec((dates.len(), width), flat)
            .map_err(|e| ForecastError::DataError(e.to_string()))?;

        Ok(Self {
            schema,
            dates,
            values,
        })
    }

    /// Get the feature schema
    pub fn schema(&self) -> &Arc<FeatureSchema> {
        &self.schema
    }

    /// Get the dates
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// Get all feature values, one row per date
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Get the number of rows
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// First date in the table
    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    /// Last known date in the table
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Position of the row with exactly this date
    pub fn position(&self, date: NaiveDate) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }

    /// Feature values at a position
    pub fn row(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.len()).then(|| self.values.row(index))
    }

    /// Rows in `[start, end)`
    pub fn rows(&self, start: usize, end: usize) -> Result<ArrayView2<'_, f64>> {
        if start > end || end > self.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Row range {}..{} out of bounds for {} rows",
                start,
                end,
                self.len()
            )));
        }
        Ok(self.values.slice(s![start..end, ..]))
    }
}

/// Data loader for the daily energy table
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load the table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, schema: Arc<FeatureSchema>) -> Result<TimeSeriesTable> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        let table = Self::from_dataframe(df, schema)?;
        info!(path = %path.display(), rows = table.len(), "dataset loaded");
        Ok(table)
    }

    /// Create the table from an existing DataFrame.
    ///
    /// Column names are matched after trimming whitespace. Rows whose date
    /// does not parse are dropped, the rest are sorted by date and the first
    /// row of each date is kept.
    pub fn from_dataframe(df: DataFrame, schema: Arc<FeatureSchema>) -> Result<TimeSeriesTable> {
        let time_column = Self::detect_time_column(&df)?;
        let feature_columns = Self::resolve_feature_columns(&df, &schema)?;

        let dates = Self::column_as_dates(&df, &time_column)?;
        let columns = feature_columns
            .iter()
            .map(|name| Self::column_as_f64(&df, name))
            .collect::<Result<Vec<_>>>()?;

        let mut rows = Vec::with_capacity(dates.len());
        let mut dropped = 0usize;
        for (i, date) in dates.into_iter().enumerate() {
            match date {
                Some(date) => rows.push((date, columns.iter().map(|c| c[i]).collect::<Vec<f64>>())),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            warn!(dropped, "dropped rows with unparseable dates");
        }

        rows.sort_by_key(|(date, _)| *date);
        let before = rows.len();
        rows.dedup_by_key(|(date, _)| *date);
        if rows.len() < before {
            warn!(duplicates = before - rows.len(), "dropped rows with duplicate dates");
        }

        TimeSeriesTable::from_rows(schema, rows)
    }

    /// Detect the date column in a DataFrame
    fn detect_time_column(df: &DataFrame) -> Result<String> {
        let column_names = df.get_column_names();

        if let Some(name) = column_names
            .iter()
            .find(|name| name.trim().eq_ignore_ascii_case("date"))
        {
            return Ok(name.to_string());
        }

        for name in &column_names {
            let lower_name = name.to_lowercase();
            if lower_name.contains("date") || lower_name.contains("time") {
                return Ok(name.to_string());
            }
        }

        Err(ForecastError::Schema(vec!["date".to_string()]))
    }

    /// Map each schema feature to the DataFrame column carrying it
    fn resolve_feature_columns(df: &DataFrame, schema: &FeatureSchema) -> Result<Vec<String>> {
        let column_names = df.get_column_names();
        let mut resolved = Vec::with_capacity(schema.len());
        let mut missing = Vec::new();

        for feature in schema.names() {
            match column_names.iter().find(|name| name.trim() == feature) {
                Some(name) => resolved.push(name.to_string()),
                None => missing.push(feature.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(ForecastError::Schema(missing));
        }
        Ok(resolved)
    }

    /// Helper method to get a column as dates, `None` where unparseable
    fn column_as_dates(df: &DataFrame, column_name: &str) -> Result<Vec<Option<NaiveDate>>> {
        let col = df.column(column_name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", column_name, e))
        })?;

        let text = col.cast(&DataType::Utf8)?;
        let dates = text
            .utf8()?
            .into_iter()
            .map(|value| value.and_then(parse_date))
            .collect();
        Ok(dates)
    }

    /// Helper method to get a column as f64 values, NaN where null
    fn column_as_f64(df: &DataFrame, column_name: &str) -> Result<Vec<f64>> {
        let col = df.column(column_name).map_err(|e| {
            ForecastError::DataError(format!("Column '{}' not found: {}", column_name, e))
        })?;

        if !col.dtype().is_numeric() {
            return Err(ForecastError::DataError(format!(
                "Column '{}' cannot be converted to f64",
                column_name
            )));
        }

        let values = col.cast(&DataType::Float64)?;
        let values = values
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        Ok(values)
    }
}

/// Parse a calendar date, ignoring any time-of-day suffix.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `MM/DD/YYYY` and `DD-MM-YYYY`.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.trim().split(|c| c == ' ' || c == 'T').next()?;
    ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-31"), Some(date("2024-01-31")));
        assert_eq!(parse_date(" 2024-01-31 00:00:00 "), Some(date("2024-01-31")));
        assert_eq!(parse_date("2024-01-31T12:30:00"), Some(date("2024-01-31")));
        assert_eq!(parse_date("2024/01/31"), Some(date("2024-01-31")));
        assert_eq!(parse_date("01/31/2024"), Some(date("2024-01-31")));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_schema_rejects_duplicates() {
        assert!(FeatureSchema::new(["a", "b", "a"]).is_err());
        assert!(FeatureSchema::new(Vec::<String>::new()).is_err());

        let schema = FeatureSchema::new([" a ", "b"]).unwrap();
        assert_eq!(schema.names(), &["a".to_string(), "b".to_string()]);
        assert_eq!(schema.index_of("b"), Some(1));
    }

    #[test]
    fn test_from_rows_requires_increasing_dates() {
        let schema = Arc::new(FeatureSchema::new(["x"]).unwrap());
        let rows = vec![(date("2024-01-02"), vec![1.0]), (date("2024-01-01"), vec![2.0])];
        assert!(TimeSeriesTable::from_rows(schema.clone(), rows).is_err());

        let rows = vec![(date("2024-01-01"), vec![1.0]), (date("2024-01-01"), vec![2.0])];
        assert!(TimeSeriesTable::from_rows(schema.clone(), rows).is_err());

        let rows = vec![(date("2024-01-01"), vec![1.0, 2.0])];
        assert!(TimeSeriesTable::from_rows(schema, rows).is_err());
    }

    #[test]
    fn test_table_lookup() {
        let schema = Arc::new(FeatureSchema::new(["x", "y"]).unwrap());
        let rows = vec![
            (date("2024-01-01"), vec![1.0, 10.0]),
            (date("2024-01-02"), vec![2.0, 20.0]),
            (date("2024-01-04"), vec![4.0, 40.0]),
        ];
        let table = TimeSeriesTable::from_rows(schema, rows).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.position(date("2024-01-04")), Some(2));
        assert_eq!(table.position(date("2024-01-03")), None);
        assert_eq!(table.row(1).unwrap().to_vec(), vec![2.0, 20.0]);
        assert!(table.row(3).is_none());
        assert_eq!(table.rows(1, 3).unwrap().nrows(), 2);
        assert!(table.rows(2, 4).is_err());
        assert_eq!(table.last_date(), Some(date("2024-01-04")));
    }
}
