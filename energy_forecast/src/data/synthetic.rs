//! Synthetic daily tables for demos and tests

use crate::data::{FeatureSchema, TimeSeriesTable};
use crate::error::{ForecastError, Result};
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::sync::Arc;

/// Generate a reproducible daily table with weekly seasonality
///
/// # Arguments
/// * `schema` - Feature columns to generate
/// * `start` - Date of the first row
/// * `days` - Number of consecutive daily rows
/// * `seed` - RNG seed; the same seed always yields the same table
///
/// # Returns
/// * A table whose feature `j` oscillates around `100 * (j + 1)`
pub fn daily_table(
    schema: Arc<FeatureSchema>,
    start: NaiveDate,
    days: usize,
    seed: u64,
) -> Result<TimeSeriesTable> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 2.0).map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;

    let mut rows = Vec::with_capacity(days);
    for i in 0..days {
        let date = start
            .checked_add_days(Days::new(i as u64))
            .ok_or_else(|| ForecastError::InvalidParameter("Date range overflow".to_string()))?;

        let phase = 2.0 * PI * (i % 7) as f64 / 7.0;
        let row = (0..schema.len())
            .map(|j| {
                let base = 100.0 * (j + 1) as f64;
                base + 10.0 * (phase + j as f64).sin() + noise.sample(&mut rng)
            })
            .collect();
        rows.push((date, row));
    }

    TimeSeriesTable::from_rows(schema, rows)
}
