#![allow(dead_code)]

use chrono::{Days, NaiveDate};
use energy_forecast::config::ServiceConfig;
use energy_forecast::models::{InputTopology, ModelInput, Predictor};
use energy_forecast::scaler::ScalerParams;
use energy_forecast::{FeatureScaler, FeatureSchema, ServiceContext, TimeSeriesTable};
use std::sync::{Arc, Mutex};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn schema(width: usize) -> Arc<FeatureSchema> {
    Arc::new(FeatureSchema::new((0..width).map(|j| format!("f{}", j))).unwrap())
}

/// Daily table where row `i` holds `i + 100 * j` in feature `j`
pub fn ramp_table(schema: Arc<FeatureSchema>, start: NaiveDate, days: usize) -> TimeSeriesTable {
    let rows = (0..days)
        .map(|i| {
            let date = start.checked_add_days(Days::new(i as u64)).unwrap();
            let row = (0..schema.len()).map(|j| i as f64 + 100.0 * j as f64).collect();
            (date, row)
        })
        .collect();
    TimeSeriesTable::from_rows(schema, rows).unwrap()
}

/// Scaler mapping every value to itself
pub fn identity_scaler(width: usize) -> FeatureScaler {
    FeatureScaler::from_params(ScalerParams::MinMax {
        data_min: vec![0.0; width],
        data_max: vec![1.0; width],
        feature_range: (0.0, 1.0),
    })
    .unwrap()
}

pub fn config(width: usize, window_length: usize) -> ServiceConfig {
    ServiceConfig {
        window_length,
        features: (0..width).map(|j| format!("f{}", j)).collect(),
        ..ServiceConfig::default()
    }
}

/// Returns the newest row of the window multiplied by `factor`
#[derive(Debug, Clone)]
pub struct LastRow {
    pub topology: InputTopology,
    pub width: usize,
    pub window_length: usize,
    pub factor: f64,
}

impl LastRow {
    pub fn flat(width: usize, window_length: usize, factor: f64) -> Self {
        Self {
            topology: InputTopology::Flat,
            width,
            window_length,
            factor,
        }
    }

    pub fn sequence(width: usize, window_length: usize, factor: f64) -> Self {
        Self {
            topology: InputTopology::Sequence,
            width,
            window_length,
            factor,
        }
    }

    fn newest(&self, input: ModelInput<'_>) -> Vec<f64> {
        match input {
            ModelInput::Flat(x) => x.iter().skip(x.len() - self.width).copied().collect(),
            ModelInput::Sequence(x) => x.row(x.nrows() - 1).to_vec(),
        }
    }
}

impl Predictor for LastRow {
    fn name(&self) -> &str {
        "last_row"
    }

    fn topology(&self) -> InputTopology {
        self.topology
    }

    fn input_size(&self) -> usize {
        match self.topology {
            InputTopology::Flat => self.width * self.window_length,
            InputTopology::Sequence => self.width,
        }
    }

    fn output_size(&self) -> usize {
        self.width
    }

    fn predict(&self, input: ModelInput<'_>) -> energy_forecast::Result<Vec<f64>> {
        Ok(self.newest(input).iter().map(|v| v * self.factor).collect())
    }
}

/// Wraps [`LastRow`] and records the newest row of every input it sees
#[derive(Debug, Clone)]
pub struct Recording {
    pub inner: LastRow,
    pub seen: Arc<Mutex<Vec<Vec<f64>>>>,
}

impl Recording {
    pub fn new(inner: LastRow) -> Self {
        Self {
            inner,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Predictor for Recording {
    fn name(&self) -> &str {
        "recording"
    }

    fn topology(&self) -> InputTopology {
        self.inner.topology()
    }

    fn input_size(&self) -> usize {
        self.inner.input_size()
    }

    fn output_size(&self) -> usize {
        self.inner.output_size()
    }

    fn predict(&self, input: ModelInput<'_>) -> energy_forecast::Result<Vec<f64>> {
        self.seen.lock().unwrap().push(self.inner.newest(input));
        self.inner.predict(input)
    }
}

/// Fully loaded context over a ramp table of `days` rows starting 2024-01-01
pub fn ramp_context(
    width: usize,
    window_length: usize,
    days: usize,
    ff_factor: f64,
    rnn_factor: f64,
) -> ServiceContext {
    let config = config(width, window_length);
    let table = ramp_table(schema(width), date(2024, 1, 1), days);
    ServiceContext::from_parts(
        &config,
        Some(table),
        Some(identity_scaler(width)),
        Some(Box::new(LastRow::flat(width, window_length, ff_factor))),
        Some(Box::new(LastRow::sequence(width, window_length, rnn_factor))),
    )
    .unwrap()
}
