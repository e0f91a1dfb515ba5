//! Service configuration
//!
//! ```toml
//! window_length = 30
//! features = ["consumption_Hostels", "power_generation_by_solar_panels"]
//!
//! [data]
//! table = "Final.csv"
//! scaler = "scaler.json"
//! feed_forward_model = "ann_model.json"
//! recurrent_model = "lstm_model.json"
//!
//! [horizon]
//! days_per_month = 30
//! max_forecast_days = 180   # 0 disables the cap
//! ```

use crate::data::FeatureSchema;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Files the service loads at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSources {
    pub table: PathBuf,
    pub scaler: PathBuf,
    pub feed_forward_model: PathBuf,
    pub recurrent_model: PathBuf,
}

impl Default for DataSources {
    fn default() -> Self {
        Self {
            table: PathBuf::from("Final.csv"),
            scaler: PathBuf::from("scaler.json"),
            feed_forward_model: PathBuf::from("ann_model.json"),
            recurrent_model: PathBuf::from("lstm_model.json"),
        }
    }
}

impl DataSources {
    fn resolve_against(&mut self, base: &Path) {
        for path in [
            &mut self.table,
            &mut self.scaler,
            &mut self.feed_forward_model,
            &mut self.recurrent_model,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }
}

/// How month-based forecast requests translate into days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HorizonPolicy {
    pub days_per_month: usize,
    /// Upper bound on forecast days; `None` or `0` means uncapped
    pub max_forecast_days: Option<usize>,
}

impl Default for HorizonPolicy {
    fn default() -> Self {
        Self {
            days_per_month: 30,
            max_forecast_days: Some(180),
        }
    }
}

impl HorizonPolicy {
    /// Apply the cap to a horizon in days
    pub fn cap(&self, days: usize) -> usize {
        match self.max_forecast_days {
            Some(max) if max > 0 => days.min(max),
            _ => days,
        }
    }

    /// Days to forecast for a horizon in months
    pub fn days_for_months(&self, months: usize) -> usize {
        self.cap(months.saturating_mul(self.days_per_month))
    }
}

/// Configuration of the inference service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub data: DataSources,
    /// Rows of history per model input
    pub window_length: usize,
    /// Feature columns in model order
    pub features: Vec<String>,
    pub horizon: HorizonPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            data: DataSources::default(),
            window_length: 30,
            features: FeatureSchema::default().names().to_vec(),
            horizon: HorizonPolicy::default(),
        }
    }
}

impl ServiceConfig {
    /// Load a TOML file; relative data paths resolve against its directory
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&contents)?;
        if let Some(base) = path.parent() {
            config.data.resolve_against(base);
        }
        Ok(config)
    }

    /// Parse and validate TOML
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values are usable
    pub fn validate(&self) -> Result<()> {
        if self.window_length == 0 {
            return Err(ForecastError::ConfigError(
                "window_length must be positive".to_string(),
            ));
        }
        if self.horizon.days_per_month == 0 {
            return Err(ForecastError::ConfigError(
                "horizon.days_per_month must be positive".to_string(),
            ));
        }
        self.schema()
            .map_err(|e| ForecastError::ConfigError(e.to_string()))?;
        Ok(())
    }

    /// Feature schema built from `features`
    pub fn schema(&self) -> Result<FeatureSchema> {
        FeatureSchema::new(self.features.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.window_length, 30);
        assert_eq!(config.features.len(), 6);
        assert_eq!(config.horizon.max_forecast_days, Some(180));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml_str(
            r#"
            window_length = 7

            [horizon]
            max_forecast_days = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.window_length, 7);
        assert_eq!(config.horizon.days_per_month, 30);
        assert_eq!(config.data, DataSources::default());
        assert_eq!(config.horizon.days_for_months(12), 360);
    }

    #[test]
    fn test_invalid_config() {
        assert!(ServiceConfig::from_toml_str("window_length = 0").is_err());
        assert!(ServiceConfig::from_toml_str("features = []").is_err());
        assert!(ServiceConfig::from_toml_str("window_length = \"x\"").is_err());
    }

    #[rstest]
    #[case(Some(180), 1, 30)]
    #[case(Some(180), 6, 180)]
    #[case(Some(180), 7, 180)]
    #[case(None, 7, 210)]
    #[case(Some(0), 7, 210)]
    #[case(Some(180), 0, 0)]
    fn test_days_for_months(#[case] max: Option<usize>, #[case] months: usize, #[case] days: usize) {
        let policy = HorizonPolicy {
            days_per_month: 30,
            max_forecast_days: max,
        };
        assert_eq!(policy.days_for_months(months), days);
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        std::fs::write(&path, "[data]\ntable = \"data/table.csv\"\nscaler = \"/abs/scaler.json\"\n").unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.data.table, dir.path().join("data/table.csv"));
        assert_eq!(config.data.scaler, PathBuf::from("/abs/scaler.json"));
    }
}
