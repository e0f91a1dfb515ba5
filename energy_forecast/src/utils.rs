//! Utility functions for the energy_forecast crate

use crate::error::{ForecastError, Result};
use chrono::{Days, NaiveDate};

/// Date `horizon` days after `last_date`, failing when it leaves the calendar
pub fn forecast_end(last_date: NaiveDate, horizon: usize) -> Result<NaiveDate> {
    last_date
        .checked_add_days(Days::new(horizon as u64))
        .ok_or_else(|| {
            ForecastError::InvalidParameter(format!(
                "Forecast horizon of {} days overflows the calendar",
                horizon
            ))
        })
}

/// Parse an ISO `YYYY-MM-DD` request date
pub fn parse_request_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
        ForecastError::InvalidParameter(format!("Invalid date '{}': {}", value, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_end_crosses_month_boundary() {
        let last = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        assert_eq!(
            forecast_end(last, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 2).unwrap()
        );
        assert_eq!(forecast_end(last, 0).unwrap(), last);
        assert!(matches!(
            forecast_end(last, usize::MAX),
            Err(ForecastError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_parse_request_date() {
        assert_eq!(
            parse_request_date("2024-02-29").unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert!(parse_request_date("2023-02-29").is_err());
        assert!(parse_request_date("29/02/2024").is_err());
    }
}
