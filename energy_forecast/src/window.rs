//! Fixed-length lookback windows over a time series table

use crate::data::TimeSeriesTable;
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2};

/// Exactly `window_length` consecutive feature rows, oldest first
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    values: Array2<f64>,
}

impl Window {
    /// Wrap rows as a window, failing unless there are exactly `window_length` of them
    pub fn new(values: Array2<f64>, window_length: usize) -> Result<Self> {
        if window_length == 0 || values.nrows() != window_length || values.ncols() == 0 {
            return Err(ForecastError::WindowShape {
                expected: (window_length, values.ncols()),
                actual: values.dim(),
            });
        }
        Ok(Self { values })
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    /// Always false for a constructed window
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of features per row
    pub fn feature_count(&self) -> usize {
        self.values.ncols()
    }

    /// Rows as a `len × feature_count` matrix
    pub fn values(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    /// Most recent row
    pub fn newest(&self) -> ArrayView1<'_, f64> {
        self.values.row(self.len() - 1)
    }

    /// Rows concatenated oldest first into one vector
    pub fn flattened(&self) -> Array1<f64> {
        self.values.iter().copied().collect()
    }

    /// Fail if any value is NaN or infinite
    pub fn ensure_finite(&self) -> Result<()> {
        match self.values.indexed_iter().find(|(_, v)| !v.is_finite()) {
            Some(((row, col), v)) => Err(ForecastError::DataError(format!(
                "Window contains non-finite value {} at row {}, feature {}",
                v, row, col
            ))),
            None => Ok(()),
        }
    }

    /// Drop the oldest row and append `row` as the newest
    pub fn advance(&mut self, row: &[f64]) -> Result<()> {
        if row.len() != self.feature_count() {
            return Err(ForecastError::WindowShape {
                expected: (1, self.feature_count()),
                actual: (1, row.len()),
            });
        }

        let n = self.len();
        let shifted = self.values.slice(s![1.., ..]).to_owned();
        self.values.slice_mut(s![..n - 1, ..]).assign(&shifted);
        self.values.row_mut(n - 1).assign(&ArrayView1::from(row));
        Ok(())
    }
}

/// Rows strictly before `date`, or `None` when `date` is absent or has
/// fewer than `window_length` prior rows.
pub fn window_ending_at(
    table: &TimeSeriesTable,
    date: NaiveDate,
    window_length: usize,
) -> Option<Window> {
    let position = table.position(date)?;
    if window_length == 0 || position < window_length {
        return None;
    }
    let rows = table.rows(position - window_length, position).ok()?;
    Window::new(rows.to_owned(), window_length).ok()
}

/// The last `window_length` rows of the table
pub fn last_window(table: &TimeSeriesTable, window_length: usize) -> Option<Window> {
    if window_length == 0 || table.len() < window_length {
        return None;
    }
    let rows = table.rows(table.len() - window_length, table.len()).ok()?;
    Window::new(rows.to_owned(), window_length).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::FeatureSchema;
    use chrono::Days;
    use ndarray::array;
    use rstest::rstest;
    use std::sync::Arc;

    fn day(n: u64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(n - 1)
    }

    /// Row `n` (1-based) holds `[n, 10 n]`
    fn table(rows: u64) -> TimeSeriesTable {
        let schema = Arc::new(FeatureSchema::new(["a", "b"]).unwrap());
        let rows = (1..=rows)
            .map(|n| (day(n), vec![n as f64, 10.0 * n as f64]))
            .collect();
        TimeSeriesTable::from_rows(schema, rows).unwrap()
    }

    #[test]
    fn test_window_excludes_anchor_row() {
        let table = table(40);
        let window = window_ending_at(&table, day(31), 30).unwrap();

        assert_eq!(window.len(), 30);
        assert_eq!(window.values()[[0, 0]], 1.0);
        assert_eq!(window.newest().to_vec(), vec![30.0, 300.0]);
    }

    #[rstest]
    #[case(10)]
    #[case(30)]
    #[case(1)]
    fn test_insufficient_history(#[case] anchor: u64) {
        let table = table(40);
        assert!(window_ending_at(&table, day(anchor), 30).is_none());
    }

    #[rstest]
    #[case(31)]
    #[case(35)]
    #[case(40)]
    fn test_window_length_invariant(#[case] anchor: u64) {
        let table = table(40);
        let window = window_ending_at(&table, day(anchor), 30).unwrap();
        assert_eq!(window.len(), 30);
        assert_eq!(window.newest()[0], (anchor - 1) as f64);
    }

    #[test]
    fn test_missing_date_is_not_found() {
        let table = table(40);
        assert!(window_ending_at(&table, day(41), 30).is_none());
        assert!(window_ending_at(&table, day(35), 0).is_none());
    }

    #[test]
    fn test_last_window() {
        let table = table(40);
        let window = last_window(&table, 30).unwrap();
        assert_eq!(window.values()[[0, 0]], 11.0);
        assert_eq!(window.newest()[0], 40.0);

        assert!(last_window(&table, 41).is_none());
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        let result = Window::new(array![[1.0], [2.0]], 3);
        assert!(matches!(
            result,
            Err(ForecastError::WindowShape {
                expected: (3, 1),
                actual: (2, 1)
            })
        ));
    }

    #[test]
    fn test_advance_and_flatten() {
        let mut window = Window::new(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]], 3).unwrap();
        assert_eq!(window.flattened().to_vec(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);

        window.advance(&[7.0, 8.0]).unwrap();
        assert_eq!(window.values(), array![[3.0, 4.0], [5.0, 6.0], [7.0, 8.0]]);
        assert!(window.advance(&[1.0]).is_err());
    }

    #[test]
    fn test_ensure_finite() {
        let window = Window::new(array![[1.0], [f64::NAN]], 2).unwrap();
        assert!(matches!(window.ensure_finite(), Err(ForecastError::DataError(_))));
    }
}
