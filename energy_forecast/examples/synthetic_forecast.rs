use chrono::NaiveDate;
use energy_forecast::data::synthetic::daily_table;
use energy_forecast::models::{Activation, DenseLayer, FeedForwardNetwork, LstmLayer, RecurrentNetwork};
use energy_forecast::{FeatureScaler, ServiceConfig, ServiceContext};
use ndarray::{Array1, Array2};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::default();
    let schema = Arc::new(config.schema()?);
    let width = schema.len();
    let window_length = config.window_length;

    // Half a year of seeded data
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).ok_or("invalid start date")?;
    let table = daily_table(schema.clone(), start, 182, 42)?;
    println!(
        "Generated {} rows from {} to {}",
        table.len(),
        start,
        table.last_date().ok_or("empty table")?
    );

    let scaler = FeatureScaler::fit_min_max(&table, (0.0, 1.0))?;

    // Feed-forward: mean of the last seven days of each feature
    let mut kernel = Array2::<f64>::zeros((window_length * width, width));
    for lag in 0..7 {
        for j in 0..width {
            kernel[[(window_length - 1 - lag) * width + j, j]] = 1.0 / 7.0;
        }
    }
    let feed_forward = FeedForwardNetwork::new(
        "weekly_mean",
        vec![DenseLayer::new(kernel, Array1::zeros(width), Activation::Linear)?],
    )?;

    // Recurrent: untrained LSTM pulled towards the middle of the range
    let units = 4;
    let lstm = LstmLayer::new(
        Array2::from_elem((width, 4 * units), 0.05),
        Array2::zeros((units, 4 * units)),
        Array1::zeros(4 * units),
    )?;
    let head = DenseLayer::new(
        Array2::from_elem((units, width), 0.1),
        Array1::from_elem(width, 0.5),
        Activation::Sigmoid,
    )?;
    let recurrent = RecurrentNetwork::new("untrained_lstm", lstm, vec![head])?;

    let context = ServiceContext::from_parts(
        &config,
        Some(table),
        Some(scaler),
        Some(Box::new(feed_forward)),
        Some(Box::new(recurrent)),
    )?;
    println!("Ready: {}", context.readiness().ready);

    let date = NaiveDate::from_ymd_opt(2024, 6, 1).ok_or("invalid date")?;
    let point = context.predict_at(date)?;
    println!("\nPrediction for {}:", date);
    for (feature, value) in point.prediction.iter() {
        println!("  {:<40} {:>10.2}", feature, value);
    }

    let from = NaiveDate::from_ymd_opt(2024, 5, 1).ok_or("invalid date")?;
    let report = context.evaluate_range(from, date)?;
    println!("\n{}", report);

    let forecast = context.forecast_months(1)?;
    println!("Forecast for the next {} days:", forecast.len());
    forecast.write_csv(std::io::stdout())?;

    Ok(())
}
