//! API route handlers

use crate::error::ApiError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use energy_forecast::metrics::EvaluationReport;
use energy_forecast::service::LoadFailure;
use energy_forecast::utils::parse_request_date;
use energy_forecast::{ForecastResult, PointPrediction, ServiceContext};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type AppState = Arc<ServiceContext>;

/// Routes over a loaded context
pub fn router(context: AppState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .route("/forecast", post(forecast_months).get(forecast_days))
        .route("/evaluate", post(evaluate))
        .with_state(context)
}

pub async fn banner() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Building energy forecast API",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

#[derive(Debug, Serialize)]
pub struct Dependencies {
    pub feed_forward_model: bool,
    pub recurrent_model: bool,
    pub scaler: bool,
    pub dataset: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ready: bool,
    pub dependencies: Dependencies,
    pub table_rows: usize,
    pub errors: Vec<LoadFailure>,
}

pub async fn health(State(context): State<AppState>) -> Json<HealthResponse> {
    let readiness = context.readiness();
    Json(HealthResponse {
        status: if readiness.ready { "ok" } else { "degraded" },
        ready: readiness.ready,
        dependencies: Dependencies {
            feed_forward_model: readiness.feed_forward_model,
            recurrent_model: readiness.recurrent_model,
            scaler: readiness.scaler,
            dataset: readiness.dataset,
        },
        table_rows: readiness.table_rows,
        errors: readiness.errors,
    })
}

/// Run a model-bound operation off the async workers
async fn run_blocking<T, F>(context: AppState, operation: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ServiceContext) -> energy_forecast::Result<T> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || operation(&context)).await?;
    Ok(result?)
}

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub date: String,
}

pub async fn predict(
    State(context): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<PointPrediction>, ApiError> {
    let Json(req) = payload?;
    let date = parse_request_date(&req.date)?;
    let point = run_blocking(context, move |ctx| ctx.predict_at(date)).await?;
    Ok(Json(point))
}

#[derive(Debug, Deserialize)]
pub struct ForecastRequest {
    pub months: usize,
}

pub async fn forecast_months(
    State(context): State<AppState>,
    payload: Result<Json<ForecastRequest>, JsonRejection>,
) -> Result<Json<ForecastResult>, ApiError> {
    let Json(req) = payload?;
    let forecast = run_blocking(context, move |ctx| ctx.forecast_months(req.months)).await?;
    Ok(Json(forecast))
}

#[derive(Debug, Deserialize)]
pub struct ForecastQuery {
    pub days: usize,
}

pub async fn forecast_days(
    State(context): State<AppState>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
) -> Result<Json<ForecastResult>, ApiError> {
    let Query(query) = query?;
    let forecast = run_blocking(context, move |ctx| ctx.forecast_days(query.days)).await?;
    Ok(Json(forecast))
}

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub from: String,
    pub to: String,
}

pub async fn evaluate(
    State(context): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> Result<Json<EvaluationReport>, ApiError> {
    let Json(req) = payload?;
    let from = parse_request_date(&req.from)?;
    let to = parse_request_date(&req.to)?;
    let report = run_blocking(context, move |ctx| ctx.evaluate_range(from, to)).await?;
    Ok(Json(report))
}
