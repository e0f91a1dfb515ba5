//! Mapping of failures onto HTTP responses

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use energy_forecast::ForecastError;
use serde::Serialize;
use tokio::task::JoinError;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A failed request
#[derive(Debug)]
pub enum ApiError {
    /// The library rejected the operation
    Forecast(ForecastError),
    /// The request body or query did not deserialize
    Rejected { status: StatusCode, message: String },
    /// The blocking task running the operation did not complete
    Task(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forecast(err) => match err {
                ForecastError::ServiceNotReady(_) | ForecastError::ModelUnavailable(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                ForecastError::InsufficientHistory { .. } => StatusCode::NOT_FOUND,
                ForecastError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Rejected { status, .. } => *status,
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Forecast(err) => err.to_string(),
            ApiError::Rejected { message, .. } => message.clone(),
            ApiError::Task(message) => message.clone(),
        }
    }
}

impl From<ForecastError> for ApiError {
    fn from(err: ForecastError) -> Self {
        ApiError::Forecast(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<JoinError> for ApiError {
    fn from(err: JoinError) -> Self {
        ApiError::Task(format!("Request task failed: {}", err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            error!(error = %message, status = status.as_u16(), "request failed");
        }
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
