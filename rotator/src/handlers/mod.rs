// Admin API handlers

pub mod health;
pub mod leaderboard;
pub mod rotation;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::errors::{ApiError, SchedulerError, StoreError};

/// An API error paired with the HTTP status it maps to.
pub struct AppError(pub StatusCode, pub ApiError);

impl AppError {
    pub fn bad_request(api: ApiError) -> Self {
        Self(StatusCode::BAD_REQUEST, api)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, err.into())
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        let status = match &err {
            SchedulerError::NotConfigured(_) => StatusCode::CONFLICT,
            SchedulerError::Gateway(_) => StatusCode::BAD_GATEWAY,
            SchedulerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self(status, err.into())
    }
}
