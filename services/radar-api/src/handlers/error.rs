//! JSON error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use radar_common::RadarError;
use serde::Serialize;
use tracing::error;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub description: String,
}

/// A [`RadarError`] rendered as `{"code": ..., "description": ...}`.
#[derive(Debug)]
pub struct ApiError(pub RadarError);

impl From<RadarError> for ApiError {
    fn from(err: RadarError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = ErrorBody {
            code: self.0.error_code(),
            description: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
