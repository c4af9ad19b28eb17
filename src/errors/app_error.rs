use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the HTTP endpoints.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Cannot determine public host for the media stream URL")]
    MissingHost,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingHost => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(status = %status, error = %self, "Request rejected");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
