//! JSON error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use skycast_ingest::IngestError;

/// Body of every non-2xx API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    /// Missing or out of range query parameters
    BadRequest(String),
    Ingest(IngestError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Ingest(IngestError::InvalidCoord(_)) => StatusCode::BAD_REQUEST,
            AppError::Ingest(IngestError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Ingest(IngestError::Core(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Ingest(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::BadRequest(msg) => ApiError::new("BAD_REQUEST", msg),
            AppError::Ingest(e @ IngestError::InvalidCoord(_)) => {
                ApiError::new("BAD_REQUEST", e.to_string())
            }
            AppError::Ingest(e @ IngestError::NotFound(_)) => {
                ApiError::new("NOT_FOUND", e.to_string())
            }
            AppError::Ingest(e @ IngestError::Core(_)) => {
                tracing::warn!(error = %e, "forecast rejected");
                ApiError::new("INVALID_SAMPLES", e.to_string())
            }
            AppError::Ingest(e) => {
                tracing::warn!(error = %e, "upstream forecast failed");
                ApiError::new("UPSTREAM_ERROR", e.to_string())
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        AppError::Ingest(err)
    }
}
