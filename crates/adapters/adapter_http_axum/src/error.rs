//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use miotac_domain::error::MiotError;

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`MiotError`] and malformed requests to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// The request could not be decoded.
    BadRequest(String),
    Domain(MiotError),
}

impl From<MiotError> for ApiError {
    fn from(err: MiotError) -> Self {
        Self::Domain(err)
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Self::Domain(MiotError::Validation(err)) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Domain(MiotError::NotFound(err)) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Domain(MiotError::Device(err)) => {
                tracing::warn!(error = %err, "device error");
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
            Self::Domain(MiotError::Storage(err)) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
