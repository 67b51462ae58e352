use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::api::types::ErrorResponse;
use crate::domain::FeatureError;
use crate::error::ServerError;

/// Request failures, each mapped to one HTTP status
#[derive(Error, Debug)]
pub enum ApiError {
    /// Body is not JSON, not an object, or lacks a required key
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Keys are present but a value has the wrong type or range
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("storage error: {0}")]
    StorageError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MalformedRequest(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::ModelUnavailable(_) | Self::StorageError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_request",
            Self::InvalidInput(_) => "invalid_input",
            Self::ModelUnavailable(_) => "model_unavailable",
            Self::StorageError(_) => "storage_error",
        }
    }
}

impl From<FeatureError> for ApiError {
    fn from(err: FeatureError) -> Self {
        if err.is_structural() {
            Self::MalformedRequest(err.to_string())
        } else {
            Self::InvalidInput(err.to_string())
        }
    }
}

impl From<ServerError> for ApiError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::ModelUnavailable(msg) => Self::ModelUnavailable(msg),
            ServerError::Validation(msg) => Self::InvalidInput(msg),
            // everything else reaching a handler comes from a store call
            other => Self::StorageError(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
