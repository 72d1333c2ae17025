//! Mapping connector and directory failures onto HTTP responses

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use quarry_connector::{ConnectorError, StoreError};
use serde::Serialize;

/// `{"status": "error", "message": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub status: &'static str,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub enum ApiError {
    /// Bare-text status such as 403 "Unauthorized" or 404 "Not found"
    Plain(StatusCode, &'static str),
    Json(StatusCode, ErrorBody),
}

impl ApiError {
    pub fn unauthenticated() -> Self {
        ApiError::Plain(StatusCode::UNAUTHORIZED, "Authentication required")
    }

    pub fn forbidden() -> Self {
        ApiError::Plain(StatusCode::FORBIDDEN, "Unauthorized")
    }

    pub fn not_found() -> Self {
        ApiError::Plain(StatusCode::NOT_FOUND, "Not found")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Json(StatusCode::BAD_REQUEST, ErrorBody::new(message))
    }

    /// A failure reported with 200 and an error body
    pub fn in_band(message: impl Into<String>) -> Self {
        ApiError::Json(StatusCode::OK, ErrorBody::new(message))
    }

    pub fn internal() -> Self {
        ApiError::Json(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Internal server error"),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Plain(status, text) => (status, text).into_response(),
            ApiError::Json(status, body) => (status, Json(body)).into_response(),
        }
    }
}

impl From<ConnectorError> for ApiError {
    fn from(err: ConnectorError) -> Self {
        match err {
            ConnectorError::Unauthorized(_) => ApiError::forbidden(),
            ConnectorError::NotFound => ApiError::not_found(),
            ConnectorError::UnsupportedKind(_) | ConnectorError::Invalid(_) => {
                ApiError::bad_request(err.to_string())
            }
            ConnectorError::Store(msg) => {
                tracing::error!(error = %msg, "directory store failed");
                ApiError::internal()
            }
            in_band => ApiError::in_band(in_band.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) | StoreError::Invalid(msg) => ApiError::bad_request(msg),
            StoreError::NotFound(_) => ApiError::not_found(),
            StoreError::Storage(msg) => {
                tracing::error!(error = %msg, "directory store failed");
                ApiError::internal()
            }
        }
    }
}
