//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::services::SessionError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Session(SessionError),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ApiError) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::Session(e) => match e {
                SessionError::InvalidDate(msg) => {
                    (StatusCode::BAD_REQUEST, ApiError::new("INVALID_DATE", msg))
                }
                SessionError::InvalidQuery(msg) => {
                    (StatusCode::BAD_REQUEST, ApiError::new("INVALID_QUERY", msg))
                }
                SessionError::Source { source_name, error } => (
                    StatusCode::BAD_GATEWAY,
                    ApiError::new("SOURCE_ERROR", format!("Source '{}' failed", source_name))
                        .with_details(error.to_string()),
                ),
                SessionError::Configuration { message, .. } => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiError::new("CONFIGURATION_ERROR", message),
                ),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = self.status_and_body();
        (status, Json(error)).into_response()
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}
