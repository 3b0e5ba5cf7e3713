//! HTTP error handling and response types.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::RepositoryError;
use crate::error::CoachError;

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
    /// Malformed request that never reached the service layer
    BadRequest(String),
    NotFound(String),
    Internal(String),
    Coach(CoachError),
}

fn status_for(err: &CoachError) -> StatusCode {
    match err {
        CoachError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CoachError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
        CoachError::Forbidden(_) => StatusCode::FORBIDDEN,
        CoachError::NotFound(_) => StatusCode::NOT_FOUND,
        CoachError::Conflict(_) => StatusCode::CONFLICT,
        CoachError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoachError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("NOT_FOUND", msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Coach(CoachError::Storage(e)) => {
                tracing::error!("Storage failure: {}", e);
                let context = e.context();
                let mut body = ApiError::new("STORAGE_ERROR", e.to_string());
                if context.operation.is_some() || context.details.is_some() {
                    body = body.with_details(context.to_string());
                }
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
            AppError::Coach(e) => (status_for(&e), ApiError::new(e.code(), e.to_string())),
        };

        (status, Json(error)).into_response()
    }
}

impl From<CoachError> for AppError {
    fn from(err: CoachError) -> Self {
        AppError::Coach(err)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Coach(CoachError::from(err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
