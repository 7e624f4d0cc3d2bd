//! Unified error handling for the meeting service.
//!
//! `ServiceError` is what the meeting operations return; callers branch on its
//! variant. `ApiError` wraps it for handlers and implements `IntoResponse`, so
//! handlers can use `?` and still return the right HTTP status.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use meet_shared::api::ErrorResponse;
use thiserror::Error;

use crate::auth::AuthError;

/// Failure kinds of the meeting operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Credential acquisition or refresh failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Malformed input, or input the provider rejected
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The referenced meeting does not exist remotely
    #[error("Meeting not found: {0}")]
    NotFound(String),

    /// Any other provider failure, including transport faults
    #[error("Calendar provider error: {0}")]
    Remote(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn remote(message: impl Into<String>) -> Self {
        ServiceError::Remote(message.into())
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        ServiceError::Authentication(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::Validation(err.to_string())
    }
}

/// Unified error type for API handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Invalid request data caught before reaching the service
    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Service(ServiceError::NotFound(msg)) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::with_details("Meeting not found", msg.clone()),
            ),
            ApiError::Service(ServiceError::Validation(msg)) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details("Validation failed", msg.clone()),
            ),
            ApiError::Service(ServiceError::Remote(msg)) => {
                tracing::warn!("Calendar provider error: {}", msg);
                (
                    StatusCode::BAD_REQUEST,
                    ErrorResponse::with_details("Calendar provider error", msg.clone()),
                )
            }
            ApiError::Service(ServiceError::Authentication(msg)) => {
                tracing::error!("Authentication error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::with_details("Calendar authorization unavailable", msg.clone()),
                )
            }
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_details("Invalid request", msg.clone()),
            ),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
