use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::repository::StoreError;

/// Convenience alias for handler and service return types.
pub type AppResult<T> = Result<T, AppError>;

/// AppError
///
/// Request-level failure. Authorization variants are raised before any store
/// mutation; store and payment details are logged, never returned to clients.
#[derive(Debug, Error)]
pub enum AppError {
    /// Missing, invalid, expired or revoked session credential.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated caller without the admin capability.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated caller acting on another identity's resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A path identifier that does not parse as a store key.
    #[error("Malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),

    #[error("Payment provider failure: {0}")]
    Payment(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Unauthenticated(m) => (StatusCode::UNAUTHORIZED, "unauthenticated", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::Store(StoreError::Duplicate(m)) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::MalformedIdentifier(_)
            | AppError::Store(_)
            | AppError::Payment(_)
            | AppError::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}
