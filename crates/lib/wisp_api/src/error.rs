//! Application error types.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;
use wisp_core::auth::AuthError;

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Request cancelled")]
    RequestTimeout,

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::InvalidCredentials => (
                StatusCode::BAD_REQUEST,
                "invalid_credentials",
                "Invalid email or password",
            ),
            AppError::Conflict(m) => (StatusCode::CONFLICT, "conflict", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::RequestTimeout => (
                StatusCode::REQUEST_TIMEOUT,
                "request_cancelled",
                "Request cancelled",
            ),
            AppError::Internal(detail) => {
                error!(detail = %detail, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::UserNotFound | AuthError::WrongCredentials => AppError::InvalidCredentials,
            AuthError::DuplicateEmail => AppError::Conflict("Email already registered".into()),
            AuthError::Token(t) => AppError::Unauthorized(t.to_string()),
            AuthError::Cancelled => AppError::RequestTimeout,
            AuthError::StoreUnavailable(msg) | AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use wisp_core::auth::TokenError;

    use super::*;

    fn status_of(e: AuthError) -> StatusCode {
        AppError::from(e).into_response().status()
    }

    #[test]
    fn auth_errors_map_to_one_taxonomy() {
        assert_eq!(status_of(AuthError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::UserNotFound), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::WrongCredentials), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AuthError::DuplicateEmail), StatusCode::CONFLICT);
        assert_eq!(status_of(AuthError::Cancelled), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(
            status_of(AuthError::StoreUnavailable("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        for t in [
            TokenError::Malformed,
            TokenError::Expired,
            TokenError::WrongSigningMethod,
            TokenError::WrongType,
            TokenError::Revoked,
            TokenError::UserMismatch,
        ] {
            assert_eq!(status_of(AuthError::Token(t)), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn unknown_email_and_wrong_password_look_the_same() {
        let a = AppError::from(AuthError::UserNotFound).to_string();
        let b = AppError::from(AuthError::WrongCredentials).to_string();
        assert_eq!(a, b);
    }
}
