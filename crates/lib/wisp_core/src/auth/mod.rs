//! Authentication and session lifecycle.
//!
//! Provides password hashing, JWT issuance and validation, the persistence
//! contracts the session layer depends on (plus their Postgres, Redis and
//! in-memory implementations), and the `SessionService` that ties them
//! together.

pub mod jwt;
pub mod memory;
pub mod password;
pub mod queries;
pub mod revocation;
pub mod session;
pub mod store;

use thiserror::Error;

/// Why a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token expired")]
    Expired,

    #[error("unexpected signing method")]
    WrongSigningMethod,

    #[error("wrong token type")]
    WrongType,

    #[error("token revoked")]
    Revoked,

    #[error("refresh token does not match the active session")]
    UserMismatch,
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid credentials")]
    WrongCredentials,

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Unknown email and wrong password are reported identically to clients.
    pub fn is_credential_error(&self) -> bool {
        matches!(self, AuthError::UserNotFound | AuthError::WrongCredentials)
    }
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        AuthError::StoreUnavailable(format!("postgres: {e}"))
    }
}

impl From<redis::RedisError> for AuthError {
    fn from(e: redis::RedisError) -> Self {
        AuthError::StoreUnavailable(format!("redis: {e}"))
    }
}
