//! Persistence contracts the session layer depends on.
//!
//! Implementations must tolerate concurrent callers. None of them retry:
//! backend failures surface as `AuthError::StoreUnavailable`.

use std::time::Duration;

use async_trait::async_trait;

use super::AuthError;
use crate::models::auth::{Role, User};

/// Durable user records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a user. Fails with `DuplicateEmail` if the email is taken.
    async fn add_user(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
        is_active: bool,
    ) -> Result<(), AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn check_exists(&self, email: &str) -> Result<bool, AuthError>;

    /// Overwrite the user's refresh token. Last write wins.
    async fn set_refresh_token(&self, email: &str, token: &str) -> Result<(), AuthError>;

    async fn clear_refresh_token(&self, email: &str) -> Result<(), AuthError>;

    async fn list_emails(&self) -> Result<Vec<String>, AuthError>;
}

/// TTL-bounded blacklist of revoked token ids.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Store `value` under `key`; the entry disappears after `ttl`.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AuthError>;

    async fn exists(&self, key: &str) -> Result<bool, AuthError>;
}

/// Blacklist key for a refresh token id.
pub fn revocation_key(jti: &str) -> String {
    format!("refresh_token:{jti}")
}
