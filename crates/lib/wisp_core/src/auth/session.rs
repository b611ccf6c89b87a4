//! Session lifecycle: register, login, refresh, logout, admin bootstrap.
//!
//! `SessionService` owns no mutable state of its own. Everything durable lives
//! in the `CredentialStore` and `RevocationStore`, so "one session per user"
//! is a last-write-wins property of `set_refresh_token`: two concurrent logins
//! race and the later write silently invalidates the other session.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::jwt::{TokenIssuer, parse_claims_unverified};
use super::password::{check_password, hash_password};
use super::store::{CredentialStore, RevocationStore, revocation_key};
use super::{AuthError, TokenError};
use crate::context::RequestContext;
use crate::models::auth::{Role, TokenPair, TokenSubject, TokenType, User};

/// Value written under a revoked `jti`.
const REVOKED_MARKER: &str = "revoked";

/// Admin account created at startup, if configured.
#[derive(Clone, Default)]
pub struct AdminBootstrap {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// What `ensure_admin_exists` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminBootstrapOutcome {
    /// Email or password not configured.
    Skipped,
    AlreadyPresent,
    Created,
}

/// Orchestrates the credential and revocation stores with the token issuer.
#[derive(Clone)]
pub struct SessionService {
    credentials: Arc<dyn CredentialStore>,
    revocations: Arc<dyn RevocationStore>,
    issuer: TokenIssuer,
}

impl SessionService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        revocations: Arc<dyn RevocationStore>,
        issuer: TokenIssuer,
    ) -> Self {
        Self {
            credentials,
            revocations,
            issuer,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    /// Create a `user`-role account.
    pub async fn register(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> Result<(), AuthError> {
        ctx.check()?;

        if self.credentials.check_exists(email).await? {
            return Err(AuthError::DuplicateEmail);
        }

        let password_hash = hash_password(password)?;

        ctx.check()?;
        self.credentials
            .add_user(email, &password_hash, Role::User, true)
            .await?;

        info!(request_id = ctx.request_id(), email, "user registered");
        Ok(())
    }

    /// Verify email + password. Performs no writes.
    pub async fn login(
        &self,
        ctx: &RequestContext,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        ctx.check()?;

        let user = self
            .credentials
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        check_password(password, &user.password_hash)?;

        debug!(request_id = ctx.request_id(), email, "credentials verified");
        Ok(user)
    }

    /// Mint a token pair for `user` and make its refresh token the only live one.
    ///
    /// Any refresh token from an earlier login stops working.
    pub async fn start_session(
        &self,
        ctx: &RequestContext,
        user: &User,
    ) -> Result<TokenPair, AuthError> {
        ctx.check()?;

        let user_id = user.id.to_string();
        let pair = self.issuer.generate_token_pair(TokenSubject {
            email: &user.email,
            user_id: &user_id,
            role: user.role.as_str(),
            is_active: user.is_active,
        })?;

        ctx.check()?;
        self.credentials
            .set_refresh_token(&user.email, &pair.refresh_token)
            .await?;

        info!(request_id = ctx.request_id(), email = %user.email, "session started");
        Ok(pair)
    }

    /// Exchange a live refresh token for a new access token.
    ///
    /// The refresh token itself is not rotated.
    pub async fn refresh_access_token(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<String, AuthError> {
        ctx.check()?;

        let claims = self.issuer.validate_refresh(refresh_token)?;

        if self.revocations.exists(&revocation_key(&claims.jti)).await? {
            return Err(TokenError::Revoked.into());
        }

        let user = self
            .credentials
            .find_by_email(&claims.email)
            .await?
            .ok_or(TokenError::UserMismatch)?;

        // A later login overwrote the stored token, or logout cleared it.
        if user.refresh_token.as_deref() != Some(refresh_token) {
            warn!(
                request_id = ctx.request_id(),
                email = %claims.email,
                "refresh token does not match the active session"
            );
            return Err(TokenError::UserMismatch.into());
        }

        ctx.check()?;
        let user_id = user.id.to_string();
        let access_token = self.issuer.generate_access_token(TokenSubject {
            email: &user.email,
            user_id: &user_id,
            role: user.role.as_str(),
            is_active: user.is_active,
        })?;

        debug!(request_id = ctx.request_id(), email = %user.email, "access token refreshed");
        Ok(access_token)
    }

    /// Revoke a refresh token.
    ///
    /// The blacklist entry is authoritative. Clearing the stored token is
    /// best-effort: a failure there is logged and the logout still succeeds.
    pub async fn logout(&self, ctx: &RequestContext, refresh_token: &str) -> Result<(), AuthError> {
        ctx.check()?;

        let claims = parse_claims_unverified(refresh_token)?;
        if claims.token_type != TokenType::Refresh {
            return Err(TokenError::WrongType.into());
        }

        let max_ttl = self.issuer.config().refresh_ttl;
        if let Some(ttl) = revocation_ttl(claims.exp, Utc::now().timestamp(), max_ttl) {
            ctx.check()?;
            self.revocations
                .put(&revocation_key(&claims.jti), REVOKED_MARKER, ttl)
                .await?;
            debug!(request_id = ctx.request_id(), jti = %claims.jti, ttl_secs = ttl.as_secs(), "refresh token revoked");
        } else {
            debug!(request_id = ctx.request_id(), jti = %claims.jti, "refresh token already expired");
        }

        ctx.check()?;
        if let Err(e) = self.credentials.clear_refresh_token(&claims.email).await {
            warn!(
                request_id = ctx.request_id(),
                email = %claims.email,
                error = %e,
                "failed to clear stored refresh token"
            );
        }

        info!(request_id = ctx.request_id(), email = %claims.email, "logged out");
        Ok(())
    }

    /// Create the configured admin account if it does not exist yet.
    pub async fn ensure_admin_exists(
        &self,
        ctx: &RequestContext,
        admin: &AdminBootstrap,
    ) -> Result<AdminBootstrapOutcome, AuthError> {
        ctx.check()?;

        let (Some(email), Some(password)) = (
            admin.email.as_deref().filter(|e| !e.is_empty()),
            admin.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            warn!("ADMIN_EMAIL or ADMIN_PASSWORD not set, admin user won't be created");
            return Ok(AdminBootstrapOutcome::Skipped);
        };

        if self.credentials.check_exists(email).await? {
            info!(email, "admin user already exists");
            return Ok(AdminBootstrapOutcome::AlreadyPresent);
        }

        let password_hash = hash_password(password)?;

        ctx.check()?;
        match self
            .credentials
            .add_user(email, &password_hash, Role::Admin, true)
            .await
        {
            Ok(()) => {
                info!(email, "admin user created");
                Ok(AdminBootstrapOutcome::Created)
            }
            Err(AuthError::DuplicateEmail) => Ok(AdminBootstrapOutcome::AlreadyPresent),
            Err(e) => Err(e),
        }
    }

    /// Every registered email.
    pub async fn list_emails(&self, ctx: &RequestContext) -> Result<Vec<String>, AuthError> {
        ctx.check()?;
        self.credentials.list_emails().await
    }
}

/// Blacklist lifetime for a token expiring at `exp`.
///
/// `exp` comes from an unverified token, so it is never trusted beyond the
/// longest lifetime this issuer grants. `None` once the token has expired.
fn revocation_ttl(exp: i64, now: i64, max_ttl: Duration) -> Option<Duration> {
    let remaining = exp.saturating_sub(now);
    if remaining <= 0 {
        return None;
    }
    Some(Duration::from_secs(remaining.unsigned_abs()).min(max_ttl))
}
