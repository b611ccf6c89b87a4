//! Access gate: bearer authentication followed by a role check.

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;
use wisp_core::auth::AuthError;
use wisp_core::models::auth::{Identity, Role};

use crate::AppState;
use crate::error::AppError;

/// Identity stored in request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

/// Token part of an `Authorization` value. The scheme is case-sensitive.
fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}

/// Axum middleware: extracts `Authorization: Bearer <token>`, validates it as
/// an access token, and injects `AuthenticatedUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Authorization header is required".into()))?;

    let token = bearer_token(header)
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".into()))?;

    let claims = state
        .sessions
        .issuer()
        .validate_access(token)
        .map_err(|e| {
            debug!(error = %e, "access token rejected");
            AppError::from(AuthError::Token(e))
        })?;

    request
        .extensions_mut()
        .insert(AuthenticatedUser(Identity::from_claims(&claims)));

    Ok(next.run(request).await)
}

/// Axum middleware: admits only identities holding every capability of `role`.
///
/// Must run after `require_auth`.
pub async fn require_role(role: Role, request: Request, next: Next) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| AppError::Unauthorized("Role information missing".into()))?;

    if !user.0.has_all(role.capabilities()) {
        debug!(email = %user.0.email, role = %user.0.role, required = %role, "insufficient permissions");
        return Err(AppError::Forbidden("Insufficient permissions".into()));
    }

    Ok(next.run(request).await)
}
