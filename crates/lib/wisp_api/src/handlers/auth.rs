//! Session request handlers.

use axum::extract::State;
use axum::{Extension, Json};
use tracing::warn;
use wisp_core::auth::jwt::parse_claims_unverified;
use wisp_core::auth::{AuthError, TokenError};
use wisp_core::context::RequestContext;

use crate::AppState;
use crate::error::AppResult;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    AccessTokenResponse, LoginRequest, MessageResponse, RefreshRequest, RegisterRequest,
    TokenResponse,
};
use crate::validation::ValidatedJson;

/// `POST /register`: create a `user` account.
pub async fn register_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> AppResult<Json<MessageResponse>> {
    state
        .sessions
        .register(&ctx, &body.email, &body.password)
        .await?;
    Ok(Json(MessageResponse {
        message: "user registered".into(),
    }))
}

/// `POST /login`: verify credentials and start a session.
pub async fn login_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(body): ValidatedJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let user = state
        .sessions
        .login(&ctx, &body.email, &body.password)
        .await?;
    let pair = state.sessions.start_session(&ctx, &user).await?;
    Ok(Json(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

/// `POST /auth/refresh` and `POST /get_new_access`: mint a new access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<AccessTokenResponse>> {
    let access_token = state
        .sessions
        .refresh_access_token(&ctx, &body.refresh_token)
        .await?;
    Ok(Json(AccessTokenResponse { access_token }))
}

/// `POST /logout`: revoke the caller's own refresh token.
pub async fn logout_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    AuthenticatedUser(identity): AuthenticatedUser,
    ValidatedJson(body): ValidatedJson<RefreshRequest>,
) -> AppResult<Json<MessageResponse>> {
    let claims = parse_claims_unverified(&body.refresh_token).map_err(AuthError::Token)?;
    if claims.email != identity.email {
        warn!(
            request_id = ctx.request_id(),
            caller = %identity.email,
            "logout with another user's refresh token"
        );
        return Err(AuthError::Token(TokenError::UserMismatch).into());
    }

    state.sessions.logout(&ctx, &body.refresh_token).await?;
    Ok(Json(MessageResponse {
        message: "logged out".into(),
    }))
}
