//! Health and user listing handlers.

use axum::extract::State;
use axum::{Extension, Json};
use wisp_core::context::RequestContext;

use crate::AppState;
use crate::error::AppResult;
use crate::models::{HealthResponse, UserListResponse};

/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

/// `GET /list` and `GET /users`: every registered email.
pub async fn list_users_handler(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> AppResult<Json<UserListResponse>> {
    let user_emails = state.sessions.list_emails(&ctx).await?;
    Ok(Json(UserListResponse { user_emails }))
}
