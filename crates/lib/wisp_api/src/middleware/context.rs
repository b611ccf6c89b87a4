//! Builds the `RequestContext` every handler receives.

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;
use wisp_core::context::RequestContext;

use crate::AppState;

/// Header carrying the caller's request id; echoed on the response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Axum middleware: attaches a `RequestContext` with the request id and the
/// configured deadline.
pub async fn request_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let ctx = RequestContext::new(request_id.clone()).with_timeout(state.config.request_timeout);
    request.extensions_mut().insert(ctx);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
