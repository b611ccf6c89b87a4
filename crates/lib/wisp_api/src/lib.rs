//! # wisp_api
//!
//! HTTP API library for Wisp.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod validation;

use axum::Router;
use axum::extract::Request;
use axum::middleware::{Next, from_fn, from_fn_with_state};
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;
use wisp_core::auth::session::SessionService;
use wisp_core::models::auth::Role;

use crate::config::ApiConfig;
use crate::handlers::{auth, users};
use crate::middleware::auth::{require_auth, require_role};
use crate::middleware::context::request_context;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session lifecycle over the credential and revocation stores.
    pub sessions: SessionService,
    /// API configuration.
    pub config: ApiConfig,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_REGISTER, post(auth::register_handler))
        .route(routes::POST_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler));

    let user_routes = Router::new()
        .route(routes::POST_GET_NEW_ACCESS, post(auth::refresh_handler))
        .route_layer(from_fn(|req: Request, next: Next| {
            require_role(Role::User, req, next)
        }));

    let admin_routes = Router::new()
        .route(routes::GET_USERS, get(users::list_users_handler))
        .route_layer(from_fn(|req: Request, next: Next| {
            require_role(Role::Admin, req, next)
        }));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(routes::GET_HEALTH, get(users::health_handler))
        .route(routes::GET_LIST, get(users::list_users_handler))
        .route(routes::POST_LOGOUT, post(auth::logout_handler))
        .merge(user_routes)
        .merge(admin_routes)
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(from_fn_with_state(state.clone(), request_context))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
