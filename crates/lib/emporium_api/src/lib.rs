//! # emporium_api
//!
//! HTTP API library for Emporium authentication.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use emporium_core::auth::AuthManager;
use emporium_core::auth::oauth::OAuthStateStore;
use tower_http::cors::{Any, CorsLayer};

use crate::config::ApiConfig;
use crate::handlers::{auth, oauth};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Authentication manager, built once at startup.
    pub auth: Arc<AuthManager>,
    /// Pending OAuth authorizations keyed by `state`.
    pub oauth_state: Arc<OAuthStateStore>,
    /// API configuration.
    pub config: ApiConfig,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::GET_AUTH_OAUTH_PROVIDERS, get(oauth::providers_handler))
        .route(routes::GET_AUTH_OAUTH_AUTHORIZE, get(oauth::authorize_handler))
        .route(routes::POST_AUTH_OAUTH_CALLBACK, post(oauth::callback_handler));

    // Protected routes (require a live session)
    let protected = Router::new()
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(routes::GET_AUTH_ME, get(auth::me_handler))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_auth,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

/// Run all embedded database migrations.
pub async fn migrate(pool: &sqlx::PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    emporium_core::migrate::migrate(pool).await
}
