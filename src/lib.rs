pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod filters;
pub mod handlers;
pub mod middleware;
pub mod permissions;
pub mod queries;
pub mod refresh;
pub mod services;
pub mod state;
pub mod warehouse;

use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::SecurityConfig;
use crate::state::AppState;

/// Build the full router; every route sees the session middleware
pub fn app(state: AppState) -> Router {
    Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        // Session
        .merge(session_routes())
        .merge(dashboard_routes())
        // Admin
        .merge(admin_routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ))
        .with_state(state)
}

/// CORS for the dashboard front end; permissive when no origins are listed
pub fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring malformed CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

fn session_routes() -> Router<AppState> {
    use handlers::session;

    Router::new()
        .route("/api/auth/permissions", get(session::permissions_get))
        .route("/api/pages/:page", get(session::page_get))
}

fn dashboard_routes() -> Router<AppState> {
    use handlers::dashboard;

    Router::new().route("/api/dashboard/:query", post(dashboard::query_post))
}

fn admin_routes() -> Router<AppState> {
    use handlers::admin;

    Router::new()
        .route("/api/admin/cache/invalidate/:tag", post(admin::invalidate_post))
        .route("/api/admin/cache/refresh", post(admin::refresh_post))
        .route("/api/admin/cache/stats", get(admin::stats_get))
}
