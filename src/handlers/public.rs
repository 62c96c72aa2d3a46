use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Funnel Dashboard API",
            "version": version,
            "description": "Role-gated funnel analytics with a permission-scoped query cache",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "dashboard": "/api/dashboard/:query (session)",
                "permissions": "/api/auth/permissions (session)",
                "pages": "/api/pages/:page (session)",
                "cache": "/api/admin/cache/{invalidate/:tag,refresh,stats} (admin)",
            }
        }
    }))
}

/// GET /health - liveness plus a warehouse round trip
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    let entries = state.service.cache_stats().entry_count;

    match state.service.executor().ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "warehouse": "ok",
                    "cached_entries": entries
                }
            })),
        ),
        Err(e) => {
            // Driver text stays in the log
            tracing::error!("Health check warehouse ping failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "error": "warehouse unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                        "warehouse": "unavailable",
                        "cached_entries": entries
                    }
                })),
            )
        }
    }
}
