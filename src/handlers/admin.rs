use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::{CacheStats, CacheTag};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::permissions::{Permissions, Role};
use crate::refresh::RefreshEvent;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct InvalidateResult {
    pub tag: CacheTag,
    pub purged: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Tags whose upstream data was reloaded; all tags when omitted
    #[serde(default)]
    pub tags: Option<Vec<CacheTag>>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshAccepted {
    pub id: Uuid,
    pub tags: Vec<CacheTag>,
}

fn require_admin(state: &AppState, session: &Session) -> Result<Permissions, ApiError> {
    let perms = state.service.authorize(session.claims())?;
    if perms.role() != Role::Admin {
        tracing::warn!("Non-admin '{}' attempted a cache maintenance call", perms.email());
        return Err(ApiError::forbidden("Cache maintenance requires the admin role"));
    }
    Ok(perms)
}

/// POST /api/admin/cache/invalidate/:tag - purge one tag immediately
pub async fn invalidate_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(tag): Path<String>,
) -> ApiResult<InvalidateResult> {
    let perms = require_admin(&state, &session)?;
    let tag: CacheTag = tag.parse().map_err(ApiError::bad_request)?;

    let purged = state.service.force_invalidate(tag);
    tracing::info!("Admin '{}' invalidated '{}'", perms.email(), tag);

    Ok(ApiResponse::success(InvalidateResult { tag, purged }))
}

/// POST /api/admin/cache/refresh - report a completed warehouse load
///
/// The purge happens on the refresh listener; the response only confirms
/// the event was queued.
pub async fn refresh_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    body: Option<Json<RefreshRequest>>,
) -> ApiResult<RefreshAccepted> {
    let perms = require_admin(&state, &session)?;
    let request = body.map(|Json(request)| request).unwrap_or_default();

    let source = request.source.unwrap_or_else(|| perms.email().to_string());
    let event = RefreshEvent::new(request.tags.unwrap_or_default(), source);
    let id = event.id;
    let tags = if event.tags.is_empty() {
        CacheTag::ALL.to_vec()
    } else {
        event.tags.clone()
    };

    state
        .refresh
        .refreshed(event)
        .await
        .map_err(|e| ApiError::service_unavailable(e.to_string()))?;

    Ok(ApiResponse::with_status(RefreshAccepted { id, tags }, StatusCode::ACCEPTED))
}

/// GET /api/admin/cache/stats
pub async fn stats_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<CacheStats> {
    require_admin(&state, &session)?;
    Ok(ApiResponse::success(state.service.cache_stats()))
}
