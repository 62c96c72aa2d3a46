use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Serialize;

use crate::error::ApiError;
use crate::filters::{Dimension, FilterValue};
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::permissions::{self, pages, PageId, Role};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionsView {
    pub email: String,
    pub role: Role,
    pub allowed_pages: Vec<PageId>,
    pub scopes: BTreeMap<Dimension, FilterValue>,
    pub can_export: bool,
    pub can_manage_users: bool,
}

#[derive(Debug, Serialize)]
pub struct PageAccess {
    pub page: PageId,
    pub name: Option<&'static str>,
    pub allowed: bool,
}

/// GET /api/auth/permissions - role, pages and scopes of the current session
pub async fn permissions_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> ApiResult<PermissionsView> {
    let perms = state.service.authorize(session.claims())?;

    Ok(ApiResponse::success(PermissionsView {
        email: perms.email().to_string(),
        role: perms.role(),
        allowed_pages: permissions::allowed_pages(&perms).into_iter().collect(),
        scopes: perms.scopes().map(|(d, v)| (*d, v.clone())).collect(),
        can_export: perms.can_export(),
        can_manage_users: perms.can_manage_users(),
    }))
}

/// GET /api/pages/:page - page gate for the front end's route guard
pub async fn page_get(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(page): Path<PageId>,
) -> ApiResult<PageAccess> {
    let perms = state.service.authorize(session.claims())?;

    if !permissions::has_page(&perms, page) {
        return Err(ApiError::forbidden(format!("Page {} is not available to role '{}'", page, perms.role())));
    }

    Ok(ApiResponse::success(PageAccess {
        page,
        name: pages::name(page),
        allowed: true,
    }))
}
