use axum::{
    extract::{Path, State},
    Extension, Json,
};

use crate::filters::DashboardFilters;
use crate::middleware::{ApiResponse, ApiResult, Session};
use crate::state::AppState;
use crate::warehouse::QueryResult;

/// POST /api/dashboard/:query - run a catalog query scoped to the session
///
/// Expected Input:
/// ```json
/// {
///   "startDate": "2025-01-01",
///   "endDate": "2025-03-31",
///   "disposition": "open",
///   "dimensions": { "channel": ["Outbound", "Marketing"], "stage": "SQO" }
/// }
/// ```
///
/// Any `sga` / `sgm` value is replaced by the session's own scope.
pub async fn query_post(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(query): Path<String>,
    Json(filters): Json<DashboardFilters>,
) -> ApiResult<QueryResult> {
    let result = state
        .service
        .get_scoped_result(session.claims(), &query, &filters)
        .await?;
    Ok(ApiResponse::success(result))
}
