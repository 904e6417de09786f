//! Handlers for the `/activity-logs` resource.
//!
//! The filtered listing is for system administrators; `/me` lets any user
//! read their own trail.

use axum::extract::{Query, State};
use axum::Json;
use buildwatch_db::models::activity_log::{ActivityLog, ActivityLogQuery};
use buildwatch_db::repositories::ActivityLogRepo;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireSystemAdmin;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// One page of log entries plus the unpaginated match count.
#[derive(Debug, Serialize)]
pub struct ActivityLogPage {
    pub items: Vec<ActivityLog>,
    pub total: i64,
}

/// GET /api/v1/activity-logs?user_id=&action=&entity_type=&module=&level=&from=&to=
pub async fn query_activity_logs(
    State(state): State<AppState>,
    RequireSystemAdmin(_admin): RequireSystemAdmin,
    Query(params): Query<ActivityLogQuery>,
) -> AppResult<Json<DataResponse<ActivityLogPage>>> {
    let items = ActivityLogRepo::query(&state.pool, &params).await?;
    let total = ActivityLogRepo::count(&state.pool, &params).await?;
    Ok(Json(DataResponse {
        data: ActivityLogPage { items, total },
    }))
}

/// GET /api/v1/activity-logs/me
pub async fn my_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<ActivityLogPage>>> {
    let params = ActivityLogQuery {
        user_id: Some(user.user_id),
        limit: page.limit,
        offset: page.offset,
        ..Default::default()
    };
    let items = ActivityLogRepo::query(&state.pool, &params).await?;
    let total = ActivityLogRepo::count(&state.pool, &params).await?;
    Ok(Json(DataResponse {
        data: ActivityLogPage { items, total },
    }))
}
