//! Handlers for the `/policies` resource.
//!
//! Oversight roles manage policy documents; everyone else reads only what
//! has been published.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use buildwatch_core::activity::actions;
use buildwatch_core::policy::{validate_policy_dates, PolicyStatus};
use buildwatch_core::types::DbId;
use buildwatch_core::validation::require_non_empty;
use buildwatch_db::models::policy::{CreatePolicy, Policy, PolicyQuery, UpdatePolicy};
use buildwatch_db::repositories::PolicyRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireOversight;
use crate::response::{ActionResponse, DataResponse};
use crate::services::activity::{self, ActivityEntry};
use crate::state::AppState;

const ENTITY: &str = "Policy";

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/policies?category=&status=&search=
pub async fn list_policies(
    State(state): State<AppState>,
    user: AuthUser,
    Query(mut params): Query<PolicyQuery>,
) -> AppResult<Json<DataResponse<Vec<Policy>>>> {
    if !user.is_oversight() {
        params.status = Some(PolicyStatus::Published);
    }
    params.search = params
        .search
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let policies = PolicyRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: policies }))
}

/// GET /api/v1/policies/{id}
///
/// Each successful read increments `view_count`.
pub async fn get_policy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Policy>>> {
    let existing = find_policy(&state, id).await?;
    if !readable_by(existing.status, user.is_oversight()) {
        return Err(AppError::not_found(ENTITY, id));
    }
    let policy = PolicyRepo::view(&state.pool, id)
        .await?
        .ok_or(AppError::not_found(ENTITY, id))?;
    Ok(Json(DataResponse { data: policy }))
}

// ---------------------------------------------------------------------------
// Management
// ---------------------------------------------------------------------------

/// POST /api/v1/policies
pub async fn create_policy(
    State(state): State<AppState>,
    RequireOversight(user): RequireOversight,
    Json(input): Json<CreatePolicy>,
) -> AppResult<(StatusCode, Json<DataResponse<Policy>>)> {
    require_non_empty("title", &input.title).map_err(AppError::validation)?;
    validate_policy_dates(input.effective_date, input.expiry_date).map_err(AppError::validation)?;

    let policy = PolicyRepo::create(&state.pool, user.user_id, &input).await?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::CREATE_POLICY)
            .entity(ENTITY, policy.id)
            .details(format!("Created policy '{}'", policy.title)),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: policy })))
}

/// PUT /api/v1/policies/{id}
pub async fn update_policy(
    State(state): State<AppState>,
    RequireOversight(user): RequireOversight,
    Path(id): Path<DbId>,
    Json(input): Json<UpdatePolicy>,
) -> AppResult<Json<DataResponse<Policy>>> {
    let existing = find_policy(&state, id).await?;
    if let Some(title) = &input.title {
        require_non_empty("title", title).map_err(AppError::validation)?;
    }
    if input.status == Some(PolicyStatus::Published) && existing.status != PolicyStatus::Published
    {
        return Err(AppError::validation(
            "Use the publish action to publish a policy",
        ));
    }
    validate_policy_dates(
        input.effective_date.or(existing.effective_date),
        input.expiry_date.or(existing.expiry_date),
    )
    .map_err(AppError::validation)?;

    let policy = PolicyRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found(ENTITY, id))?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::UPDATE_POLICY).entity(ENTITY, id),
    )
    .await;

    Ok(Json(DataResponse { data: policy }))
}

/// DELETE /api/v1/policies/{id}
pub async fn delete_policy(
    State(state): State<AppState>,
    RequireOversight(user): RequireOversight,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !PolicyRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found(ENTITY, id));
    }
    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::DELETE_POLICY).entity(ENTITY, id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/policies/{id}/publish
///
/// Drafts and archived policies may be published; the caller is recorded
/// as approver.
pub async fn publish_policy(
    State(state): State<AppState>,
    RequireOversight(user): RequireOversight,
    Path(id): Path<DbId>,
) -> AppResult<Json<ActionResponse<Policy>>> {
    let existing = find_policy(&state, id).await?;
    if !existing.status.can_publish() {
        return Err(AppError::conflict(format!(
            "A {} policy cannot be published",
            existing.status
        )));
    }

    let policy = PolicyRepo::publish(&state.pool, id, existing.status, user.user_id)
        .await?
        .ok_or_else(|| AppError::conflict("Policy status changed concurrently"))?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::PUBLISH_POLICY)
            .entity(ENTITY, id)
            .metadata(serde_json::json!({ "from": existing.status, "version": policy.version })),
    )
    .await;

    Ok(Json(ActionResponse::new(policy, "Policy published")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_policy(state: &AppState, id: DbId) -> AppResult<Policy> {
    PolicyRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found(ENTITY, id))
}

fn readable_by(status: PolicyStatus, oversight: bool) -> bool {
    oversight || status == PolicyStatus::Published
}
