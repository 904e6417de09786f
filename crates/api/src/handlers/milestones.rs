//! Handlers for project milestones (`/projects/{id}/milestones` and
//! `/milestones/{id}`).
//!
//! Reads follow project visibility; writes belong to the project's
//! implementing office. Every write keeps the project's weight total at or
//! below 100.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use buildwatch_core::activity::actions;
use buildwatch_core::milestone::{
    resolve_division_weights, validate_weight_total, weight_report, WeightReport,
};
use buildwatch_core::notification::entity_types;
use buildwatch_core::types::DbId;
use buildwatch_core::validation::require_non_empty;
use buildwatch_db::models::milestone::{
    CreateMilestone, CreateMilestoneRequest, Milestone, UpdateMilestone, UpdateMilestoneRequest,
};
use buildwatch_db::repositories::{MilestoneRepo, ProjectUpdateRepo};

use super::access::{load_owned_project, load_visible_project};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireImplementingOffice;
use crate::response::DataResponse;
use crate::services::activity::{self, ActivityEntry};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{id}/milestones
pub async fn list_milestones(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Milestone>>>> {
    load_visible_project(&state, &user, project_id).await?;
    let milestones = MilestoneRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: milestones }))
}

/// GET /api/v1/projects/{id}/milestones/weights
pub async fn get_weights(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<WeightReport>>> {
    load_visible_project(&state, &user, project_id).await?;
    let milestones = MilestoneRepo::list_by_project(&state.pool, project_id).await?;
    let weights: Vec<f64> = milestones.iter().map(|m| m.weight).collect();
    Ok(Json(DataResponse {
        data: weight_report(&weights),
    }))
}

/// POST /api/v1/projects/{id}/milestones
///
/// Division weights default to an even split of `weight`. Returns 201.
pub async fn create_milestone(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Path(project_id): Path<DbId>,
    Json(input): Json<CreateMilestoneRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Milestone>>)> {
    load_owned_project(&state, &user, project_id).await?;
    require_non_empty("title", &input.title).map_err(AppError::validation)?;

    let divisions = resolve_division_weights(
        input.weight,
        input.timeline_weight,
        input.budget_weight,
        input.physical_weight,
    )
    .map_err(AppError::validation)?;

    let others = MilestoneRepo::total_weight(&state.pool, project_id, None).await?;
    validate_weight_total(others, input.weight).map_err(AppError::validation)?;

    let sort_order = match input.sort_order {
        Some(order) => order,
        None => MilestoneRepo::list_by_project(&state.pool, project_id).await?.len() as i32 + 1,
    };

    let create_dto = CreateMilestone {
        project_id,
        title: input.title.trim().to_string(),
        description: input.description,
        weight: input.weight,
        planned_budget: input.planned_budget,
        due_date: input.due_date,
        sort_order,
        timeline_weight: divisions.timeline,
        budget_weight: divisions.budget,
        physical_weight: divisions.physical,
    };
    let milestone = MilestoneRepo::create(&state.pool, &create_dto).await?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::CREATE_MILESTONE)
            .entity(entity_types::MILESTONE, milestone.id)
            .metadata(serde_json::json!({
                "project_id": project_id,
                "weight": milestone.weight,
            })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: milestone })))
}

/// PUT /api/v1/milestones/{id}
pub async fn update_milestone(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMilestoneRequest>,
) -> AppResult<Json<DataResponse<Milestone>>> {
    let existing = find_milestone(&state, id).await?;
    load_owned_project(&state, &user, existing.project_id).await?;

    if let Some(title) = &input.title {
        require_non_empty("title", title).map_err(AppError::validation)?;
    }
    let update_dto = plan_update(existing.weight, input).map_err(AppError::validation)?;

    if let Some(weight) = update_dto.weight {
        let others = MilestoneRepo::total_weight(&state.pool, existing.project_id, Some(id)).await?;
        validate_weight_total(others, weight).map_err(AppError::validation)?;
    }

    let milestone = MilestoneRepo::update(&state.pool, id, &update_dto)
        .await?
        .ok_or(AppError::not_found("Milestone", id))?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::UPDATE_MILESTONE)
            .entity(entity_types::MILESTONE, id)
            .metadata(serde_json::json!({ "project_id": milestone.project_id })),
    )
    .await;

    Ok(Json(DataResponse { data: milestone }))
}

/// DELETE /api/v1/milestones/{id}
///
/// Refused while the milestone has updates awaiting review.
pub async fn delete_milestone(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let existing = find_milestone(&state, id).await?;
    load_owned_project(&state, &user, existing.project_id).await?;

    if !ProjectUpdateRepo::pending_for_milestone(&state.pool, id)
        .await?
        .is_empty()
    {
        return Err(AppError::conflict(
            "Milestone has updates awaiting review and cannot be deleted",
        ));
    }

    if !MilestoneRepo::delete(&state.pool, id).await? {
        return Err(AppError::not_found("Milestone", id));
    }

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::DELETE_MILESTONE)
            .entity(entity_types::MILESTONE, id)
            .details(format!("Deleted milestone '{}'", existing.title)),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_milestone(state: &AppState, id: DbId) -> AppResult<Milestone> {
    MilestoneRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Milestone", id))
}

/// Turn an update request into the repository DTO.
///
/// Touching the weight or any division weight re-resolves all three
/// division weights against the effective milestone weight.
fn plan_update(current_weight: f64, input: UpdateMilestoneRequest) -> Result<UpdateMilestone, String> {
    let touches_weights = input.weight.is_some()
        || input.timeline_weight.is_some()
        || input.budget_weight.is_some()
        || input.physical_weight.is_some();

    let (weight, divisions) = if touches_weights {
        let weight = input.weight.unwrap_or(current_weight);
        let divisions = resolve_division_weights(
            weight,
            input.timeline_weight,
            input.budget_weight,
            input.physical_weight,
        )?;
        (Some(weight), Some(divisions))
    } else {
        (None, None)
    };

    Ok(UpdateMilestone {
        title: input.title.map(|t| t.trim().to_string()),
        description: input.description,
        weight,
        planned_budget: input.planned_budget,
        due_date: input.due_date,
        sort_order: input.sort_order,
        status: input.status,
        timeline_weight: divisions.map(|d| d.timeline),
        budget_weight: divisions.map(|d| d.budget),
        physical_weight: divisions.map(|d| d.physical),
    })
}
