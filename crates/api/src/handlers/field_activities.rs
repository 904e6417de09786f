//! Handlers for the `/eiu-activities` resource: site visits, inspections
//! and other field work logged by EIU partners.
//!
//! The EIU author edits or withdraws an activity until the project's
//! implementing office reviews it. A `requires_revision` verdict hands it
//! back to the author; their next edit resubmits it.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use buildwatch_core::activity::actions;
use buildwatch_core::field_activity::{
    status_after_review, validate_attachments, validate_review, FieldActivityPriority,
    ReviewStatus,
};
use buildwatch_core::notification::{entity_types, NotificationCategory, NotificationType};
use buildwatch_core::roles::ROLE_EIU;
use buildwatch_core::types::DbId;
use buildwatch_core::validation::{clamp_limit, clamp_offset, require_non_empty};
use buildwatch_db::models::field_activity::{
    CreateFieldActivity, CreateFieldActivityRequest, FieldActivity, FieldActivityQuery,
    FieldActivityReview, FieldActivityStats, UpdateFieldActivity,
};
use buildwatch_db::repositories::FieldActivityRepo;
use serde::{Deserialize, Serialize};

use super::access::{can_view, is_owner, load_owned_project, load_project};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireEiu, RequireImplementingOffice};
use crate::response::{ActionResponse, DataResponse};
use crate::services::activity::{self, ActivityEntry};
use crate::services::notifications::{notify_users, NotificationDraft};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

/// Request body for `POST /eiu-activities/{id}/review`.
#[derive(Debug, Deserialize)]
pub struct ReviewActivityRequest {
    pub review_status: ReviewStatus,
    pub review_comments: Option<String>,
}

/// The office's activity list with its review workload.
#[derive(Debug, Serialize)]
pub struct OfficeActivityList {
    pub data: Vec<FieldActivity>,
    pub stats: FieldActivityStats,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/eiu-activities
///
/// Activities on the caller's projects.
pub async fn list_office_activities(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Query(params): Query<FieldActivityQuery>,
) -> AppResult<Json<OfficeActivityList>> {
    let data = FieldActivityRepo::list_for_office(
        &state.pool,
        user.user_id,
        &params,
        clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT),
        clamp_offset(params.offset),
    )
    .await?;
    let stats = FieldActivityRepo::stats_for_office(&state.pool, user.user_id).await?;
    Ok(Json(OfficeActivityList { data, stats }))
}

/// GET /api/v1/eiu-activities/mine
pub async fn list_my_activities(
    State(state): State<AppState>,
    RequireEiu(user): RequireEiu,
    Query(params): Query<FieldActivityQuery>,
) -> AppResult<Json<DataResponse<Vec<FieldActivity>>>> {
    let activities = FieldActivityRepo::list_for_author(
        &state.pool,
        user.user_id,
        &params,
        clamp_limit(params.limit, DEFAULT_LIMIT, MAX_LIMIT),
        clamp_offset(params.offset),
    )
    .await?;
    Ok(Json(DataResponse { data: activities }))
}

/// GET /api/v1/eiu-activities/{id}
///
/// EIU users read only their own activities; everyone else follows project
/// visibility.
pub async fn get_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<FieldActivity>>> {
    let found = find_activity(&state, id).await?;
    let allowed = if user.has_role(ROLE_EIU) {
        found.eiu_user_id == user.user_id
    } else {
        can_view(&user, &load_project(&state, found.project_id).await?)
    };
    if !allowed {
        return Err(AppError::forbidden("You do not have access to this activity"));
    }
    Ok(Json(DataResponse { data: found }))
}

// ---------------------------------------------------------------------------
// Author actions
// ---------------------------------------------------------------------------

/// POST /api/v1/eiu-activities
///
/// Only on projects the caller is the EIU partner of.
pub async fn create_activity(
    State(state): State<AppState>,
    RequireEiu(user): RequireEiu,
    Json(input): Json<CreateFieldActivityRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<FieldActivity>>)> {
    require_non_empty("title", &input.title).map_err(AppError::validation)?;
    require_non_empty("description", &input.description).map_err(AppError::validation)?;
    let attachments = input.attachments.unwrap_or_else(|| serde_json::json!([]));
    validate_attachments(&attachments).map_err(AppError::validation)?;

    let project = load_project(&state, input.project_id).await?;
    if project.eiu_partner_id != Some(user.user_id) {
        return Err(AppError::forbidden("This project is not assigned to you"));
    }

    let create_dto = CreateFieldActivity {
        project_id: project.id,
        eiu_user_id: user.user_id,
        activity_type: input.activity_type,
        title: input.title.trim().to_string(),
        description: input.description,
        priority: input.priority.unwrap_or(FieldActivityPriority::Medium),
        activity_date: input.activity_date,
        location: input.location,
        findings: input.findings,
        recommendations: input.recommendations,
        attachments,
    };
    let logged = FieldActivityRepo::create(&state.pool, &create_dto).await?;

    let draft = NotificationDraft::new(
        NotificationCategory::Project,
        "New field activity",
        format!(
            "{} ({}) was logged for {}.",
            logged.title, logged.activity_type, project.name
        ),
    )
    .entity(entity_types::EIU_ACTIVITY, logged.id)
    .action_url(activity_url(logged.id));
    notify_users(&state.pool, [project.implementing_office_id], &draft).await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::CREATE_EIU_ACTIVITY)
            .entity(entity_types::EIU_ACTIVITY, logged.id)
            .details(format!(
                "Logged {} '{}' for project {}",
                logged.activity_type, logged.title, project.project_code
            )),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: logged })))
}

/// PUT /api/v1/eiu-activities/{id}
pub async fn update_activity(
    State(state): State<AppState>,
    RequireEiu(user): RequireEiu,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateFieldActivity>,
) -> AppResult<Json<DataResponse<FieldActivity>>> {
    let existing = find_activity(&state, id).await?;
    if existing.eiu_user_id != user.user_id {
        return Err(AppError::forbidden("You can only update your own activities"));
    }
    if !existing.review_status.is_editable() {
        return Err(AppError::conflict(format!(
            "An activity that is {} can no longer be edited",
            existing.review_status
        )));
    }
    if let Some(title) = &input.title {
        require_non_empty("title", title).map_err(AppError::validation)?;
    }
    if let Some(description) = &input.description {
        require_non_empty("description", description).map_err(AppError::validation)?;
    }
    if let Some(attachments) = &input.attachments {
        validate_attachments(attachments).map_err(AppError::validation)?;
    }

    let updated = FieldActivityRepo::update_content(&state.pool, id, user.user_id, &input)
        .await?
        .ok_or_else(|| AppError::conflict("Activity was reviewed concurrently"))?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::UPDATE_EIU_ACTIVITY)
            .entity(entity_types::EIU_ACTIVITY, id)
            .metadata(serde_json::json!({ "previous_review_status": existing.review_status })),
    )
    .await;

    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/eiu-activities/{id}
///
/// The author may withdraw an unreviewed activity; the owning office may
/// remove any activity on its project.
pub async fn delete_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let existing = find_activity(&state, id).await?;

    let deleted = if existing.eiu_user_id == user.user_id {
        if existing.review_status != ReviewStatus::PendingReview {
            return Err(AppError::conflict("Reviewed activities cannot be withdrawn"));
        }
        FieldActivityRepo::delete_unreviewed(&state.pool, id, user.user_id).await?
    } else if is_owner(&user, &load_project(&state, existing.project_id).await?) {
        FieldActivityRepo::delete(&state.pool, id).await?
    } else {
        return Err(AppError::forbidden("You cannot delete this activity"));
    };
    if !deleted {
        return Err(AppError::conflict("Activity was reviewed concurrently"));
    }

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::DELETE_EIU_ACTIVITY)
            .entity(entity_types::EIU_ACTIVITY, id)
            .details(format!("Deleted activity '{}'", existing.title)),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

/// POST /api/v1/eiu-activities/{id}/review
pub async fn review_activity(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Path(id): Path<DbId>,
    Json(input): Json<ReviewActivityRequest>,
) -> AppResult<Json<ActionResponse<FieldActivity>>> {
    let existing = find_activity(&state, id).await?;
    load_owned_project(&state, &user, existing.project_id).await?;
    validate_review(input.review_status, input.review_comments.as_deref())
        .map_err(AppError::validation)?;
    if existing.review_status != ReviewStatus::PendingReview {
        return Err(AppError::conflict(format!(
            "Activity is already {}",
            existing.review_status
        )));
    }

    let review = FieldActivityReview {
        reviewer_id: user.user_id,
        review_status: input.review_status,
        status: status_after_review(input.review_status),
        comments: input.review_comments,
    };
    let reviewed = FieldActivityRepo::record_review(&state.pool, id, &review)
        .await?
        .ok_or_else(|| AppError::conflict("Activity changed concurrently"))?;

    let kind = match reviewed.review_status {
        ReviewStatus::Approved => NotificationType::Success,
        _ => NotificationType::Warning,
    };
    let draft = NotificationDraft::new(
        NotificationCategory::Validation,
        "Field activity reviewed",
        format!("'{}' was marked {}.", reviewed.title, reviewed.review_status),
    )
    .kind(kind)
    .entity(entity_types::EIU_ACTIVITY, id)
    .action_url(activity_url(id));
    notify_users(&state.pool, [reviewed.eiu_user_id], &draft).await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::REVIEW_EIU_ACTIVITY)
            .entity(entity_types::EIU_ACTIVITY, id)
            .metadata(serde_json::json!({ "review_status": reviewed.review_status })),
    )
    .await;

    let message = format!("Activity {}", reviewed.review_status);
    Ok(Json(ActionResponse::new(reviewed, message)))
}

async fn find_activity(state: &AppState, id: DbId) -> AppResult<FieldActivity> {
    FieldActivityRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("EIUActivity", id))
}

fn activity_url(id: DbId) -> String {
    format!("/eiu-activities/{id}")
}
