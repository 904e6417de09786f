//! Handlers for the `/projects` resource: CRUD, the Secretariat/MPMEC
//! workflow, progress, activity, export and delay checks.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use buildwatch_core::activity::actions;
use buildwatch_core::dashboard::{review_queue, DashboardScope};
use buildwatch_core::milestone::{weight_report, weights_complete, WeightReport};
use buildwatch_core::notification::{entity_types, NotificationCategory, NotificationType};
use buildwatch_core::progress::DivisionVerdict;
use buildwatch_core::project::{validate_budget, validate_dates, validate_project_code};
use buildwatch_core::roles::{ROLE_EIU, ROLE_LGU_IU};
use buildwatch_core::types::DbId;
use buildwatch_core::validation::{clamp_limit, clamp_offset, require_non_empty};
use buildwatch_core::workflow::UpdateStatus;
use buildwatch_db::models::activity_log::{ActivityLog, ActivityLogQuery};
use buildwatch_db::models::milestone::Milestone;
use buildwatch_db::models::project::{
    CreateProject, DashboardStats, Project, ProjectQuery, UpdateProject,
};
use buildwatch_db::models::project_update::UpdateQuery;
use buildwatch_db::repositories::{
    ActivityLogRepo, MilestoneRepo, ProjectRepo, ProjectUpdateRepo, UserRepo,
};
use serde::{Deserialize, Serialize};

use super::access::{is_owner, load_owned_project, load_project, load_visible_project};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{
    RequireImplementingOffice, RequireMpmec, RequireOversight, RequireSecretariat,
};
use crate::query::PaginationParams;
use crate::response::{ActionResponse, DataResponse};
use crate::services::activity::{self, ActivityEntry};
use crate::services::delay::{self, DelayRunSummary, ProjectDelayReport};
use crate::services::export::{build_project_workbook, export_file_name, XLSX_CONTENT_TYPE};
use crate::services::notifications::{notify_secretariat, notify_users, NotificationDraft};
use crate::services::progress::{self, ProgressReport};
use crate::services::review::{self, Approval};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A project with its milestones and weight summary.
#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub milestones: Vec<Milestone>,
    pub weights: WeightReport,
}

/// Optional Secretariat remarks on approve/reject.
#[derive(Debug, Default, Deserialize)]
pub struct CommentsRequest {
    pub comments: Option<String>,
}

/// Request body for `POST /projects/{id}/validate-compiled`.
#[derive(Debug, Deserialize)]
pub struct ValidateCompiledRequest {
    pub validated: bool,
    pub comments: Option<String>,
    /// Applied to the compiled report when it is validated.
    #[serde(default)]
    pub division_verdicts: Vec<DivisionVerdict>,
}

// ---------------------------------------------------------------------------
// CRUD
// ---------------------------------------------------------------------------

/// GET /api/v1/projects
///
/// Implementing offices see their own projects and EIU users the ones they
/// are assigned to.
pub async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
    Query(mut params): Query<ProjectQuery>,
) -> AppResult<Json<DataResponse<Vec<Project>>>> {
    match user.role.as_str() {
        ROLE_LGU_IU => params.implementing_office_id = Some(user.user_id),
        ROLE_EIU => params.eiu_partner_id = Some(user.user_id),
        _ => {}
    }
    let limit = clamp_limit(params.limit, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE);
    let offset = clamp_offset(params.offset);
    let projects = ProjectRepo::list(&state.pool, &params, limit, offset).await?;
    Ok(Json(DataResponse { data: projects }))
}

/// POST /api/v1/projects
///
/// The caller becomes the implementing office. Returns 201 Created.
pub async fn create_project(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<DataResponse<Project>>)> {
    validate_project_code(&input.project_code).map_err(AppError::validation)?;
    require_non_empty("name", &input.name).map_err(AppError::validation)?;
    require_non_empty("location", &input.location).map_err(AppError::validation)?;
    validate_budget(input.total_budget).map_err(AppError::validation)?;
    validate_dates(input.start_date, input.end_date).map_err(AppError::validation)?;
    if let Some(partner_id) = input.eiu_partner_id {
        ensure_eiu_partner(&state, partner_id).await?;
    }

    let project = ProjectRepo::create(&state.pool, user.user_id, &input).await?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::CREATE_PROJECT)
            .entity(entity_types::PROJECT, project.id)
            .details(format!("Created project {}", project.project_code)),
    )
    .await;
    tracing::info!(project_id = project.id, code = %project.project_code, "Project created");

    if let Some(partner_id) = project.eiu_partner_id {
        let draft = NotificationDraft::new(
            NotificationCategory::Project,
            "Assigned to a project",
            format!(
                "You have been assigned as EIU partner for {} ({}).",
                project.name, project.project_code
            ),
        )
        .entity(entity_types::PROJECT, project.id)
        .action_url(project_url(project.id));
        notify_users(&state.pool, [partner_id], &draft).await;
    }

    Ok((StatusCode::CREATED, Json(DataResponse { data: project })))
}

/// GET /api/v1/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectDetail>>> {
    let project = load_visible_project(&state, &user, id).await?;
    let milestones = MilestoneRepo::list_by_project(&state.pool, id).await?;
    let weights: Vec<f64> = milestones.iter().map(|m| m.weight).collect();
    Ok(Json(DataResponse {
        data: ProjectDetail {
            project,
            weights: weight_report(&weights),
            milestones,
        },
    }))
}

/// PUT /api/v1/projects/{id}
pub async fn update_project(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateProject>,
) -> AppResult<Json<DataResponse<Project>>> {
    let existing = load_owned_project(&state, &user, id).await?;

    if let Some(name) = &input.name {
        require_non_empty("name", name).map_err(AppError::validation)?;
    }
    if let Some(budget) = input.total_budget {
        validate_budget(budget).map_err(AppError::validation)?;
    }
    validate_dates(
        input.start_date.unwrap_or(existing.start_date),
        input.end_date.unwrap_or(existing.end_date),
    )
    .map_err(AppError::validation)?;
    if let Some(partner_id) = input.eiu_partner_id {
        ensure_eiu_partner(&state, partner_id).await?;
    }

    let project = ProjectRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("Project", id))?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::UPDATE_PROJECT).entity(entity_types::PROJECT, id),
    )
    .await;

    Ok(Json(DataResponse { data: project }))
}

/// DELETE /api/v1/projects/{id}
///
/// Soft-delete. Returns 204 No Content.
pub async fn delete_project(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let project = load_owned_project(&state, &user, id).await?;
    if !ProjectRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("Project", id));
    }
    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::DELETE_PROJECT)
            .entity(entity_types::PROJECT, id)
            .details(format!("Deleted project {}", project.project_code)),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// POST /api/v1/projects/{id}/submit-to-secretariat
///
/// Draft -> submitted. Milestone weights must total 100.
pub async fn submit_to_secretariat(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Path(id): Path<DbId>,
) -> AppResult<Json<ActionResponse<Project>>> {
    let project = load_owned_project(&state, &user, id).await?;
    let next = project.workflow_status.submit_to_secretariat()?;

    let total = MilestoneRepo::total_weight(&state.pool, id, None).await?;
    if !weights_complete(total) {
        return Err(AppError::validation(format!(
            "Milestone weights must total 100% before submission (currently {total:.2}%)"
        )));
    }

    let project = ProjectRepo::submit_to_secretariat(&state.pool, id, project.workflow_status, next)
        .await?
        .ok_or_else(|| AppError::conflict("Project workflow changed concurrently"))?;

    let draft = NotificationDraft::new(
        NotificationCategory::Project,
        "Project submitted for review",
        format!(
            "{} ({}) was submitted to the Secretariat for approval.",
            project.name, project.project_code
        ),
    )
    .entity(entity_types::PROJECT, id)
    .action_url(project_url(id));
    notify_secretariat(&state.pool, &draft).await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::SUBMIT_PROJECT_TO_SECRETARIAT)
            .entity(entity_types::PROJECT, id),
    )
    .await;

    Ok(Json(ActionResponse::new(
        project,
        "Project submitted to the Secretariat",
    )))
}

/// POST /api/v1/projects/{id}/secretariat-approve
pub async fn secretariat_approve(
    State(state): State<AppState>,
    RequireSecretariat(user): RequireSecretariat,
    Path(id): Path<DbId>,
    input: Option<Json<CommentsRequest>>,
) -> AppResult<Json<ActionResponse<Project>>> {
    let comments = input.and_then(|Json(body)| body.comments);
    let project = load_project(&state, id).await?;
    let next = project.workflow_status.secretariat_approve()?;

    let project = ProjectRepo::secretariat_approve(
        &state.pool,
        id,
        project.workflow_status,
        next,
        user.user_id,
        comments.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::conflict("Project workflow changed concurrently"))?;

    notify_project_team(
        &state,
        &project,
        NotificationDraft::new(
            NotificationCategory::Validation,
            "Project approved by the Secretariat",
            format!("{} ({}) is approved and now ongoing.", project.name, project.project_code),
        )
        .kind(NotificationType::Success),
    )
    .await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::SECRETARIAT_APPROVE_PROJECT).entity(entity_types::PROJECT, id),
    )
    .await;

    Ok(Json(ActionResponse::new(project, "Project approved")))
}

/// POST /api/v1/projects/{id}/secretariat-reject
///
/// Returns the project to draft with the Secretariat's comments.
pub async fn secretariat_reject(
    State(state): State<AppState>,
    RequireSecretariat(user): RequireSecretariat,
    Path(id): Path<DbId>,
    input: Option<Json<CommentsRequest>>,
) -> AppResult<Json<ActionResponse<Project>>> {
    let comments = input.and_then(|Json(body)| body.comments);
    let project = load_project(&state, id).await?;
    let next = project.workflow_status.secretariat_reject()?;

    let project = ProjectRepo::transition(
        &state.pool,
        id,
        project.workflow_status,
        next,
        comments.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::conflict("Project workflow changed concurrently"))?;

    notify_project_team(
        &state,
        &project,
        NotificationDraft::new(
            NotificationCategory::Validation,
            "Project returned by the Secretariat",
            format!(
                "{} ({}) was returned to draft. {}",
                project.name,
                project.project_code,
                comments.as_deref().unwrap_or_default()
            ),
        )
        .kind(NotificationType::Warning),
    )
    .await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::SECRETARIAT_REJECT_PROJECT)
            .entity(entity_types::PROJECT, id)
            .metadata(serde_json::json!({ "comments": comments })),
    )
    .await;

    Ok(Json(ActionResponse::new(project, "Project returned to draft")))
}

/// POST /api/v1/projects/{id}/compile-and-submit
///
/// Send the latest IU-approved milestone report to the Secretariat.
pub async fn compile_and_submit(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Path(id): Path<DbId>,
) -> AppResult<Json<ActionResponse<Project>>> {
    let project = load_owned_project(&state, &user, id).await?;
    let next = project.workflow_status.compile_for_secretariat()?;

    let report =
        ProjectUpdateRepo::latest_milestone_update(&state.pool, id, &[UpdateStatus::IuApproved])
            .await?
            .ok_or_else(|| {
                AppError::validation("No IU-approved milestone update to compile")
            })?;
    let has_entries = report
        .milestone_updates
        .as_ref()
        .and_then(|v| v.as_array())
        .is_some_and(|entries| !entries.is_empty());
    if !has_entries {
        return Err(AppError::validation(
            "The latest IU-approved milestone update has no milestone entries",
        ));
    }

    let project = ProjectRepo::transition(&state.pool, id, project.workflow_status, next, None)
        .await?
        .ok_or_else(|| AppError::conflict("Project workflow changed concurrently"))?;

    let draft = NotificationDraft::new(
        NotificationCategory::Validation,
        "Compiled report awaiting validation",
        format!(
            "{} ({}) submitted a compiled milestone report.",
            project.name, project.project_code
        ),
    )
    .entity(entity_types::PROJECT, id)
    .action_url(project_url(id))
    .metadata(serde_json::json!({ "update_id": report.id }));
    notify_secretariat(&state.pool, &draft).await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::COMPILE_AND_SUBMIT_TO_SECRETARIAT)
            .entity(entity_types::PROJECT, id)
            .metadata(serde_json::json!({ "update_id": report.id })),
    )
    .await;

    Ok(Json(ActionResponse::new(
        project,
        "Compiled report submitted to the Secretariat",
    )))
}

/// POST /api/v1/projects/{id}/validate-compiled
///
/// Validating approves the compiled IU-approved report as the Secretariat
/// gate would, with any division verdicts, and recomputes progress; the
/// workflow move and the approval commit together. Returning sends the
/// project back to `ongoing`.
pub async fn validate_compiled(
    State(state): State<AppState>,
    RequireSecretariat(user): RequireSecretariat,
    Path(id): Path<DbId>,
    Json(input): Json<ValidateCompiledRequest>,
) -> AppResult<Json<ActionResponse<Project>>> {
    let project = load_project(&state, id).await?;
    let next = project.workflow_status.validate_compiled(input.validated)?;

    let mut tx = state.pool.begin().await?;
    let moved = ProjectRepo::transition(
        &mut *tx,
        id,
        project.workflow_status,
        next,
        input.comments.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::conflict("Project workflow changed concurrently"))?;

    let mut approved_update = None;
    if input.validated {
        let compiled = ProjectUpdateRepo::latest_milestone_update(
            &mut *tx,
            id,
            &[UpdateStatus::IuApproved],
        )
        .await?;
        match compiled {
            Some(report) => {
                let approval = Approval {
                    reviewer_id: user.user_id,
                    final_progress: None,
                    remarks: input.comments.clone(),
                    verdicts: &input.division_verdicts,
                };
                let approved = review::approve_in(&mut *tx, &moved, &report, approval)
                    .await?
                    .ok_or_else(|| {
                        AppError::conflict("Compiled report was reviewed concurrently")
                    })?;
                approved_update = Some(approved.id);
            }
            None => {
                progress::refresh_cache(&mut *tx, &moved).await?;
            }
        }
    }
    tx.commit().await?;

    let project = if input.validated {
        load_project(&state, id).await?
    } else {
        moved
    };

    let (title, kind) = if input.validated {
        ("Compiled report validated", NotificationType::Success)
    } else {
        ("Compiled report returned", NotificationType::Warning)
    };
    notify_project_team(
        &state,
        &project,
        NotificationDraft::new(
            NotificationCategory::Validation,
            title,
            format!(
                "{} ({}): {}",
                project.name,
                project.project_code,
                input.comments.as_deref().unwrap_or(title)
            ),
        )
        .kind(kind),
    )
    .await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::VALIDATE_COMPILED_REPORT)
            .entity(entity_types::PROJECT, id)
            .metadata(serde_json::json!({
                "validated": input.validated,
                "update_id": approved_update,
            })),
    )
    .await;

    Ok(Json(ActionResponse::new(project, title)))
}

/// POST /api/v1/projects/{id}/mpmec-approve
///
/// One-time sign-off after Secretariat approval.
pub async fn mpmec_approve(
    State(state): State<AppState>,
    RequireMpmec(user): RequireMpmec,
    Path(id): Path<DbId>,
) -> AppResult<Json<ActionResponse<Project>>> {
    let existing = load_project(&state, id).await?;
    let Some(project) = ProjectRepo::mpmec_approve(&state.pool, id, user.user_id).await? else {
        let reason = if existing.approved_by_mpmec {
            "Project is already approved by the MPMEC"
        } else {
            "Project must be approved by the Secretariat first"
        };
        return Err(AppError::conflict(reason));
    };

    notify_project_team(
        &state,
        &project,
        NotificationDraft::new(
            NotificationCategory::Validation,
            "Project approved by the MPMEC",
            format!("{} ({}) received MPMEC approval.", project.name, project.project_code),
        )
        .kind(NotificationType::Success),
    )
    .await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::MPMEC_APPROVE_PROJECT).entity(entity_types::PROJECT, id),
    )
    .await;

    Ok(Json(ActionResponse::new(project, "Project approved by the MPMEC")))
}

// ---------------------------------------------------------------------------
// Progress, activity, export
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{id}/progress
///
/// Always recomputed from milestones and the latest approved payload.
pub async fn get_progress(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProgressReport>>> {
    let project = load_visible_project(&state, &user, id).await?;
    let report = progress::report(&state.pool, &project).await?;
    Ok(Json(DataResponse { data: report }))
}

/// GET /api/v1/projects/{id}/activity
pub async fn get_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<ActivityLog>>>> {
    load_visible_project(&state, &user, id).await?;
    let params = ActivityLogQuery {
        entity_type: Some(entity_types::PROJECT.to_string()),
        entity_id: Some(id),
        limit: page.limit,
        offset: page.offset,
        ..Default::default()
    };
    let entries = ActivityLogRepo::query(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/projects/dashboard/stats
///
/// Counters over the caller's projects: an office's own, an EIU partner's
/// assigned, the Secretariat-approved portfolio for MPMEC, everything for
/// the rest.
pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<DashboardStats>>> {
    let sub_role = user.sub_role.as_deref();
    let scope = DashboardScope::for_user(user.user_id, &user.role, sub_role);
    let stats =
        ProjectRepo::dashboard_stats(&state.pool, scope, review_queue(&user.role, sub_role))
            .await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/projects/{id}/export
///
/// `.xlsx` attachment with Summary, Milestones and Updates sheets.
pub async fn export_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let project = load_visible_project(&state, &user, id).await?;
    let mut conn = state.pool.acquire().await?;
    let (computation, milestones, _) = progress::compute_for_project(&mut conn, &project).await?;
    drop(conn);
    let updates =
        ProjectUpdateRepo::list_by_project(&state.pool, id, &UpdateQuery::default()).await?;

    let bytes = build_project_workbook(&project, &computation, &milestones, &updates)
        .map_err(|e| AppError::InternalError(format!("Workbook generation error: {e}")))?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::EXPORT_PROJECT).entity(entity_types::PROJECT, id),
    )
    .await;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, XLSX_CONTENT_TYPE)
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export_file_name(&project)),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

// ---------------------------------------------------------------------------
// Delay checks
// ---------------------------------------------------------------------------

/// POST /api/v1/projects/{id}/delay-check
///
/// Owner or oversight roles.
pub async fn check_project_delay(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ProjectDelayReport>>> {
    let project = load_project(&state, id).await?;
    if !is_owner(&user, &project) && !user.is_oversight() {
        return Err(AppError::forbidden(
            "Only the implementing office or oversight roles can run delay checks",
        ));
    }

    let report = delay::check_project(&state.pool, &project, today()).await?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::DELAY_CHECK)
            .entity(entity_types::PROJECT, id)
            .metadata(serde_json::json!({
                "is_delayed": report.assessment.is_delayed,
                "status": report.status,
            })),
    )
    .await;

    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/projects/delay-check
///
/// Portfolio-wide run over ongoing and delayed projects.
pub async fn check_all_delays(
    State(state): State<AppState>,
    RequireOversight(user): RequireOversight,
) -> AppResult<Json<DataResponse<DelayRunSummary>>> {
    let summary = delay::check_all(&state.pool, today()).await?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::DELAY_CHECK).metadata(serde_json::json!({
            "checked": summary.checked,
            "delayed": summary.delayed,
        })),
    )
    .await;

    Ok(Json(DataResponse { data: summary }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn project_url(id: DbId) -> String {
    format!("/projects/{id}")
}

fn today() -> buildwatch_core::types::Date {
    chrono::Utc::now().date_naive()
}

/// An EIU partner must be an active EIU user.
async fn ensure_eiu_partner(state: &AppState, partner_id: DbId) -> AppResult<()> {
    let partner = UserRepo::find_by_id(&state.pool, partner_id)
        .await?
        .ok_or_else(|| AppError::validation(format!("EIU partner {partner_id} does not exist")))?;
    if partner.role != ROLE_EIU || !partner.status.can_login() {
        return Err(AppError::validation(format!(
            "User {partner_id} is not an active EIU user"
        )));
    }
    Ok(())
}

/// Notify the implementing office and the EIU partner about `project`.
async fn notify_project_team(state: &AppState, project: &Project, draft: NotificationDraft) {
    let draft = draft
        .entity(entity_types::PROJECT, project.id)
        .action_url(project_url(project.id));
    let recipients = std::iter::once(project.implementing_office_id).chain(project.eiu_partner_id);
    notify_users(&state.pool, recipients, &draft).await;
}
