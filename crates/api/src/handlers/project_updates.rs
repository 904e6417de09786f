//! Handlers for the `/project-updates` resource: evidence-backed progress
//! submissions and their two review gates.
//!
//! ```text
//! EIU / IU submits ──> submitted ──IU review──> iu_approved ──Secretariat──> secretariat_approved
//! ```
//!
//! Each gate is a conditional `UPDATE ... WHERE status = <expected>`; the
//! loser of a concurrent review gets 409. Approval effects commit with the
//! Secretariat gate; notifications go out after it.

use std::str::FromStr;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use buildwatch_core::activity::actions;
use buildwatch_core::notification::{entity_types, NotificationCategory, NotificationType};
use buildwatch_core::progress::{clear_division_statuses, parse_milestone_updates, DivisionVerdict};
use buildwatch_core::roles::{ROLE_EIU, ROLE_LGU_IU};
use buildwatch_core::types::DbId;
use buildwatch_core::upload::{MAX_FILES_PER_UPDATE, UPDATE_EXTENSIONS};
use buildwatch_core::validation::require_non_empty;
use buildwatch_core::workflow::{validate_progress_value, ReviewAction, ReviewStage, UpdateType};
use buildwatch_db::models::milestone::Milestone;
use buildwatch_db::models::project::Project;
use buildwatch_db::models::project_update::{
    CreateProjectUpdate, CreateProjectUpdateFile, IuReview, ProjectUpdate, ProjectUpdateFile,
    SecretariatReview, UpdateQuery,
};
use buildwatch_db::repositories::{MilestoneRepo, ProjectUpdateRepo, UpdateFileRepo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::access::{is_owner, load_project, load_visible_project};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::{RequireImplementingOffice, RequireSecretariat};
use crate::response::{ActionResponse, DataResponse};
use crate::services::activity::{self, ActivityEntry};
use crate::services::notifications::{notify_secretariat, notify_users, NotificationDraft};
use crate::services::review::{self, Approval};
use crate::services::uploads::{
    read_multipart, remove_quietly, store, validate_upload, MultipartForm, StoredFile,
    PROJECT_UPDATES_DIR,
};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// An update with its evidence files.
#[derive(Debug, Serialize)]
pub struct UpdateDetail {
    #[serde(flatten)]
    pub update: ProjectUpdate,
    pub files: Vec<ProjectUpdateFile>,
}

/// Request body for `PUT /project-updates/{id}/iu-review`.
#[derive(Debug, Deserialize)]
pub struct IuReviewRequest {
    pub action: ReviewAction,
    pub adjusted_progress: Option<f64>,
    pub remarks: Option<String>,
}

/// Request body for `PUT /project-updates/{id}/secretariat-review`.
#[derive(Debug, Deserialize)]
pub struct SecretariatReviewRequest {
    pub action: ReviewAction,
    pub final_progress: Option<f64>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub division_verdicts: Vec<DivisionVerdict>,
}

/// Response of `GET /project-updates/milestone/{id}/pending-status`.
#[derive(Debug, Serialize)]
pub struct PendingStatus {
    pub has_pending_updates: bool,
    pub pending_updates: Vec<ProjectUpdate>,
    pub latest_approved_update: Option<ProjectUpdate>,
}

/// Validated scalar fields of a submission form.
#[derive(Debug)]
struct Submission {
    project_id: DbId,
    milestone_id: Option<DbId>,
    update_type: UpdateType,
    title: String,
    description: String,
    claimed_progress: f64,
    budget_used: Option<f64>,
    remarks: Option<String>,
    milestone_updates: Option<Value>,
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// POST /api/v1/project-updates
///
/// Multipart form from the project's EIU partner or implementing office.
/// Rejected with 409 while the milestone has an update awaiting review.
pub async fn submit_update(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<UpdateDetail>>)> {
    if !user.has_role(ROLE_EIU) && !user.has_role(ROLE_LGU_IU) {
        return Err(AppError::forbidden(
            "Only EIU or Implementing Office users can submit updates",
        ));
    }

    let form = read_multipart(multipart).await?;
    let submission = parse_submission(&form)?;

    let project = load_project(&state, submission.project_id).await?;
    ensure_can_submit(&user, &project)?;

    let milestones = MilestoneRepo::list_by_project(&state.pool, project.id).await?;
    if let Some(milestone_id) = submission.milestone_id {
        if !milestones.iter().any(|m| m.id == milestone_id) {
            return Err(AppError::validation(format!(
                "Milestone {milestone_id} does not belong to this project"
            )));
        }
        let pending = ProjectUpdateRepo::pending_for_milestone(&state.pool, milestone_id).await?;
        if !pending.is_empty() {
            return Err(AppError::conflict(
                "This milestone already has an update awaiting review",
            ));
        }
    }
    if let Some(raw) = &submission.milestone_updates {
        ensure_entries_belong(raw, &milestones)?;
    }

    if form.files.len() > MAX_FILES_PER_UPDATE {
        return Err(AppError::validation(format!(
            "At most {MAX_FILES_PER_UPDATE} files can be attached"
        )));
    }
    let max_bytes = state.config.max_upload_bytes;
    for file in &form.files {
        validate_upload(file, UPDATE_EXTENSIONS, max_bytes)?;
    }

    let mut stored: Vec<StoredFile> = Vec::with_capacity(form.files.len());
    for file in &form.files {
        match store(&state.config.upload_dir, PROJECT_UPDATES_DIR, file, UPDATE_EXTENSIONS, max_bytes)
            .await
        {
            Ok(s) => stored.push(s),
            Err(e) => {
                remove_quietly(&state.config.upload_dir, &stored).await;
                return Err(e);
            }
        }
    }

    let detail = match persist_submission(&state, &user, &project, submission, &stored).await {
        Ok(detail) => detail,
        Err(e) => {
            remove_quietly(&state.config.upload_dir, &stored).await;
            return Err(e);
        }
    };
    let update = &detail.update;

    let draft = NotificationDraft::new(
        NotificationCategory::Update,
        "New progress update submitted",
        format!(
            "'{}' was submitted for {} ({}) and awaits your review.",
            update.title, project.name, project.project_code
        ),
    )
    .entity(entity_types::PROJECT_UPDATE, update.id)
    .action_url(update_url(update.id));
    notify_users(&state.pool, [project.implementing_office_id], &draft).await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::SUBMIT_PROJECT_UPDATE)
            .entity(entity_types::PROJECT_UPDATE, update.id)
            .metadata(serde_json::json!({
                "project_id": project.id,
                "milestone_id": update.milestone_id,
                "update_type": update.update_type,
                "claimed_progress": update.claimed_progress,
                "files": detail.files.len(),
            })),
    )
    .await;
    tracing::info!(
        update_id = update.id,
        project_id = project.id,
        submitted_by = user.user_id,
        "Progress update submitted"
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: detail })))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/project-updates/project/{project_id}?status=&update_type=
pub async fn list_project_updates(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
    Query(params): Query<UpdateQuery>,
) -> AppResult<Json<DataResponse<Vec<ProjectUpdate>>>> {
    load_visible_project(&state, &user, project_id).await?;
    let updates = ProjectUpdateRepo::list_by_project(&state.pool, project_id, &params).await?;
    Ok(Json(DataResponse { data: updates }))
}

/// GET /api/v1/project-updates/{id}
pub async fn get_update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UpdateDetail>>> {
    let update = find_update(&state, id).await?;
    load_visible_project(&state, &user, update.project_id).await?;
    let files = UpdateFileRepo::list_by_update(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: UpdateDetail { update, files },
    }))
}

/// GET /api/v1/project-updates/milestone/{milestone_id}/pending-status
pub async fn pending_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(milestone_id): Path<DbId>,
) -> AppResult<Json<DataResponse<PendingStatus>>> {
    let milestone = MilestoneRepo::find_by_id(&state.pool, milestone_id)
        .await?
        .ok_or(AppError::not_found("Milestone", milestone_id))?;
    load_visible_project(&state, &user, milestone.project_id).await?;

    let pending_updates = ProjectUpdateRepo::pending_for_milestone(&state.pool, milestone_id).await?;
    let latest_approved_update =
        ProjectUpdateRepo::latest_approved_for_milestone(&state.pool, milestone_id).await?;

    Ok(Json(DataResponse {
        data: PendingStatus {
            has_pending_updates: !pending_updates.is_empty(),
            pending_updates,
            latest_approved_update,
        },
    }))
}

// ---------------------------------------------------------------------------
// Review gates
// ---------------------------------------------------------------------------

/// PUT /api/v1/project-updates/{id}/iu-review
///
/// First gate, for the project's implementing office. Approval records
/// `adjusted_progress` (defaulting to the claim) and hands the update to the
/// Secretariat.
pub async fn iu_review(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Path(id): Path<DbId>,
    Json(input): Json<IuReviewRequest>,
) -> AppResult<Json<ActionResponse<ProjectUpdate>>> {
    let update = find_update(&state, id).await?;
    let project = load_project(&state, update.project_id).await?;
    if !is_owner(&user, &project) {
        return Err(AppError::forbidden(
            "Only the project's implementing office can review this update",
        ));
    }

    let next = update.status.review(ReviewStage::ImplementingOffice, input.action)?;
    if let Some(adjusted) = input.adjusted_progress {
        validate_progress_value("adjusted_progress", adjusted).map_err(AppError::validation)?;
    }
    let adjusted_progress = match input.action {
        ReviewAction::Approve => Some(input.adjusted_progress.unwrap_or(update.claimed_progress)),
        ReviewAction::Reject => None,
    };

    let review = IuReview {
        reviewer_id: user.user_id,
        status: next,
        adjusted_progress,
        remarks: input.remarks.clone(),
    };
    let reviewed = ProjectUpdateRepo::record_iu_review(&state.pool, id, &review)
        .await?
        .ok_or_else(|| AppError::conflict("Update was reviewed concurrently"))?;

    match input.action {
        ReviewAction::Approve => {
            let draft = NotificationDraft::new(
                NotificationCategory::Validation,
                "Update awaiting Secretariat review",
                format!(
                    "'{}' for {} ({}) was approved by the implementing office.",
                    reviewed.title, project.name, project.project_code
                ),
            )
            .entity(entity_types::PROJECT_UPDATE, id)
            .action_url(update_url(id));
            notify_secretariat(&state.pool, &draft).await;
        }
        ReviewAction::Reject => {
            let draft = rejection_draft(&reviewed, &project, "the implementing office", &input.remarks);
            notify_users(&state.pool, [reviewed.submitted_by], &draft).await;
        }
    }

    record_review(&state, &user, &reviewed, input.action, "iu").await;

    Ok(Json(ActionResponse::new(
        reviewed,
        review_message(input.action, "implementing office"),
    )))
}

/// PUT /api/v1/project-updates/{id}/secretariat-review
///
/// Final gate. Approval merges division verdicts into the payload and the
/// milestone rows, promotes the milestone, and refreshes cached project
/// progress, all in one transaction. Without verdicts no division counts.
pub async fn secretariat_review(
    State(state): State<AppState>,
    RequireSecretariat(user): RequireSecretariat,
    Path(id): Path<DbId>,
    Json(input): Json<SecretariatReviewRequest>,
) -> AppResult<Json<ActionResponse<ProjectUpdate>>> {
    let update = find_update(&state, id).await?;
    let project = load_project(&state, update.project_id).await?;

    let next = update.status.review(ReviewStage::Secretariat, input.action)?;
    if let Some(value) = input.final_progress {
        validate_progress_value("final_progress", value).map_err(AppError::validation)?;
    }

    let reviewed = match input.action {
        ReviewAction::Approve => {
            let approval = Approval {
                reviewer_id: user.user_id,
                final_progress: input.final_progress,
                remarks: input.remarks.clone(),
                verdicts: &input.division_verdicts,
            };
            review::approve_update(&state.pool, &project, &update, approval).await?
        }
        ReviewAction::Reject => {
            let review = SecretariatReview {
                reviewer_id: user.user_id,
                status: next,
                final_progress: None,
                remarks: input.remarks.clone(),
                milestone_updates: None,
            };
            ProjectUpdateRepo::record_secretariat_review(&state.pool, id, &review).await?
        }
    }
    .ok_or_else(|| AppError::conflict("Update was reviewed concurrently"))?;

    let recipients = [reviewed.submitted_by, project.implementing_office_id];
    match input.action {
        ReviewAction::Approve => {
            let draft = NotificationDraft::new(
                NotificationCategory::Validation,
                "Update approved by the Secretariat",
                format!(
                    "'{}' for {} ({}) was approved at {:.2}%.",
                    reviewed.title,
                    project.name,
                    project.project_code,
                    reviewed.final_progress.unwrap_or_default()
                ),
            )
            .kind(NotificationType::Success)
            .entity(entity_types::PROJECT_UPDATE, id)
            .action_url(update_url(id));
            notify_users(&state.pool, recipients, &draft).await;
        }
        ReviewAction::Reject => {
            let draft = rejection_draft(&reviewed, &project, "the Secretariat", &input.remarks);
            notify_users(&state.pool, recipients, &draft).await;
        }
    }

    record_review(&state, &user, &reviewed, input.action, "secretariat").await;

    Ok(Json(ActionResponse::new(
        reviewed,
        review_message(input.action, "Secretariat"),
    )))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_update(state: &AppState, id: DbId) -> AppResult<ProjectUpdate> {
    ProjectUpdateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("ProjectUpdate", id))
}

fn update_url(id: DbId) -> String {
    format!("/project-updates/{id}")
}

/// EIU submitters must be the assigned partner; IU submitters the owner.
fn ensure_can_submit(user: &AuthUser, project: &Project) -> AppResult<()> {
    let allowed = match user.role.as_str() {
        ROLE_EIU => project.eiu_partner_id == Some(user.user_id),
        ROLE_LGU_IU => project.implementing_office_id == user.user_id,
        _ => false,
    };
    if !allowed {
        return Err(AppError::forbidden(
            "You are not assigned to submit updates for this project",
        ));
    }
    Ok(())
}

fn parse_field<T: FromStr>(form: &MultipartForm, name: &str) -> AppResult<Option<T>> {
    form.text(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| AppError::validation(format!("Invalid value for '{name}'")))
        })
        .transpose()
}

fn parse_submission(form: &MultipartForm) -> AppResult<Submission> {
    let project_id = parse_field::<DbId>(form, "project_id")?
        .ok_or_else(|| AppError::validation("project_id is required"))?;
    let milestone_id = parse_field::<DbId>(form, "milestone_id")?;

    let update_type = UpdateType::parse(form.require_text("update_type")?)?;
    let title = form.require_text("title")?.trim().to_string();
    require_non_empty("title", &title).map_err(AppError::validation)?;
    let description = form.text("description").unwrap_or_default().trim().to_string();

    let claimed_progress = parse_field::<f64>(form, "claimed_progress")?.unwrap_or(0.0);
    validate_progress_value("claimed_progress", claimed_progress).map_err(AppError::validation)?;
    let budget_used = parse_field::<f64>(form, "budget_used")?;
    if budget_used.is_some_and(|b| !b.is_finite() || b < 0.0) {
        return Err(AppError::validation("budget_used must be a non-negative amount"));
    }

    let milestone_updates = if update_type.carries_milestone_payload() {
        let raw = form.text("milestone_updates").ok_or_else(|| {
            AppError::validation("milestone_updates is required for milestone updates")
        })?;
        Some(parse_payload(raw)?)
    } else {
        None
    };

    Ok(Submission {
        project_id,
        milestone_id,
        update_type,
        title,
        description,
        claimed_progress,
        budget_used,
        remarks: form.text("remarks").map(str::to_string),
        milestone_updates,
    })
}

/// The payload must be a JSON array of milestone entries. Division statuses
/// in it are dropped; only Secretariat verdicts set them.
fn parse_payload(raw: &str) -> AppResult<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| AppError::validation(format!("milestone_updates is not valid JSON: {e}")))?;
    if !value.is_array() {
        return Err(AppError::validation("milestone_updates must be a JSON array"));
    }
    let mut entries = parse_milestone_updates(&value)
        .map_err(|e| AppError::validation(format!("Invalid milestone_updates: {}", e.0)))?;
    clear_division_statuses(&mut entries);
    serde_json::to_value(&entries).map_err(|e| AppError::InternalError(e.to_string()))
}

/// Every entry naming a milestone must name one of this project's.
fn ensure_entries_belong(raw: &Value, milestones: &[Milestone]) -> AppResult<()> {
    let entries = parse_milestone_updates(raw)
        .map_err(|e| AppError::validation(format!("Invalid milestone_updates: {}", e.0)))?;
    for id in entries.iter().filter_map(|e| e.milestone_id) {
        if !milestones.iter().any(|m| m.id == id) {
            return Err(AppError::validation(format!(
                "Milestone {id} does not belong to this project"
            )));
        }
    }
    Ok(())
}

async fn persist_submission(
    state: &AppState,
    user: &AuthUser,
    project: &Project,
    submission: Submission,
    stored: &[StoredFile],
) -> AppResult<UpdateDetail> {
    let create_dto = CreateProjectUpdate {
        project_id: project.id,
        milestone_id: submission.milestone_id,
        update_type: submission.update_type,
        title: submission.title,
        description: submission.description,
        claimed_progress: submission.claimed_progress,
        budget_used: submission.budget_used,
        remarks: submission.remarks,
        milestone_updates: submission.milestone_updates,
        submitted_by: user.user_id,
        submitted_by_role: user.role.clone(),
        submitted_to: Some(project.implementing_office_id),
    };
    let rows: Vec<CreateProjectUpdateFile> = stored
        .iter()
        .map(|file| CreateProjectUpdateFile {
            file_name: file.file_name.clone(),
            original_name: file.original_name.clone(),
            file_path: file.file_path.clone(),
            file_size: file.file_size,
            mime_type: file.mime_type.clone(),
            file_type: file.file_type,
            sha256: file.sha256.clone(),
            uploaded_by: user.user_id,
        })
        .collect();
    let (update, files) =
        ProjectUpdateRepo::create_with_files(&state.pool, &create_dto, &rows).await?;

    Ok(UpdateDetail { update, files })
}

fn rejection_draft(
    update: &ProjectUpdate,
    project: &Project,
    reviewer: &str,
    remarks: &Option<String>,
) -> NotificationDraft {
    let reason = remarks
        .as_deref()
        .map(|r| format!(" Remarks: {r}"))
        .unwrap_or_default();
    NotificationDraft::new(
        NotificationCategory::Validation,
        "Progress update rejected",
        format!(
            "'{}' for {} ({}) was rejected by {reviewer}.{reason}",
            update.title, project.name, project.project_code
        ),
    )
    .kind(NotificationType::Warning)
    .entity(entity_types::PROJECT_UPDATE, update.id)
    .action_url(update_url(update.id))
}

fn review_message(action: ReviewAction, reviewer: &str) -> String {
    match action {
        ReviewAction::Approve => format!("Update approved by the {reviewer}"),
        ReviewAction::Reject => format!("Update rejected by the {reviewer}"),
    }
}

async fn record_review(
    state: &AppState,
    user: &AuthUser,
    update: &ProjectUpdate,
    action: ReviewAction,
    stage: &str,
) {
    let action_name = match action {
        ReviewAction::Approve => actions::APPROVE_PROJECT_UPDATE,
        ReviewAction::Reject => actions::REJECT_PROJECT_UPDATE,
    };
    activity::record(
        &state.pool,
        user,
        ActivityEntry::new(action_name)
            .entity(entity_types::PROJECT_UPDATE, update.id)
            .metadata(serde_json::json!({
                "stage": stage,
                "project_id": update.project_id,
                "status": update.status,
                "adjusted_progress": update.adjusted_progress,
                "final_progress": update.final_progress,
            })),
    )
    .await;
}
