//! Handlers for the `/rpmes` resource: RPMES monitoring forms attached to
//! projects.
//!
//! Implementing offices file forms for their projects. Input forms (1 to 4)
//! are validated by LGU-PMT, Output forms (5 to 11) by EMS. Forms export
//! to `.xlsx` singly or as the Input/Output bundle.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use buildwatch_core::activity::actions;
use buildwatch_core::notification::{entity_types, NotificationCategory, NotificationType};
use buildwatch_core::rpmes::{
    form_category, validate_form_data, validate_reporting_year, validator_role, FormGroup,
    FormStatus,
};
use buildwatch_core::types::DbId;
use buildwatch_db::models::project::Project;
use buildwatch_db::models::rpmes_form::{
    CreateRpmesForm, CreateRpmesFormRequest, RpmesForm, UpdateRpmesForm,
};
use buildwatch_db::repositories::RpmesFormRepo;
use chrono::{Datelike, Utc};
use serde::Deserialize;

use super::access::{load_owned_project, load_project, load_visible_project};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireImplementingOffice;
use crate::response::{ActionResponse, DataResponse};
use crate::services::activity::{self, ActivityEntry};
use crate::services::export::{
    build_rpmes_form_workbook, build_rpmes_group_workbook, rpmes_form_file_name,
    rpmes_group_file_name, XLSX_CONTENT_TYPE,
};
use crate::services::notifications::{notify_roles, notify_users, NotificationDraft};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Request body for `POST /rpmes/{id}/validate`.
#[derive(Debug, Deserialize)]
pub struct ValidateFormRequest {
    pub approved: bool,
    pub feedback: Option<String>,
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/rpmes/project/{project_id}
pub async fn list_project_forms(
    State(state): State<AppState>,
    user: AuthUser,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<RpmesForm>>>> {
    load_visible_project(&state, &user, project_id).await?;
    let forms = RpmesFormRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: forms }))
}

/// GET /api/v1/rpmes/{id}
pub async fn get_form(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<RpmesForm>>> {
    let form = find_form(&state, id).await?;
    load_visible_project(&state, &user, form.project_id).await?;
    Ok(Json(DataResponse { data: form }))
}

// ---------------------------------------------------------------------------
// Submitter actions
// ---------------------------------------------------------------------------

/// POST /api/v1/rpmes
///
/// Saved as a draft unless `submit` is set.
pub async fn create_form(
    State(state): State<AppState>,
    RequireImplementingOffice(user): RequireImplementingOffice,
    Json(input): Json<CreateRpmesFormRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<RpmesForm>>)> {
    let project = load_owned_project(&state, &user, input.project_id).await?;

    let category = form_category(&input.form_type).map_err(AppError::validation)?;
    validate_reporting_year(input.reporting_year).map_err(AppError::validation)?;
    validate_form_data(&input.form_data).map_err(AppError::validation)?;

    let status = if input.submit {
        FormStatus::Submitted
    } else {
        FormStatus::Draft
    };
    let create_dto = CreateRpmesForm {
        project_id: project.id,
        submitted_by: user.user_id,
        form_type: input.form_type,
        form_category: category,
        reporting_year: input.reporting_year,
        reporting_period: input.reporting_period,
        form_data: input.form_data,
        remarks: input.remarks,
        status,
    };
    let form = RpmesFormRepo::create(&state.pool, &create_dto).await?;

    if form.status == FormStatus::Submitted {
        notify_validators(&state, &form, &project).await;
    }
    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::CREATE_RPMES_FORM)
            .entity(entity_types::RPMES_FORM, form.id)
            .metadata(serde_json::json!({
                "project_id": project.id,
                "form_type": form.form_type,
                "status": form.status,
            })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: form })))
}

/// PUT /api/v1/rpmes/{id}
///
/// Only the submitter, and only while the form is Draft or Rejected.
pub async fn update_form(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateRpmesForm>,
) -> AppResult<Json<DataResponse<RpmesForm>>> {
    let existing = find_form(&state, id).await?;
    ensure_submitter(&user, &existing)?;
    if !existing.status.is_editable() {
        return Err(AppError::conflict(format!(
            "A form in status '{}' can no longer be edited",
            existing.status
        )));
    }
    if let Some(data) = &input.form_data {
        validate_form_data(data).map_err(AppError::validation)?;
    }

    let to = if input.submit {
        FormStatus::Submitted
    } else {
        existing.status
    };
    let form = RpmesFormRepo::update_content(
        &state.pool,
        id,
        existing.status,
        to,
        input.form_data.as_ref(),
        input.reporting_period.as_deref(),
        input.remarks.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::conflict("Form status changed concurrently"))?;

    if form.status == FormStatus::Submitted {
        let project = load_project(&state, form.project_id).await?;
        notify_validators(&state, &form, &project).await;
    }
    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::UPDATE_RPMES_FORM)
            .entity(entity_types::RPMES_FORM, id)
            .metadata(serde_json::json!({ "from": existing.status, "to": form.status })),
    )
    .await;

    Ok(Json(DataResponse { data: form }))
}

/// DELETE /api/v1/rpmes/{id}
///
/// Drafts only, by their submitter.
pub async fn delete_form(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let existing = find_form(&state, id).await?;
    ensure_submitter(&user, &existing)?;
    if existing.status != FormStatus::Draft {
        return Err(AppError::conflict("Only draft forms can be deleted"));
    }
    if !RpmesFormRepo::delete_draft(&state.pool, id).await? {
        return Err(AppError::conflict("Form status changed concurrently"));
    }
    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::DELETE_RPMES_FORM).entity(entity_types::RPMES_FORM, id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// POST /api/v1/rpmes/{id}/validate
pub async fn validate_form(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<ValidateFormRequest>,
) -> AppResult<Json<ActionResponse<RpmesForm>>> {
    let existing = find_form(&state, id).await?;
    let required_role = validator_role(existing.form_category);
    if !user.has_role(required_role) {
        return Err(AppError::forbidden(format!(
            "{} forms are validated by {required_role}",
            existing.form_category
        )));
    }
    if !existing.status.is_reviewable() {
        return Err(AppError::conflict(format!(
            "A form in status '{}' cannot be validated",
            existing.status
        )));
    }
    if !input.approved && input.feedback.as_deref().is_none_or(|f| f.trim().is_empty()) {
        return Err(AppError::validation("Feedback is required when rejecting a form"));
    }

    let to = if input.approved {
        FormStatus::Approved
    } else {
        FormStatus::Rejected
    };
    let form = RpmesFormRepo::record_validation(
        &state.pool,
        id,
        existing.status,
        to,
        user.user_id,
        input.feedback.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::conflict("Form status changed concurrently"))?;

    let (title, kind) = if input.approved {
        ("RPMES form approved", NotificationType::Success)
    } else {
        ("RPMES form rejected", NotificationType::Warning)
    };
    let draft = NotificationDraft::new(
        NotificationCategory::Validation,
        title,
        format!(
            "{} ({}) was {}.",
            form.form_type,
            form.reporting_year,
            form.status.as_str().to_lowercase()
        ),
    )
    .kind(kind)
    .entity(entity_types::RPMES_FORM, id)
    .action_url(form_url(id));
    notify_users(&state.pool, [form.submitted_by], &draft).await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::VALIDATE_RPMES_FORM)
            .entity(entity_types::RPMES_FORM, id)
            .metadata(serde_json::json!({ "approved": input.approved })),
    )
    .await;

    let message = if input.approved {
        "Form approved"
    } else {
        "Form rejected"
    };
    Ok(Json(ActionResponse::new(form, message)))
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// GET /api/v1/rpmes/{id}/export
///
/// One form as an `.xlsx` attachment, for anyone who can read it.
pub async fn export_form(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let form = find_form(&state, id).await?;
    let project = load_visible_project(&state, &user, form.project_id).await?;

    let bytes = build_rpmes_form_workbook(&project, &form)
        .map_err(|e| AppError::InternalError(format!("Workbook generation error: {e}")))?;
    RpmesFormRepo::record_export(&state.pool, &[id]).await?;
    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::EXPORT_RPMES_FORMS)
            .entity(entity_types::RPMES_FORM, id)
            .metadata(serde_json::json!({ "project_id": project.id, "form_type": form.form_type })),
    )
    .await;

    xlsx_attachment(bytes, &rpmes_form_file_name(&project, &form))
}

/// GET /api/v1/rpmes/export/{project_id}/{group}
///
/// The `input` (forms 1 to 4) or `output` (forms 5 to 11) bundle, newest
/// form of each type. Missing forms export as placeholder sheets.
pub async fn export_form_group(
    State(state): State<AppState>,
    user: AuthUser,
    Path((project_id, group)): Path<(DbId, String)>,
) -> AppResult<Response> {
    let group = FormGroup::parse(&group).map_err(|_| {
        AppError::validation("Invalid form group. Must be 'input' or 'output'")
    })?;
    if !group.can_export(&user.role) {
        let message = match group {
            FormGroup::Input => "Input forms (1-4) are exported by LGU-IU",
            FormGroup::Output => "Output forms (5-11) are exported by LGU-PMT or EMS",
        };
        return Err(AppError::forbidden(message));
    }
    let project = load_visible_project(&state, &user, project_id).await?;

    let forms = RpmesFormRepo::latest_of_types(&state.pool, project_id, &group.form_types()).await?;
    let bytes = build_rpmes_group_workbook(&project, group, &forms)
        .map_err(|e| AppError::InternalError(format!("Workbook generation error: {e}")))?;
    let ids: Vec<DbId> = forms.iter().map(|f| f.id).collect();
    RpmesFormRepo::record_export(&state.pool, &ids).await?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::EXPORT_RPMES_FORMS)
            .entity(entity_types::PROJECT, project_id)
            .metadata(serde_json::json!({ "group": group, "form_ids": ids })),
    )
    .await;
    tracing::info!(project_id, %group, forms = ids.len(), "RPMES forms exported");

    let file_name = rpmes_group_file_name(&project, group, Utc::now().year());
    xlsx_attachment(bytes, &file_name)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn xlsx_attachment(bytes: Vec<u8>, file_name: &str) -> AppResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, XLSX_CONTENT_TYPE)
        .header(CONTENT_DISPOSITION, format!("attachment; filename=\"{file_name}\""))
        .body(Body::from(bytes))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

async fn find_form(state: &AppState, id: DbId) -> AppResult<RpmesForm> {
    RpmesFormRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("RPMESForm", id))
}

fn form_url(id: DbId) -> String {
    format!("/rpmes/{id}")
}

fn ensure_submitter(user: &AuthUser, form: &RpmesForm) -> AppResult<()> {
    if form.submitted_by != user.user_id {
        return Err(AppError::forbidden("Only the submitter can change this form"));
    }
    Ok(())
}

async fn notify_validators(state: &AppState, form: &RpmesForm, project: &Project) {
    let draft = NotificationDraft::new(
        NotificationCategory::Validation,
        "RPMES form awaiting validation",
        format!(
            "{} for {} ({}) was submitted for {}.",
            form.form_type, project.name, project.project_code, form.reporting_year
        ),
    )
    .entity(entity_types::RPMES_FORM, form.id)
    .action_url(form_url(form.id));
    notify_roles(&state.pool, &[validator_role(form.form_category)], &draft).await;
}
