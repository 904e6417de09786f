//! Handlers for the `/templates` resource: downloadable reporting forms.
//!
//! The Secretariat and system administrators manage templates. Other users
//! see and download only active ones.

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use buildwatch_core::activity::actions;
use buildwatch_core::roles::ROLE_SYS_AD;
use buildwatch_core::template::{is_downloadable, TemplateCategory, TemplateStatus};
use buildwatch_core::types::DbId;
use buildwatch_core::upload::{extension_of, TEMPLATE_EXTENSIONS};
use buildwatch_core::validation::require_non_empty;
use buildwatch_db::models::template::{CreateTemplate, Template, TemplateQuery, UpdateTemplate};
use buildwatch_db::repositories::TemplateRepo;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::{ActionResponse, DataResponse};
use crate::services::activity::{self, ActivityEntry};
use crate::services::uploads::{self, read_multipart, remove_quietly, store, TEMPLATES_DIR};
use crate::state::AppState;

const ENTITY: &str = "Template";
const DEFAULT_VERSION: &str = "1.0";

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// GET /api/v1/templates?category=&status=
pub async fn list_templates(
    State(state): State<AppState>,
    user: AuthUser,
    Query(mut params): Query<TemplateQuery>,
) -> AppResult<Json<DataResponse<Vec<Template>>>> {
    if !can_manage(&user) {
        params.status = Some(TemplateStatus::Active);
    }
    let templates = TemplateRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse { data: templates }))
}

/// GET /api/v1/templates/{id}
pub async fn get_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Template>>> {
    let template = find_readable(&state, &user, id).await?;
    Ok(Json(DataResponse { data: template }))
}

/// GET /api/v1/templates/{id}/download
///
/// Streams the stored file as an attachment and counts the download.
pub async fn download_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let template = find_readable(&state, &user, id).await?;
    let path = uploads::resolve(&state.config.upload_dir, &template.file_path)?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(template_id = id, path = %path.display(), "Template file missing on disk");
            return Err(AppError::not_found("TemplateFile", id));
        }
        Err(e) => return Err(AppError::InternalError(e.to_string())),
    };
    let file_size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    TemplateRepo::increment_downloads(&state.pool, id).await?;
    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::DOWNLOAD_TEMPLATE).entity(ENTITY, id),
    )
    .await;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type_for(&template.file_type))
        .header(CONTENT_LENGTH, file_size.to_string())
        .header(
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", attachment_name(&template.original_name)),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

// ---------------------------------------------------------------------------
// Management
// ---------------------------------------------------------------------------

/// POST /api/v1/templates (multipart)
///
/// Fields: `name`, `category`, optional `description`, `sub_category`,
/// `department`, `version`, `is_required`, and one `file` part.
pub async fn upload_template(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Template>>)> {
    ensure_manager(&user)?;

    let form = read_multipart(multipart).await?;
    let name = form.require_text("name")?.trim().to_string();
    require_non_empty("name", &name).map_err(AppError::validation)?;
    let category = TemplateCategory::parse(form.require_text("category")?)?;
    let is_required = match form.text("is_required") {
        Some(raw) => parse_flag(raw)?,
        None => false,
    };

    let file = match form.files.as_slice() {
        [file] => file,
        [] => return Err(AppError::validation("A template file is required")),
        _ => return Err(AppError::validation("Upload exactly one template file")),
    };
    let stored = store(
        &state.config.upload_dir,
        TEMPLATES_DIR,
        file,
        TEMPLATE_EXTENSIONS,
        state.config.max_upload_bytes,
    )
    .await?;

    let create_dto = CreateTemplate {
        name,
        description: form.text("description").map(str::to_string),
        category,
        sub_category: form.text("sub_category").map(str::to_string),
        department: form.text("department").map(str::to_string),
        file_type: extension_of(&stored.original_name).unwrap_or_default(),
        file_name: stored.file_name.clone(),
        original_name: stored.original_name.clone(),
        file_path: stored.file_path.clone(),
        file_size: stored.file_size,
        version: form.text("version").unwrap_or(DEFAULT_VERSION).to_string(),
        is_required,
        uploaded_by: user.user_id,
    };
    let template = match TemplateRepo::create(&state.pool, &create_dto).await {
        Ok(template) => template,
        Err(e) => {
            remove_quietly(&state.config.upload_dir, std::slice::from_ref(&stored)).await;
            return Err(e.into());
        }
    };

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::UPLOAD_TEMPLATE)
            .entity(ENTITY, template.id)
            .metadata(serde_json::json!({
                "name": template.name,
                "category": template.category,
                "file_size": template.file_size,
                "sha256": stored.sha256,
            })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: template })))
}

/// PUT /api/v1/templates/{id}
pub async fn update_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateTemplate>,
) -> AppResult<Json<DataResponse<Template>>> {
    ensure_manager(&user)?;
    if let Some(name) = &input.name {
        require_non_empty("name", name).map_err(AppError::validation)?;
    }
    let template = TemplateRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found(ENTITY, id))?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::UPDATE_TEMPLATE).entity(ENTITY, id),
    )
    .await;

    Ok(Json(DataResponse { data: template }))
}

/// DELETE /api/v1/templates/{id}
///
/// Soft delete; the stored file is kept.
pub async fn delete_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    ensure_manager(&user)?;
    if !TemplateRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found(ENTITY, id));
    }
    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::DELETE_TEMPLATE).entity(ENTITY, id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/{id}/approve
pub async fn approve_template(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<ActionResponse<Template>>> {
    ensure_manager(&user)?;
    let template = TemplateRepo::approve(&state.pool, id, user.user_id)
        .await?
        .ok_or(AppError::not_found(ENTITY, id))?;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::APPROVE_TEMPLATE).entity(ENTITY, id),
    )
    .await;

    Ok(Json(ActionResponse::new(template, "Template approved")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn can_manage(user: &AuthUser) -> bool {
    user.is_secretariat() || user.has_role(ROLE_SYS_AD)
}

fn ensure_manager(user: &AuthUser) -> AppResult<()> {
    if !can_manage(user) {
        return Err(AppError::forbidden(
            "Only the Secretariat or a system administrator can manage templates",
        ));
    }
    Ok(())
}

/// Non-managers cannot see inactive templates at all.
async fn find_readable(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<Template> {
    let template = TemplateRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found(ENTITY, id))?;
    if !can_manage(user) && !is_downloadable(template.status) {
        return Err(AppError::not_found(ENTITY, id));
    }
    Ok(template)
}

fn parse_flag(raw: &str) -> AppResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(AppError::validation(format!("Invalid boolean '{raw}'"))),
    }
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Header-safe file name: quotes, backslashes and control characters become `_`.
fn attachment_name(original: &str) -> String {
    original
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() { '_' } else { c })
        .collect()
}
