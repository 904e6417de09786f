//! Handlers for `/profile`: the caller's profile picture.
//!
//! Pictures are served without authentication so they can be used directly
//! as `<img>` sources, including for users that have since been deleted.

use axum::body::Body;
use axum::extract::{Multipart, Path, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use buildwatch_core::activity::actions;
use buildwatch_core::notification::entity_types;
use buildwatch_core::types::DbId;
use buildwatch_core::upload::{
    image_content_type, FileKind, MAX_PROFILE_PICTURE_BYTES, PROFILE_PICTURE_EXTENSIONS,
};
use buildwatch_db::repositories::UserRepo;
use serde::Serialize;
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::ActionResponse;
use crate::services::activity::{self, ActivityEntry};
use crate::services::uploads::{
    self, read_multipart, remove_path_quietly, remove_quietly, store, PROFILE_PICTURES_DIR,
};
use crate::state::AppState;

const PICTURE_FIELD: &str = "profile_picture";
const PICTURE_CACHE: &str = "public, max-age=3600";

#[derive(Debug, Serialize)]
pub struct ProfilePicture {
    pub user_id: DbId,
    pub picture_url: String,
}

/// POST /api/v1/profile/picture (multipart, one `profile_picture` part)
pub async fn upload_picture(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<ActionResponse<ProfilePicture>>> {
    let form = read_multipart(multipart).await?;
    let file = form
        .files
        .iter()
        .find(|f| f.field_name == PICTURE_FIELD)
        .ok_or_else(|| AppError::validation("A profile_picture file is required"))?;
    if FileKind::from_mime(&file.content_type) != FileKind::Photo {
        return Err(AppError::validation("Profile pictures must be images"));
    }

    let root = &state.config.upload_dir;
    let max_bytes = state.config.max_upload_bytes.min(MAX_PROFILE_PICTURE_BYTES);
    let stored = store(root, PROFILE_PICTURES_DIR, file, PROFILE_PICTURE_EXTENSIONS, max_bytes).await?;

    let previous =
        match UserRepo::set_profile_picture(&state.pool, user.user_id, Some(&stored.file_path)).await {
            Ok(Some(previous)) => previous,
            Ok(None) => {
                remove_quietly(root, std::slice::from_ref(&stored)).await;
                return Err(AppError::not_found("User", user.user_id));
            }
            Err(e) => {
                remove_quietly(root, std::slice::from_ref(&stored)).await;
                return Err(e.into());
            }
        };
    if let Some(previous) = previous {
        remove_path_quietly(root, &previous).await;
    }

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::UPDATE_PROFILE_PICTURE)
            .entity(entity_types::USER, user.user_id)
            .metadata(serde_json::json!({
                "file_size": stored.file_size,
                "sha256": stored.sha256,
            })),
    )
    .await;

    let picture = ProfilePicture {
        user_id: user.user_id,
        picture_url: picture_url(user.user_id),
    };
    Ok(Json(ActionResponse::new(picture, "Profile picture updated")))
}

/// DELETE /api/v1/profile/picture
pub async fn remove_picture(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<StatusCode> {
    let previous = UserRepo::set_profile_picture(&state.pool, user.user_id, None)
        .await?
        .flatten()
        .ok_or_else(|| AppError::not_found("ProfilePicture", user.user_id))?;
    remove_path_quietly(&state.config.upload_dir, &previous).await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::REMOVE_PROFILE_PICTURE)
            .entity(entity_types::USER, user.user_id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/profile/picture/{user_id} (public)
pub async fn get_picture(
    State(state): State<AppState>,
    Path(user_id): Path<DbId>,
) -> AppResult<Response> {
    let relative = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .and_then(|u| u.profile_picture_path)
        .ok_or_else(|| AppError::not_found("ProfilePicture", user_id))?;
    let path = uploads::resolve(&state.config.upload_dir, &relative)?;
    let content_type = image_content_type(&relative).unwrap_or("application/octet-stream");

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(user_id, path = %path.display(), "Profile picture missing on disk");
            return Err(AppError::not_found("ProfilePicture", user_id));
        }
        Err(e) => return Err(AppError::InternalError(e.to_string())),
    };
    let file_size = file
        .metadata()
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .len();

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header(CONTENT_LENGTH, file_size.to_string())
        .header(CACHE_CONTROL, PICTURE_CACHE)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

fn picture_url(user_id: DbId) -> String {
    format!("/api/v1/profile/picture/{user_id}")
}
