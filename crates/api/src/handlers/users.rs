//! Handlers for the `/users` resource (account administration).
//!
//! Everything except `GET /users/role/{role}` requires `SYS.AD` via
//! [`RequireSystemAdmin`].

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use buildwatch_core::activity::actions;
use buildwatch_core::notification::entity_types;
use buildwatch_core::roles::{validate_role_assignment, ROLE_LGU_PMT};
use buildwatch_core::types::DbId;
use buildwatch_core::user::UserStatus;
use buildwatch_core::validation::{require_non_empty, validate_email, validate_username};
use buildwatch_db::models::user::{CreateUser, UpdateUser, User, UserQuery, UserResponse};
use buildwatch_db::repositories::{RoleRepo, SessionRepo, UserRepo};
use serde::{Deserialize, Serialize};

use crate::auth::password::{
    generate_temporary_password, hash_password, validate_password_strength, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireSystemAdmin;
use crate::response::{ActionResponse, DataResponse};
use crate::services::activity::{self, ActivityEntry};
use crate::services::email::{password_reset_message, send_logged, welcome_message};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: String,
    /// Role name, e.g. `LGU-IU`.
    pub role: String,
    pub sub_role: Option<String>,
    pub department: Option<String>,
    pub contact_number: Option<String>,
}

/// Request body for `PUT /users/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
    pub sub_role: Option<String>,
    pub department: Option<String>,
    pub contact_number: Option<String>,
}

/// Request body for `PATCH /users/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: UserStatus,
}

/// Request body for `POST /users/{id}/reset-password`. Without
/// `new_password` a temporary one is generated and emailed.
#[derive(Debug, Default, Deserialize)]
pub struct ResetPasswordRequest {
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResetPasswordResponse {
    pub user_id: DbId,
    /// Present only when the server generated the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/users?role=&status=&search=
pub async fn list_users(
    State(state): State<AppState>,
    RequireSystemAdmin(_admin): RequireSystemAdmin,
    Query(params): Query<UserQuery>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let users = UserRepo::list(&state.pool, &params).await?;
    Ok(Json(DataResponse {
        data: users.iter().map(UserResponse::from).collect(),
    }))
}

/// POST /api/v1/users
///
/// Create an account and send the welcome email. Returns 201 Created.
pub async fn create_user(
    State(state): State<AppState>,
    RequireSystemAdmin(admin): RequireSystemAdmin,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<UserResponse>>)> {
    validate_username(&input.username).map_err(AppError::validation)?;
    validate_email(&input.email).map_err(AppError::validation)?;
    require_non_empty("full_name", &input.full_name).map_err(AppError::validation)?;
    validate_password_strength(&input.password, MIN_PASSWORD_LENGTH)
        .map_err(AppError::validation)?;

    let sub_role = normalize(input.sub_role);
    validate_role_assignment(&input.role, sub_role.as_deref()).map_err(AppError::validation)?;
    let role = RoleRepo::find_by_name(&state.pool, &input.role)
        .await?
        .ok_or_else(|| AppError::validation(format!("Unknown role '{}'", input.role)))?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let create_dto = CreateUser {
        username: input.username.trim().to_string(),
        email: input.email.trim().to_string(),
        password_hash,
        full_name: input.full_name.trim().to_string(),
        role_id: role.id,
        sub_role,
        department: input.department,
        contact_number: input.contact_number,
    };
    let user = UserRepo::create(&state.pool, &create_dto).await?;

    let (subject, body) = welcome_message(&user.full_name, &user.username, &user.role);
    send_logged(state.mailer.as_ref(), &user.email, &subject, &body).await;

    activity::record(
        &state.pool,
        &admin,
        ActivityEntry::new(actions::CREATE_USER)
            .entity(entity_types::USER, user.id)
            .details(format!("Created user '{}'", user.username))
            .metadata(serde_json::json!({
                "username": user.username,
                "role": user.role,
                "sub_role": user.sub_role,
            })),
    )
    .await;
    tracing::info!(user_id = user.id, role = %user.role, created_by = admin.user_id, "User created");

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: UserResponse::from(&user),
        }),
    ))
}

/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    RequireSystemAdmin(_admin): RequireSystemAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = find_user(&state, id).await?;
    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// PUT /api/v1/users/{id}
///
/// Update profile fields. A role change re-validates the sub-role; moving
/// away from `LGU-PMT` clears it.
pub async fn update_user(
    State(state): State<AppState>,
    RequireSystemAdmin(admin): RequireSystemAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateUserRequest>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let existing = find_user(&state, id).await?;

    if let Some(email) = &input.email {
        validate_email(email).map_err(AppError::validation)?;
    }
    if let Some(full_name) = &input.full_name {
        require_non_empty("full_name", full_name).map_err(AppError::validation)?;
    }

    let role_name = input.role.clone().unwrap_or_else(|| existing.role.clone());
    let sub_role = match normalize(input.sub_role) {
        Some(sub) => Some(sub),
        None if role_name == ROLE_LGU_PMT => existing.sub_role.clone(),
        None => None,
    };
    validate_role_assignment(&role_name, sub_role.as_deref()).map_err(AppError::validation)?;

    let role_id = match &input.role {
        Some(name) => Some(
            RoleRepo::find_by_name(&state.pool, name)
                .await?
                .ok_or_else(|| AppError::validation(format!("Unknown role '{name}'")))?
                .id,
        ),
        None => None,
    };

    let update_dto = UpdateUser {
        email: input.email.map(|e| e.trim().to_string()),
        full_name: input.full_name.map(|n| n.trim().to_string()),
        role_id,
        sub_role,
        department: input.department,
        contact_number: input.contact_number,
    };
    let user = UserRepo::update(&state.pool, id, &update_dto)
        .await?
        .ok_or(AppError::not_found("User", id))?;

    // A role change invalidates the role claims in outstanding tokens.
    if user.role != existing.role || user.sub_role != existing.sub_role {
        SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    }

    activity::record(
        &state.pool,
        &admin,
        ActivityEntry::new(actions::UPDATE_USER)
            .entity(entity_types::USER, id)
            .metadata(serde_json::json!({
                "previous_role": existing.role,
                "role": user.role,
                "sub_role": user.sub_role,
            })),
    )
    .await;

    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// PATCH /api/v1/users/{id}/status
///
/// Set `active`, `blocked` or `deactivated`. Anything but `active` also
/// revokes the user's sessions.
pub async fn update_status(
    State(state): State<AppState>,
    RequireSystemAdmin(admin): RequireSystemAdmin,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateStatusRequest>,
) -> AppResult<Json<ActionResponse<UserResponse>>> {
    reject_self(&admin, id, "change your own status")?;
    if !input.status.is_admin_settable() {
        return Err(AppError::validation(format!(
            "Status '{}' cannot be set directly",
            input.status
        )));
    }

    let existing = find_user(&state, id).await?;
    if !UserRepo::set_status(&state.pool, id, input.status).await? {
        return Err(AppError::not_found("User", id));
    }
    if input.status != UserStatus::Active {
        SessionRepo::revoke_all_for_user(&state.pool, id).await?;
    }
    let user = find_user(&state, id).await?;

    activity::record(
        &state.pool,
        &admin,
        ActivityEntry::new(actions::UPDATE_USER_STATUS)
            .entity(entity_types::USER, id)
            .details(format!(
                "Status of '{}' changed from {} to {}",
                user.username, existing.status, user.status
            )),
    )
    .await;

    Ok(Json(ActionResponse::new(
        UserResponse::from(&user),
        format!("User status set to {}", user.status),
    )))
}

/// POST /api/v1/users/{id}/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    RequireSystemAdmin(admin): RequireSystemAdmin,
    Path(id): Path<DbId>,
    input: Option<Json<ResetPasswordRequest>>,
) -> AppResult<Json<DataResponse<ResetPasswordResponse>>> {
    let user = find_user(&state, id).await?;
    let requested = input.and_then(|Json(body)| body.new_password);

    let (password, generated) = match requested {
        Some(password) => {
            validate_password_strength(&password, MIN_PASSWORD_LENGTH)
                .map_err(AppError::validation)?;
            (password, false)
        }
        None => (generate_temporary_password(), true),
    };

    let hashed = hash_password(&password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    if !UserRepo::update_password(&state.pool, id, &hashed).await? {
        return Err(AppError::not_found("User", id));
    }
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    if generated {
        let (subject, body) = password_reset_message(&user.full_name, &password);
        send_logged(state.mailer.as_ref(), &user.email, &subject, &body).await;
    }

    activity::record(
        &state.pool,
        &admin,
        ActivityEntry::new(actions::RESET_USER_PASSWORD)
            .entity(entity_types::USER, id)
            .metadata(serde_json::json!({ "generated": generated })),
    )
    .await;

    Ok(Json(DataResponse {
        data: ResetPasswordResponse {
            user_id: id,
            temporary_password: generated.then_some(password),
        },
    }))
}

/// DELETE /api/v1/users/{id}
///
/// Soft-delete and revoke sessions. Returns 204 No Content.
pub async fn delete_user(
    State(state): State<AppState>,
    RequireSystemAdmin(admin): RequireSystemAdmin,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    reject_self(&admin, id, "delete your own account")?;
    if !UserRepo::soft_delete(&state.pool, id).await? {
        return Err(AppError::not_found("User", id));
    }
    SessionRepo::revoke_all_for_user(&state.pool, id).await?;

    activity::record(
        &state.pool,
        &admin,
        ActivityEntry::new(actions::SOFT_DELETE_USER).entity(entity_types::USER, id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/users/{id}/restore
pub async fn restore_user(
    State(state): State<AppState>,
    RequireSystemAdmin(admin): RequireSystemAdmin,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    if !UserRepo::restore(&state.pool, id).await? {
        return Err(AppError::not_found("User", id));
    }
    let user = find_user(&state, id).await?;

    activity::record(
        &state.pool,
        &admin,
        ActivityEntry::new(actions::RESTORE_USER).entity(entity_types::USER, id),
    )
    .await;

    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// GET /api/v1/users/role/{role}
///
/// Active users holding `role`, for assignment pickers. Any signed-in user.
pub async fn list_by_role(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(role): Path<String>,
) -> AppResult<Json<DataResponse<Vec<UserResponse>>>> {
    let users = UserRepo::list_active_by_roles(&state.pool, &[role.as_str()]).await?;
    Ok(Json(DataResponse {
        data: users.iter().map(UserResponse::from).collect(),
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_user(state: &AppState, id: DbId) -> AppResult<User> {
    UserRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("User", id))
}

fn reject_self(admin: &AuthUser, id: DbId, what: &str) -> AppResult<()> {
    if admin.user_id == id {
        return Err(AppError::forbidden(format!("You cannot {what}")));
    }
    Ok(())
}

/// Blank sub-roles count as none.
fn normalize(sub_role: Option<String>) -> Option<String> {
    sub_role
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
