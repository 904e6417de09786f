//! Handlers for the `/auth` resource (login, refresh, logout, me, password).

use axum::extract::State;
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use buildwatch_core::activity::actions;
use buildwatch_core::error::CoreError;
use buildwatch_core::notification::entity_types;
use buildwatch_core::types::DbId;
use buildwatch_db::models::session::CreateSession;
use buildwatch_db::models::user::{User, UserResponse};
use buildwatch_db::repositories::{SessionRepo, UserRepo};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::jwt::{hash_refresh_token, issue_session_tokens};
use crate::auth::password::{
    hash_password, validate_password_strength, verify_password, MIN_PASSWORD_LENGTH,
};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{client_ip, header_string, AuthUser};
use crate::response::DataResponse;
use crate::services::activity::{self, ActivityEntry};
use crate::state::AppState;

/// Maximum consecutive failed login attempts before locking the account.
const MAX_FAILED_ATTEMPTS: i32 = 5;

/// Duration in minutes to lock an account after exceeding failed attempts.
const LOCK_DURATION_MINS: i64 = 15;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`. `username` may also be an email.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request body for `PUT /auth/password`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserInfo,
}

/// Public user info embedded in [`AuthResponse`].
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub sub_role: Option<String>,
}

/// Client details captured for sessions and the activity log.
struct ClientInfo {
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl ClientInfo {
    fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: client_ip(headers),
            user_agent: header_string(headers, USER_AGENT.as_str()),
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with username (or email) + password. Returns access and
/// refresh tokens.
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let client = ClientInfo::from_headers(&headers);

    let Some(user) = UserRepo::find_by_login(&state.pool, input.username.trim()).await? else {
        record_failed_login(&state, None, &client, &input.username, "unknown user").await;
        return Err(AppError::Core(CoreError::Unauthorized(
            INVALID_CREDENTIALS.into(),
        )));
    };

    if !user.status.can_login() {
        record_failed_login(&state, Some(user.id), &client, &user.username, "inactive").await;
        return Err(AppError::forbidden(format!("Account is {}", user.status)));
    }

    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            record_failed_login(&state, Some(user.id), &client, &user.username, "locked").await;
            return Err(AppError::forbidden(
                "Account is temporarily locked. Try again later.",
            ));
        }
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;

    if !password_valid {
        let failures = UserRepo::increment_failed_login(&state.pool, user.id).await?;
        if failures >= MAX_FAILED_ATTEMPTS {
            let lock_until = Utc::now() + chrono::Duration::minutes(LOCK_DURATION_MINS);
            UserRepo::lock_account(&state.pool, user.id, lock_until).await?;
            tracing::warn!(user_id = user.id, failures, "Account locked after failed logins");
        }
        record_failed_login(&state, Some(user.id), &client, &user.username, "bad password").await;
        return Err(AppError::Core(CoreError::Unauthorized(
            INVALID_CREDENTIALS.into(),
        )));
    }

    UserRepo::record_successful_login(&state.pool, user.id).await?;

    let response = create_auth_response(&state, &user, &client).await?;

    activity::record_anonymous(
        &state.pool,
        Some(user.id),
        client.ip_address,
        client.user_agent,
        ActivityEntry::new(actions::LOGIN).entity(entity_types::USER, user.id),
    )
    .await;
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    Ok(Json(response))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for new access + refresh tokens.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let token_hash = hash_refresh_token(&input.refresh_token);

    let session = SessionRepo::find_active_by_hash(&state.pool, &token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    // Single use: of two concurrent refreshes only one wins the revoke.
    if !SessionRepo::revoke(&state.pool, session.id).await? {
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid or expired refresh token".into(),
        )));
    }

    let user = UserRepo::find_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.status.can_login() {
        return Err(AppError::forbidden(format!("Account is {}", user.status)));
    }

    let response =
        create_auth_response(&state, &user, &ClientInfo::from_headers(&headers)).await?;
    Ok(Json(response))
}

/// POST /api/v1/auth/logout
///
/// Revoke all sessions for the authenticated user. Returns 204 No Content.
pub async fn logout(State(state): State<AppState>, auth_user: AuthUser) -> AppResult<StatusCode> {
    let revoked = SessionRepo::revoke_all_for_user(&state.pool, auth_user.user_id).await?;
    activity::record(
        &state.pool,
        &auth_user,
        ActivityEntry::new(actions::LOGOUT).metadata(serde_json::json!({ "sessions": revoked })),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(AppError::not_found("User", auth_user.user_id))?;
    Ok(Json(DataResponse {
        data: UserResponse::from(&user),
    }))
}

/// PUT /api/v1/auth/password
///
/// Change the caller's password. Other sessions are revoked.
pub async fn change_password(
    State(state): State<AppState>,
    auth_user: AuthUser,
    Json(input): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let user = UserRepo::find_by_id(&state.pool, auth_user.user_id)
        .await?
        .ok_or(AppError::not_found("User", auth_user.user_id))?;

    let current_ok = verify_password(&input.current_password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !current_ok {
        return Err(AppError::validation("Current password is incorrect"));
    }

    validate_password_strength(&input.new_password, MIN_PASSWORD_LENGTH)
        .map_err(AppError::validation)?;
    if input.new_password == input.current_password {
        return Err(AppError::validation(
            "New password must differ from the current password",
        ));
    }

    let hash = hash_password(&input.new_password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;
    UserRepo::update_password(&state.pool, user.id, &hash).await?;
    SessionRepo::revoke_all_for_user(&state.pool, user.id).await?;

    activity::record(
        &state.pool,
        &auth_user,
        ActivityEntry::new(actions::CHANGE_PASSWORD).entity(entity_types::USER, user.id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Issue a token pair, persist its session row, and build the response.
async fn create_auth_response(
    state: &AppState,
    user: &User,
    client: &ClientInfo,
) -> AppResult<AuthResponse> {
    let tokens = issue_session_tokens(
        user.id,
        &user.role,
        user.sub_role.as_deref(),
        &state.config.jwt,
    )
    .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    SessionRepo::create(
        &state.pool,
        &CreateSession {
            user_id: user.id,
            refresh_token_hash: tokens.refresh_token_hash,
            expires_at: tokens.refresh_expires_at,
            user_agent: client.user_agent.clone(),
            ip_address: client.ip_address.clone(),
        },
    )
    .await?;

    Ok(AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: state.config.jwt.access_expires_in(),
        user: UserInfo::from(user),
    })
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
            sub_role: user.sub_role.clone(),
        }
    }
}

async fn record_failed_login(
    state: &AppState,
    user_id: Option<DbId>,
    client: &ClientInfo,
    login: &str,
    reason: &str,
) {
    tracing::warn!(?user_id, reason, "Failed login attempt");
    activity::record_anonymous(
        &state.pool,
        user_id,
        client.ip_address.clone(),
        client.user_agent.clone(),
        ActivityEntry::new(actions::FAILED_LOGIN)
            .failed()
            .details(format!("Failed login for '{login}': {reason}")),
    )
    .await;
}
