//! Handlers for the `/communications` resource: direct messages between
//! users.
//!
//! Each participant sees their own side of a message; deleting hides it
//! from that side only.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use buildwatch_core::activity::actions;
use buildwatch_core::communication::{validate_message, CommunicationPriority};
use buildwatch_core::notification::{entity_types, NotificationCategory, NotificationPriority};
use buildwatch_core::types::DbId;
use buildwatch_db::models::communication::{
    Communication, CommunicationQuery, CommunicationStats, CreateCommunication,
    UpdateCommunication,
};
use buildwatch_db::repositories::{CommunicationRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::services::activity::{self, ActivityEntry};
use crate::services::notifications::{notify_users, NotificationDraft};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/communications?box=inbox|sent&category=&is_read=
pub async fn list_communications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<CommunicationQuery>,
) -> AppResult<Json<DataResponse<Vec<Communication>>>> {
    let messages = CommunicationRepo::list_for_user(&state.pool, user.user_id, &params).await?;
    Ok(Json(DataResponse { data: messages }))
}

/// GET /api/v1/communications/stats
pub async fn get_stats(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<CommunicationStats>>> {
    let stats = CommunicationRepo::stats(&state.pool, user.user_id).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// GET /api/v1/communications/{id}
///
/// Opening a message as its recipient marks it read.
pub async fn get_communication(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Communication>>> {
    let mut message = find_message(&state, &user, id).await?;
    if message.recipient_id == user.user_id
        && !message.is_read
        && CommunicationRepo::mark_read(&state.pool, id, user.user_id).await?
    {
        message = find_message(&state, &user, id).await?;
    }
    Ok(Json(DataResponse { data: message }))
}

/// POST /api/v1/communications
pub async fn send_communication(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<CreateCommunication>,
) -> AppResult<(StatusCode, Json<DataResponse<Communication>>)> {
    validate_message(&input.subject, &input.message).map_err(AppError::validation)?;
    if input.recipient_id == user.user_id {
        return Err(AppError::validation("You cannot send a message to yourself"));
    }

    let recipient = UserRepo::find_by_id(&state.pool, input.recipient_id)
        .await?
        .filter(|u| u.deleted_at.is_none() && u.status.can_login())
        .ok_or_else(|| AppError::validation("Recipient is not an active user"))?;

    if let Some(parent_id) = input.parent_message_id {
        CommunicationRepo::find_for_user(&state.pool, parent_id, user.user_id)
            .await?
            .ok_or_else(|| AppError::validation("Parent message not found"))?;
    }

    let message = CommunicationRepo::create(&state.pool, user.user_id, &input).await?;

    let sender_name = UserRepo::find_by_id(&state.pool, user.user_id)
        .await?
        .map(|u| u.full_name)
        .unwrap_or_else(|| format!("user {}", user.user_id));
    let draft = NotificationDraft::new(
        NotificationCategory::System,
        format!("New message: {}", message.subject),
        format!("You have a new message from {sender_name}."),
    )
    .priority(notification_priority(message.priority))
    .entity(entity_types::COMMUNICATION, message.id)
    .action_url(format!("/communications/{}", message.id));
    notify_users(&state.pool, [recipient.id], &draft).await;

    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::SEND_COMMUNICATION)
            .entity(entity_types::COMMUNICATION, message.id)
            .metadata(serde_json::json!({
                "recipient_id": recipient.id,
                "category": message.category,
            })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(DataResponse { data: message })))
}

/// PATCH /api/v1/communications/{id}
pub async fn update_communication(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCommunication>,
) -> AppResult<Json<DataResponse<Communication>>> {
    find_message(&state, &user, id).await?;
    let message = CommunicationRepo::update(&state.pool, id, &input)
        .await?
        .ok_or(AppError::not_found("Communication", id))?;
    Ok(Json(DataResponse { data: message }))
}

/// DELETE /api/v1/communications/{id}
pub async fn delete_communication(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    find_message(&state, &user, id).await?;
    if !CommunicationRepo::delete_for_user(&state.pool, id, user.user_id).await? {
        return Err(AppError::not_found("Communication", id));
    }
    activity::record(
        &state.pool,
        &user,
        ActivityEntry::new(actions::DELETE_COMMUNICATION).entity(entity_types::COMMUNICATION, id),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Messages outside the caller's mailboxes read as missing.
async fn find_message(state: &AppState, user: &AuthUser, id: DbId) -> AppResult<Communication> {
    CommunicationRepo::find_for_user(&state.pool, id, user.user_id)
        .await?
        .ok_or(AppError::not_found("Communication", id))
}

fn notification_priority(priority: CommunicationPriority) -> NotificationPriority {
    match priority {
        CommunicationPriority::Low => NotificationPriority::Low,
        CommunicationPriority::Medium => NotificationPriority::Medium,
        CommunicationPriority::High => NotificationPriority::High,
        CommunicationPriority::Urgent => NotificationPriority::Critical,
    }
}
