//! Notification entity model and DTOs.

use buildwatch_core::notification::{NotificationCategory, NotificationPriority, NotificationType};
use buildwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub user_id: DbId,
    pub title: String,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub notification_type: NotificationType,
    #[sqlx(try_from = "String")]
    pub category: NotificationCategory,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    #[sqlx(try_from = "String")]
    pub priority: NotificationPriority,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub action_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a notification.
#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: DbId,
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub category: NotificationCategory,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub priority: NotificationPriority,
    pub action_url: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Query parameters for `GET /notifications`. Pagination is clamped by the
/// handler.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub category: Option<NotificationCategory>,
    pub priority: Option<NotificationPriority>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
