//! EIU field activity model and DTOs.

use buildwatch_core::field_activity::{
    FieldActivityPriority, FieldActivityStatus, FieldActivityType, ReviewStatus,
};
use buildwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `eiu_activities` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FieldActivity {
    pub id: DbId,
    pub project_id: DbId,
    pub eiu_user_id: DbId,
    #[sqlx(try_from = "String")]
    pub activity_type: FieldActivityType,
    pub title: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub status: FieldActivityStatus,
    #[sqlx(try_from = "String")]
    pub priority: FieldActivityPriority,
    pub activity_date: Timestamp,
    pub location: Option<String>,
    pub findings: Option<String>,
    pub recommendations: Option<String>,
    pub attachments: serde_json::Value,
    #[sqlx(try_from = "String")]
    pub review_status: ReviewStatus,
    pub reviewed_by: Option<DbId>,
    pub reviewed_at: Option<Timestamp>,
    pub review_comments: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for logging an activity.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFieldActivityRequest {
    pub project_id: DbId,
    pub activity_type: FieldActivityType,
    pub title: String,
    pub description: String,
    pub priority: Option<FieldActivityPriority>,
    /// Defaults to now.
    pub activity_date: Option<Timestamp>,
    pub location: Option<String>,
    pub findings: Option<String>,
    pub recommendations: Option<String>,
    pub attachments: Option<serde_json::Value>,
}

/// Validated insert DTO.
#[derive(Debug, Clone)]
pub struct CreateFieldActivity {
    pub project_id: DbId,
    pub eiu_user_id: DbId,
    pub activity_type: FieldActivityType,
    pub title: String,
    pub description: String,
    pub priority: FieldActivityPriority,
    pub activity_date: Option<Timestamp>,
    pub location: Option<String>,
    pub findings: Option<String>,
    pub recommendations: Option<String>,
    pub attachments: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFieldActivity {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<FieldActivityPriority>,
    pub location: Option<String>,
    pub findings: Option<String>,
    pub recommendations: Option<String>,
    pub attachments: Option<serde_json::Value>,
}

/// A reviewer's verdict.
#[derive(Debug, Clone)]
pub struct FieldActivityReview {
    pub reviewer_id: DbId,
    pub review_status: ReviewStatus,
    pub status: FieldActivityStatus,
    pub comments: Option<String>,
}

/// `?project_id=&activity_type=&review_status=&priority=&from=&to=&limit=&offset=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldActivityQuery {
    pub project_id: Option<DbId>,
    pub activity_type: Option<FieldActivityType>,
    pub review_status: Option<ReviewStatus>,
    pub priority: Option<FieldActivityPriority>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Review workload counters for an implementing office.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct FieldActivityStats {
    pub total: i64,
    pub today: i64,
    pub pending_review: i64,
    pub approved: i64,
}
