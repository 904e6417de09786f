//! Activity log entity model and DTOs.
//!
//! Entries are append-only; `updated_at` exists only to satisfy the schema
//! conventions.

use buildwatch_core::activity::{ActivityLevel, ActivityStatus};
use buildwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `activity_logs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ActivityLog {
    pub id: DbId,
    pub user_id: Option<DbId>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    #[sqlx(try_from = "String")]
    pub level: ActivityLevel,
    pub module: String,
    #[sqlx(try_from = "String")]
    pub status: ActivityStatus,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting an activity log entry.
#[derive(Debug, Clone)]
pub struct CreateActivityLog {
    pub user_id: Option<DbId>,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub level: ActivityLevel,
    pub module: String,
    pub status: ActivityStatus,
    pub metadata: Option<serde_json::Value>,
}

/// Filter parameters for querying activity logs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityLogQuery {
    pub user_id: Option<DbId>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub module: Option<String>,
    pub level: Option<ActivityLevel>,
    pub from: Option<Timestamp>,
    pub to: Option<Timestamp>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}
