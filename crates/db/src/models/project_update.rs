//! Progress update (submission) model, attached files, and DTOs.

use buildwatch_core::types::{DbId, Timestamp};
use buildwatch_core::upload::FileKind;
use buildwatch_core::workflow::{UpdateStatus, UpdateType};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `project_updates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectUpdate {
    pub id: DbId,
    pub project_id: DbId,
    pub milestone_id: Option<DbId>,
    #[sqlx(try_from = "String")]
    pub update_type: UpdateType,
    pub title: String,
    pub description: String,
    pub claimed_progress: f64,
    pub adjusted_progress: Option<f64>,
    pub final_progress: Option<f64>,
    pub budget_used: Option<f64>,
    pub remarks: Option<String>,
    pub milestone_updates: Option<serde_json::Value>,
    #[sqlx(try_from = "String")]
    pub status: UpdateStatus,
    pub submitted_by: DbId,
    pub submitted_by_role: String,
    pub submitted_to: Option<DbId>,
    pub submitted_at: Timestamp,
    pub iu_reviewer_id: Option<DbId>,
    pub iu_reviewed_at: Option<Timestamp>,
    pub iu_remarks: Option<String>,
    pub secretariat_reviewer_id: Option<DbId>,
    pub secretariat_reviewed_at: Option<Timestamp>,
    pub secretariat_remarks: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a submission. Status starts at `submitted`.
#[derive(Debug, Clone)]
pub struct CreateProjectUpdate {
    pub project_id: DbId,
    pub milestone_id: Option<DbId>,
    pub update_type: UpdateType,
    pub title: String,
    pub description: String,
    pub claimed_progress: f64,
    pub budget_used: Option<f64>,
    pub remarks: Option<String>,
    pub milestone_updates: Option<serde_json::Value>,
    pub submitted_by: DbId,
    pub submitted_by_role: String,
    pub submitted_to: Option<DbId>,
}

/// The IU gate's outcome.
#[derive(Debug, Clone)]
pub struct IuReview {
    pub reviewer_id: DbId,
    pub status: UpdateStatus,
    pub adjusted_progress: Option<f64>,
    pub remarks: Option<String>,
}

/// The Secretariat gate's outcome.
#[derive(Debug, Clone)]
pub struct SecretariatReview {
    pub reviewer_id: DbId,
    pub status: UpdateStatus,
    pub final_progress: Option<f64>,
    pub remarks: Option<String>,
    /// Replaces `milestone_updates` when division verdicts were merged.
    pub milestone_updates: Option<serde_json::Value>,
}

/// Listing filters for a project's updates.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQuery {
    pub status: Option<UpdateStatus>,
    pub update_type: Option<UpdateType>,
}

/// A row from the `project_update_files` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectUpdateFile {
    pub id: DbId,
    pub project_update_id: DbId,
    pub file_name: String,
    pub original_name: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    #[sqlx(try_from = "String")]
    pub file_type: FileKind,
    pub sha256: String,
    pub uploaded_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An evidence file to attach; the owning update id is supplied on insert.
#[derive(Debug, Clone)]
pub struct CreateProjectUpdateFile {
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_type: FileKind,
    pub sha256: String,
    pub uploaded_by: DbId,
}
