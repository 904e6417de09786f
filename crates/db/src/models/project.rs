//! Project entity model and DTOs.

use buildwatch_core::project::{FundingSource, ProjectCategory, ProjectPriority, ProjectStatus};
use buildwatch_core::types::{Date, DbId, Timestamp};
use buildwatch_core::workflow::WorkflowStatus;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub project_code: String,
    pub name: String,
    pub description: String,
    #[sqlx(try_from = "String")]
    pub category: ProjectCategory,
    pub location: String,
    #[sqlx(try_from = "String")]
    pub priority: ProjectPriority,
    #[sqlx(try_from = "String")]
    pub funding_source: FundingSource,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    #[sqlx(try_from = "String")]
    pub workflow_status: WorkflowStatus,
    pub total_budget: f64,
    pub start_date: Date,
    pub end_date: Date,
    pub expected_outputs: Option<String>,
    pub target_beneficiaries: Option<String>,
    pub implementing_office_id: DbId,
    pub eiu_partner_id: Option<DbId>,
    pub timeline_progress: f64,
    pub budget_progress: f64,
    pub physical_progress: f64,
    pub overall_progress: f64,
    pub automated_progress: bool,
    pub last_progress_update: Option<Timestamp>,
    pub submitted_to_secretariat: bool,
    pub submitted_to_secretariat_at: Option<Timestamp>,
    pub approved_by_secretariat: bool,
    pub secretariat_approved_by: Option<DbId>,
    pub secretariat_approved_at: Option<Timestamp>,
    pub secretariat_comments: Option<String>,
    pub approved_by_mpmec: bool,
    pub mpmec_approved_by: Option<DbId>,
    pub mpmec_approved_at: Option<Timestamp>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a project. The implementing office is the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub project_code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: ProjectCategory,
    pub location: String,
    pub priority: Option<ProjectPriority>,
    pub funding_source: Option<FundingSource>,
    pub total_budget: f64,
    pub start_date: Date,
    pub end_date: Date,
    pub expected_outputs: Option<String>,
    pub target_beneficiaries: Option<String>,
    pub eiu_partner_id: Option<DbId>,
}

/// DTO for updating a project. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<ProjectCategory>,
    pub location: Option<String>,
    pub priority: Option<ProjectPriority>,
    pub funding_source: Option<FundingSource>,
    pub total_budget: Option<f64>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub expected_outputs: Option<String>,
    pub target_beneficiaries: Option<String>,
    pub eiu_partner_id: Option<DbId>,
}

/// Listing filters. Role scoping is applied by the caller via
/// `implementing_office_id` / `eiu_partner_id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectQuery {
    pub status: Option<ProjectStatus>,
    pub category: Option<ProjectCategory>,
    pub workflow_status: Option<WorkflowStatus>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(skip)]
    pub implementing_office_id: Option<DbId>,
    #[serde(skip)]
    pub eiu_partner_id: Option<DbId>,
}

/// Cached progress columns written after a recompute.
#[derive(Debug, Clone, Copy)]
pub struct ProgressCache {
    pub timeline: f64,
    pub budget: f64,
    pub physical: f64,
    pub overall: f64,
}

/// Portfolio counters for one dashboard scope.
#[derive(Debug, Clone, Default, FromRow, Serialize)]
pub struct DashboardStats {
    pub total: i64,
    pub pending: i64,
    pub ongoing: i64,
    pub delayed: i64,
    pub complete: i64,
    /// Mean cached overall progress, two decimals.
    pub average_progress: f64,
    /// Updates on these projects waiting at the caller's review gate.
    pub awaiting_review: i64,
}
