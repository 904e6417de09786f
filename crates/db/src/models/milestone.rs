//! Project milestone model and DTOs.

use buildwatch_core::milestone::MilestoneStatus;
use buildwatch_core::progress::{DivisionStatus, MilestoneSnapshot};
use buildwatch_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `project_milestones` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Milestone {
    pub id: DbId,
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub weight: f64,
    pub planned_budget: Option<f64>,
    pub due_date: Option<Date>,
    #[sqlx(try_from = "String")]
    pub status: MilestoneStatus,
    pub sort_order: i32,
    pub timeline_weight: f64,
    pub budget_weight: f64,
    pub physical_weight: f64,
    #[sqlx(try_from = "String")]
    pub timeline_status: DivisionStatus,
    #[sqlx(try_from = "String")]
    pub budget_status: DivisionStatus,
    #[sqlx(try_from = "String")]
    pub physical_status: DivisionStatus,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Milestone {
    pub fn snapshot(&self) -> MilestoneSnapshot {
        MilestoneSnapshot {
            id: self.id,
            title: self.title.clone(),
            weight: self.weight,
            due_date: self.due_date,
            status: self.status,
            timeline_weight: self.timeline_weight,
            budget_weight: self.budget_weight,
            physical_weight: self.physical_weight,
            timeline_status: self.timeline_status,
            budget_status: self.budget_status,
            physical_status: self.physical_status,
        }
    }
}

/// Request body for creating a milestone. Division weights default to an
/// even split of `weight`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMilestoneRequest {
    pub title: String,
    pub description: Option<String>,
    pub weight: f64,
    pub planned_budget: Option<f64>,
    pub due_date: Option<Date>,
    pub sort_order: Option<i32>,
    pub timeline_weight: Option<f64>,
    pub budget_weight: Option<f64>,
    pub physical_weight: Option<f64>,
}

/// Validated insert DTO.
#[derive(Debug, Clone)]
pub struct CreateMilestone {
    pub project_id: DbId,
    pub title: String,
    pub description: Option<String>,
    pub weight: f64,
    pub planned_budget: Option<f64>,
    pub due_date: Option<Date>,
    pub sort_order: i32,
    pub timeline_weight: f64,
    pub budget_weight: f64,
    pub physical_weight: f64,
}

/// Request body for updating a milestone. All fields are optional; a new
/// `weight` without division weights re-splits evenly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMilestoneRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub planned_budget: Option<f64>,
    pub due_date: Option<Date>,
    pub sort_order: Option<i32>,
    pub status: Option<MilestoneStatus>,
    pub timeline_weight: Option<f64>,
    pub budget_weight: Option<f64>,
    pub physical_weight: Option<f64>,
}

/// Validated update DTO.
#[derive(Debug, Clone, Default)]
pub struct UpdateMilestone {
    pub title: Option<String>,
    pub description: Option<String>,
    pub weight: Option<f64>,
    pub planned_budget: Option<f64>,
    pub due_date: Option<Date>,
    pub sort_order: Option<i32>,
    pub status: Option<MilestoneStatus>,
    pub timeline_weight: Option<f64>,
    pub budget_weight: Option<f64>,
    pub physical_weight: Option<f64>,
}

/// Per-division verdicts written to a milestone row.
#[derive(Debug, Clone, Copy, Default)]
pub struct DivisionStatuses {
    pub timeline: Option<DivisionStatus>,
    pub budget: Option<DivisionStatus>,
    pub physical: Option<DivisionStatus>,
}
