//! Repository for the `project_milestones` table.

use buildwatch_core::milestone::MilestoneStatus;
use buildwatch_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::milestone::{CreateMilestone, DivisionStatuses, Milestone, UpdateMilestone};

const COLUMNS: &str = "id, project_id, title, description, weight, planned_budget, due_date, \
    status, sort_order, timeline_weight, budget_weight, physical_weight, timeline_status, \
    budget_status, physical_status, completed_at, created_at, updated_at";

/// Provides CRUD operations for milestones.
pub struct MilestoneRepo;

impl MilestoneRepo {
    pub async fn create(pool: &PgPool, input: &CreateMilestone) -> Result<Milestone, sqlx::Error> {
        let query = format!(
            "INSERT INTO project_milestones (project_id, title, description, weight,
                                             planned_budget, due_date, sort_order,
                                             timeline_weight, budget_weight, physical_weight)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Milestone>(&query)
            .bind(input.project_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.weight)
            .bind(input.planned_budget)
            .bind(input.due_date)
            .bind(input.sort_order)
            .bind(input.timeline_weight)
            .bind(input.budget_weight)
            .bind(input.physical_weight)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Milestone>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM project_milestones WHERE id = $1");
        sqlx::query_as::<_, Milestone>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A project's milestones in plan order.
    pub async fn list_by_project(
        executor: impl PgExecutor<'_>,
        project_id: DbId,
    ) -> Result<Vec<Milestone>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_milestones
             WHERE project_id = $1
             ORDER BY sort_order ASC, id ASC"
        );
        sqlx::query_as::<_, Milestone>(&query)
            .bind(project_id)
            .fetch_all(executor)
            .await
    }

    /// Sum of a project's milestone weights, optionally excluding one
    /// milestone (the one being edited).
    pub async fn total_weight(
        pool: &PgPool,
        project_id: DbId,
        exclude_id: Option<DbId>,
    ) -> Result<f64, sqlx::Error> {
        sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(weight), 0)::DOUBLE PRECISION FROM project_milestones
             WHERE project_id = $1 AND ($2::BIGINT IS NULL OR id <> $2)",
        )
        .bind(project_id)
        .bind(exclude_id)
        .fetch_one(pool)
        .await
    }

    /// Update a milestone. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateMilestone,
    ) -> Result<Option<Milestone>, sqlx::Error> {
        let query = format!(
            "UPDATE project_milestones SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                weight = COALESCE($4, weight),
                planned_budget = COALESCE($5, planned_budget),
                due_date = COALESCE($6, due_date),
                sort_order = COALESCE($7, sort_order),
                status = COALESCE($8, status),
                timeline_weight = COALESCE($9, timeline_weight),
                budget_weight = COALESCE($10, budget_weight),
                physical_weight = COALESCE($11, physical_weight),
                completed_at = CASE
                    WHEN $8 = 'completed' AND completed_at IS NULL THEN NOW()
                    WHEN $8 IS NOT NULL AND $8 <> 'completed' THEN NULL
                    ELSE completed_at
                END
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Milestone>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.weight)
            .bind(input.planned_budget)
            .bind(input.due_date)
            .bind(input.sort_order)
            .bind(input.status.map(|s| s.as_str()))
            .bind(input.timeline_weight)
            .bind(input.budget_weight)
            .bind(input.physical_weight)
            .fetch_optional(pool)
            .await
    }

    /// Set a milestone's status, stamping `completed_at` on completion.
    pub async fn set_status(
        executor: impl PgExecutor<'_>,
        id: DbId,
        status: MilestoneStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE project_milestones SET
                status = $2,
                completed_at = CASE WHEN $2 = 'completed' THEN COALESCE(completed_at, NOW()) ELSE NULL END
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write Secretariat division verdicts. `None` leaves a division as is.
    pub async fn set_division_statuses(
        executor: impl PgExecutor<'_>,
        id: DbId,
        statuses: &DivisionStatuses,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE project_milestones SET
                timeline_status = COALESCE($2, timeline_status),
                budget_status = COALESCE($3, budget_status),
                physical_status = COALESCE($4, physical_status)
             WHERE id = $1",
        )
        .bind(id)
        .bind(statuses.timeline.map(|s| s.as_str()))
        .bind(statuses.budget.map(|s| s.as_str()))
        .bind(statuses.physical.map(|s| s.as_str()))
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Mark milestones `delayed`, skipping completed ones. Returns the count.
    pub async fn mark_delayed(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE project_milestones SET status = 'delayed'
             WHERE id = ANY($1) AND status NOT IN ('completed', 'delayed')",
        )
        .bind(ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM project_milestones WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
