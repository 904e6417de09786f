//! Repository for the `projects` table.
//!
//! Projects are soft-deleted; every read filters `deleted_at IS NULL`.
//! Workflow moves are conditional updates keyed on the expected current
//! `workflow_status`, so a concurrent second move finds no row.

use buildwatch_core::dashboard::DashboardScope;
use buildwatch_core::project::ProjectStatus;
use buildwatch_core::types::DbId;
use buildwatch_core::workflow::{UpdateStatus, WorkflowStatus};
use sqlx::{PgExecutor, PgPool};

use crate::models::project::{
    CreateProject, DashboardStats, ProgressCache, Project, ProjectQuery, UpdateProject,
};

const COLUMNS: &str = "id, project_code, name, description, category, location, priority, \
    funding_source, status, workflow_status, total_budget, start_date, end_date, \
    expected_outputs, target_beneficiaries, implementing_office_id, eiu_partner_id, \
    timeline_progress, budget_progress, physical_progress, overall_progress, \
    automated_progress, last_progress_update, submitted_to_secretariat, \
    submitted_to_secretariat_at, approved_by_secretariat, secretariat_approved_by, \
    secretariat_approved_at, secretariat_comments, approved_by_mpmec, mpmec_approved_by, \
    mpmec_approved_at, deleted_at, created_at, updated_at";

/// Provides CRUD and workflow operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project owned by `implementing_office_id`.
    pub async fn create(
        pool: &PgPool,
        implementing_office_id: DbId,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (project_code, name, description, category, location,
                                   priority, funding_source, total_budget, start_date, end_date,
                                   expected_outputs, target_beneficiaries,
                                   implementing_office_id, eiu_partner_id)
             VALUES ($1, $2, $3, $4, $5,
                     COALESCE($6, 'medium'), COALESCE($7, 'local_fund'), $8, $9, $10,
                     $11, $12, $13, $14)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&input.project_code)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.category.as_str())
            .bind(&input.location)
            .bind(input.priority.map(|p| p.as_str()))
            .bind(input.funding_source.map(|f| f.as_str()))
            .bind(input.total_budget)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(&input.expected_outputs)
            .bind(&input.target_beneficiaries)
            .bind(implementing_office_id)
            .bind(input.eiu_partner_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Filtered, paginated listing, newest first.
    pub async fn list(
        pool: &PgPool,
        params: &ProjectQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE deleted_at IS NULL
               AND ($1::TEXT IS NULL OR status = $1)
               AND ($2::TEXT IS NULL OR category = $2)
               AND ($3::TEXT IS NULL OR workflow_status = $3)
               AND ($4::TEXT IS NULL
                    OR name ILIKE '%' || $4 || '%'
                    OR project_code ILIKE '%' || $4 || '%'
                    OR location ILIKE '%' || $4 || '%')
               AND ($5::BIGINT IS NULL OR implementing_office_id = $5)
               AND ($6::BIGINT IS NULL OR eiu_partner_id = $6)
             ORDER BY created_at DESC, id DESC
             LIMIT $7 OFFSET $8"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(params.status.map(|s| s.as_str()))
            .bind(params.category.map(|c| c.as_str()))
            .bind(params.workflow_status.map(|w| w.as_str()))
            .bind(&params.search)
            .bind(params.implementing_office_id)
            .bind(params.eiu_partner_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Counters over the projects a dashboard scope covers.
    ///
    /// `awaiting_review` counts updates in `review_queue`, or zero without one.
    pub async fn dashboard_stats(
        pool: &PgPool,
        scope: DashboardScope,
        review_queue: Option<UpdateStatus>,
    ) -> Result<DashboardStats, sqlx::Error> {
        sqlx::query_as::<_, DashboardStats>(
            "WITH scoped AS (
                SELECT id, status, overall_progress FROM projects
                WHERE deleted_at IS NULL
                  AND ($1::BIGINT IS NULL OR implementing_office_id = $1)
                  AND ($2::BIGINT IS NULL OR eiu_partner_id = $2)
                  AND (NOT $3 OR approved_by_secretariat)
             )
             SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE status = 'pending') AS pending,
                    COUNT(*) FILTER (WHERE status = 'ongoing') AS ongoing,
                    COUNT(*) FILTER (WHERE status = 'delayed') AS delayed,
                    COUNT(*) FILTER (WHERE status = 'complete') AS complete,
                    COALESCE(ROUND(AVG(overall_progress)::NUMERIC, 2), 0)::DOUBLE PRECISION
                        AS average_progress,
                    (SELECT COUNT(*) FROM project_updates u
                     JOIN scoped s ON s.id = u.project_id
                     WHERE u.status = $4) AS awaiting_review
             FROM scoped",
        )
        .bind(scope.office_id())
        .bind(scope.partner_id())
        .bind(scope.approved_only())
        .bind(review_queue.map(|s| s.as_str()))
        .fetch_one(pool)
        .await
    }

    /// Projects whose delivery status is one of `statuses`.
    pub async fn list_by_statuses(
        pool: &PgPool,
        statuses: &[ProjectStatus],
    ) -> Result<Vec<Project>, sqlx::Error> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM projects
             WHERE deleted_at IS NULL AND status = ANY($1)
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&statuses)
            .fetch_all(pool)
            .await
    }

    /// Update a project. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateProject,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                location = COALESCE($5, location),
                priority = COALESCE($6, priority),
                funding_source = COALESCE($7, funding_source),
                total_budget = COALESCE($8, total_budget),
                start_date = COALESCE($9, start_date),
                end_date = COALESCE($10, end_date),
                expected_outputs = COALESCE($11, expected_outputs),
                target_beneficiaries = COALESCE($12, target_beneficiaries),
                eiu_partner_id = COALESCE($13, eiu_partner_id)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.category.map(|c| c.as_str()))
            .bind(&input.location)
            .bind(input.priority.map(|p| p.as_str()))
            .bind(input.funding_source.map(|f| f.as_str()))
            .bind(input.total_budget)
            .bind(input.start_date)
            .bind(input.end_date)
            .bind(&input.expected_outputs)
            .bind(&input.target_beneficiaries)
            .bind(input.eiu_partner_id)
            .fetch_optional(pool)
            .await
    }

    /// Soft-delete a project. Returns `true` if the row was updated.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: ProjectStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE projects SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Write the progress cache after a recompute.
    pub async fn write_progress(
        executor: impl PgExecutor<'_>,
        id: DbId,
        progress: &ProgressCache,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE projects SET
                timeline_progress = $2,
                budget_progress = $3,
                physical_progress = $4,
                overall_progress = $5,
                automated_progress = true,
                last_progress_update = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(progress.timeline)
        .bind(progress.budget)
        .bind(progress.physical)
        .bind(progress.overall)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Workflow
    // -----------------------------------------------------------------------

    /// Move `draft` to `submitted` and stamp the submission.
    pub async fn submit_to_secretariat(
        pool: &PgPool,
        id: DbId,
        from: WorkflowStatus,
        to: WorkflowStatus,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                workflow_status = $3,
                submitted_to_secretariat = true,
                submitted_to_secretariat_at = NOW()
             WHERE id = $1 AND workflow_status = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Secretariat approval: records the approver and activates the project.
    pub async fn secretariat_approve(
        pool: &PgPool,
        id: DbId,
        from: WorkflowStatus,
        to: WorkflowStatus,
        approver_id: DbId,
        comments: Option<&str>,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                workflow_status = $3,
                approved_by_secretariat = true,
                secretariat_approved_by = $4,
                secretariat_approved_at = NOW(),
                secretariat_comments = COALESCE($5, secretariat_comments),
                status = CASE WHEN status = 'pending' THEN 'ongoing' ELSE status END
             WHERE id = $1 AND workflow_status = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(approver_id)
            .bind(comments)
            .fetch_optional(pool)
            .await
    }

    /// Plain workflow move, optionally recording Secretariat comments.
    pub async fn transition(
        executor: impl PgExecutor<'_>,
        id: DbId,
        from: WorkflowStatus,
        to: WorkflowStatus,
        comments: Option<&str>,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                workflow_status = $3,
                secretariat_comments = COALESCE($4, secretariat_comments)
             WHERE id = $1 AND workflow_status = $2 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(comments)
            .fetch_optional(executor)
            .await
    }

    /// MPMEC sign-off. Requires prior Secretariat approval and applies once.
    pub async fn mpmec_approve(
        pool: &PgPool,
        id: DbId,
        approver_id: DbId,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                approved_by_mpmec = true,
                mpmec_approved_by = $2,
                mpmec_approved_at = NOW()
             WHERE id = $1
               AND approved_by_secretariat = true
               AND approved_by_mpmec = false
               AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(approver_id)
            .fetch_optional(pool)
            .await
    }
}
