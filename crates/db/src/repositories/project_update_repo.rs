//! Repository for the `project_updates` table.
//!
//! Review writes are conditional on the status the gate expects. When two
//! reviewers race, the second `UPDATE` matches no row and returns `None`,
//! which the API reports as a conflict.

use buildwatch_core::types::DbId;
use buildwatch_core::workflow::{ReviewStage, UpdateStatus};
use sqlx::{PgExecutor, PgPool};

use crate::models::project_update::{
    CreateProjectUpdate, CreateProjectUpdateFile, IuReview, ProjectUpdate, ProjectUpdateFile,
    SecretariatReview, UpdateQuery,
};
use crate::repositories::UpdateFileRepo;

const COLUMNS: &str = "id, project_id, milestone_id, update_type, title, description, \
    claimed_progress, adjusted_progress, final_progress, budget_used, remarks, \
    milestone_updates, status, submitted_by, submitted_by_role, submitted_to, submitted_at, \
    iu_reviewer_id, iu_reviewed_at, iu_remarks, secretariat_reviewer_id, \
    secretariat_reviewed_at, secretariat_remarks, created_at, updated_at";

/// Update types whose payload feeds the progress engine.
const MILESTONE_TYPES: &[&str] = &["milestone", "milestone_update"];

/// Provides submission and review operations for progress updates.
pub struct ProjectUpdateRepo;

impl ProjectUpdateRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateProjectUpdate,
    ) -> Result<ProjectUpdate, sqlx::Error> {
        let (update, _) = Self::create_with_files(pool, input, &[]).await?;
        Ok(update)
    }

    /// Insert an update together with its evidence rows in one transaction.
    pub async fn create_with_files(
        pool: &PgPool,
        input: &CreateProjectUpdate,
        files: &[CreateProjectUpdateFile],
    ) -> Result<(ProjectUpdate, Vec<ProjectUpdateFile>), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO project_updates (project_id, milestone_id, update_type, title,
                                          description, claimed_progress, budget_used, remarks,
                                          milestone_updates, submitted_by, submitted_by_role,
                                          submitted_to)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        let update = sqlx::query_as::<_, ProjectUpdate>(&query)
            .bind(input.project_id)
            .bind(input.milestone_id)
            .bind(input.update_type.as_str())
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.claimed_progress)
            .bind(input.budget_used)
            .bind(&input.remarks)
            .bind(&input.milestone_updates)
            .bind(input.submitted_by)
            .bind(&input.submitted_by_role)
            .bind(input.submitted_to)
            .fetch_one(&mut *tx)
            .await?;

        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            stored.push(UpdateFileRepo::create(&mut *tx, update.id, file).await?);
        }

        tx.commit().await?;
        Ok((update, stored))
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ProjectUpdate>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM project_updates WHERE id = $1");
        sqlx::query_as::<_, ProjectUpdate>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A project's updates, newest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
        params: &UpdateQuery,
    ) -> Result<Vec<ProjectUpdate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_updates
             WHERE project_id = $1
               AND ($2::TEXT IS NULL OR status = $2)
               AND ($3::TEXT IS NULL OR update_type = $3)
             ORDER BY submitted_at DESC, id DESC"
        );
        sqlx::query_as::<_, ProjectUpdate>(&query)
            .bind(project_id)
            .bind(params.status.map(|s| s.as_str()))
            .bind(params.update_type.map(|t| t.as_str()))
            .fetch_all(pool)
            .await
    }

    /// Updates for a milestone still waiting on a reviewer.
    pub async fn pending_for_milestone(
        pool: &PgPool,
        milestone_id: DbId,
    ) -> Result<Vec<ProjectUpdate>, sqlx::Error> {
        let pending: Vec<&str> = UpdateStatus::PENDING.iter().map(|s| s.as_str()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM project_updates
             WHERE milestone_id = $1 AND status = ANY($2)
             ORDER BY submitted_at DESC, id DESC"
        );
        sqlx::query_as::<_, ProjectUpdate>(&query)
            .bind(milestone_id)
            .bind(&pending)
            .fetch_all(pool)
            .await
    }

    /// The most recent Secretariat-approved update for a milestone.
    pub async fn latest_approved_for_milestone(
        pool: &PgPool,
        milestone_id: DbId,
    ) -> Result<Option<ProjectUpdate>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_updates
             WHERE milestone_id = $1 AND status = 'secretariat_approved'
             ORDER BY secretariat_reviewed_at DESC NULLS LAST, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ProjectUpdate>(&query)
            .bind(milestone_id)
            .fetch_optional(pool)
            .await
    }

    /// The latest milestone-type update of a project in one of `statuses`.
    pub async fn latest_milestone_update(
        executor: impl PgExecutor<'_>,
        project_id: DbId,
        statuses: &[UpdateStatus],
    ) -> Result<Option<ProjectUpdate>, sqlx::Error> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let query = format!(
            "SELECT {COLUMNS} FROM project_updates
             WHERE project_id = $1 AND update_type = ANY($2) AND status = ANY($3)
             ORDER BY submitted_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ProjectUpdate>(&query)
            .bind(project_id)
            .bind(MILESTONE_TYPES)
            .bind(&statuses)
            .fetch_optional(executor)
            .await
    }

    /// Apply the Implementing Office verdict, conditional on `submitted`.
    pub async fn record_iu_review(
        pool: &PgPool,
        id: DbId,
        review: &IuReview,
    ) -> Result<Option<ProjectUpdate>, sqlx::Error> {
        let query = format!(
            "UPDATE project_updates SET
                status = $3,
                adjusted_progress = $4,
                iu_remarks = $5,
                iu_reviewer_id = $6,
                iu_reviewed_at = NOW()
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectUpdate>(&query)
            .bind(id)
            .bind(UpdateStatus::required_for(ReviewStage::ImplementingOffice).as_str())
            .bind(review.status.as_str())
            .bind(review.adjusted_progress)
            .bind(&review.remarks)
            .bind(review.reviewer_id)
            .fetch_optional(pool)
            .await
    }

    /// Apply the Secretariat verdict, conditional on `iu_approved`.
    pub async fn record_secretariat_review(
        executor: impl PgExecutor<'_>,
        id: DbId,
        review: &SecretariatReview,
    ) -> Result<Option<ProjectUpdate>, sqlx::Error> {
        let query = format!(
            "UPDATE project_updates SET
                status = $3,
                final_progress = $4,
                secretariat_remarks = $5,
                secretariat_reviewer_id = $6,
                secretariat_reviewed_at = NOW(),
                milestone_updates = COALESCE($7, milestone_updates)
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectUpdate>(&query)
            .bind(id)
            .bind(UpdateStatus::required_for(ReviewStage::Secretariat).as_str())
            .bind(review.status.as_str())
            .bind(review.final_progress)
            .bind(&review.remarks)
            .bind(review.reviewer_id)
            .bind(&review.milestone_updates)
            .fetch_optional(executor)
            .await
    }
}
