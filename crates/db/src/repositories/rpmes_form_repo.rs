//! Repository for the `rpmes_forms` table.

use buildwatch_core::rpmes::FormStatus;
use buildwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::rpmes_form::{CreateRpmesForm, RpmesForm};

const COLUMNS: &str = "id, project_id, submitted_by, form_type, form_category, reporting_year, \
    reporting_period, form_data, remarks, status, validated_by, validated_at, feedback, \
    export_count, last_exported_at, created_at, updated_at";

/// Provides CRUD and validation operations for RPMES forms.
pub struct RpmesFormRepo;

impl RpmesFormRepo {
    pub async fn create(pool: &PgPool, input: &CreateRpmesForm) -> Result<RpmesForm, sqlx::Error> {
        let query = format!(
            "INSERT INTO rpmes_forms (project_id, submitted_by, form_type, form_category,
                                      reporting_year, reporting_period, form_data, remarks, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RpmesForm>(&query)
            .bind(input.project_id)
            .bind(input.submitted_by)
            .bind(&input.form_type)
            .bind(input.form_category.as_str())
            .bind(input.reporting_year)
            .bind(&input.reporting_period)
            .bind(&input.form_data)
            .bind(&input.remarks)
            .bind(input.status.as_str())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RpmesForm>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM rpmes_forms WHERE id = $1");
        sqlx::query_as::<_, RpmesForm>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A project's forms, by year then form number.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<RpmesForm>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM rpmes_forms
             WHERE project_id = $1
             ORDER BY reporting_year DESC,
                      substring(form_type from '[0-9]+$')::INTEGER ASC,
                      id DESC"
        );
        sqlx::query_as::<_, RpmesForm>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// The newest form of each listed type for a project, in form order.
    ///
    /// Newest means the latest reporting year, then the most recent edit.
    pub async fn latest_of_types(
        pool: &PgPool,
        project_id: DbId,
        form_types: &[String],
    ) -> Result<Vec<RpmesForm>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM (
                SELECT DISTINCT ON (form_type) {COLUMNS} FROM rpmes_forms
                WHERE project_id = $1 AND form_type = ANY($2)
                ORDER BY form_type, reporting_year DESC, updated_at DESC, id DESC
             ) latest
             ORDER BY substring(form_type from '[0-9]+$')::INTEGER"
        );
        sqlx::query_as::<_, RpmesForm>(&query)
            .bind(project_id)
            .bind(form_types)
            .fetch_all(pool)
            .await
    }

    /// Bump the export counter on every listed form.
    pub async fn record_export(pool: &PgPool, ids: &[DbId]) -> Result<u64, sqlx::Error> {
        sqlx::query(
            "UPDATE rpmes_forms SET export_count = export_count + 1, last_exported_at = NOW()
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .execute(pool)
        .await
        .map(|result| result.rows_affected())
    }

    /// Edit a form still in `from` (Draft or Rejected), optionally moving
    /// it to `to`. Editing a rejected form clears the old feedback.
    pub async fn update_content(
        pool: &PgPool,
        id: DbId,
        from: FormStatus,
        to: FormStatus,
        form_data: Option<&serde_json::Value>,
        reporting_period: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<Option<RpmesForm>, sqlx::Error> {
        let query = format!(
            "UPDATE rpmes_forms SET
                form_data = COALESCE($4, form_data),
                reporting_period = COALESCE($5, reporting_period),
                remarks = COALESCE($6, remarks),
                status = $3,
                feedback = CASE WHEN $3 = 'Submitted' THEN NULL ELSE feedback END
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RpmesForm>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(form_data)
            .bind(reporting_period)
            .bind(remarks)
            .fetch_optional(pool)
            .await
    }

    /// Record a validator's verdict on a form currently in `from`.
    pub async fn record_validation(
        pool: &PgPool,
        id: DbId,
        from: FormStatus,
        to: FormStatus,
        validator_id: DbId,
        feedback: Option<&str>,
    ) -> Result<Option<RpmesForm>, sqlx::Error> {
        let query = format!(
            "UPDATE rpmes_forms SET
                status = $3,
                validated_by = $4,
                validated_at = NOW(),
                feedback = $5
             WHERE id = $1 AND status = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RpmesForm>(&query)
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .bind(validator_id)
            .bind(feedback)
            .fetch_optional(pool)
            .await
    }

    /// Delete a draft. Returns `false` when the form is gone or no longer a draft.
    pub async fn delete_draft(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM rpmes_forms WHERE id = $1 AND status = 'Draft'")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
