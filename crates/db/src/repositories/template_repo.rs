//! Repository for the `templates` table (soft-deleted).

use buildwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::template::{CreateTemplate, Template, TemplateQuery, UpdateTemplate};

const COLUMNS: &str = "id, name, description, category, sub_category, department, file_type, \
    file_name, original_name, file_path, file_size, version, status, is_required, \
    download_count, uploaded_by, approved_by, approved_at, deleted_at, created_at, updated_at";

/// Provides CRUD operations for downloadable form templates.
pub struct TemplateRepo;

impl TemplateRepo {
    pub async fn create(pool: &PgPool, input: &CreateTemplate) -> Result<Template, sqlx::Error> {
        let query = format!(
            "INSERT INTO templates (name, description, category, sub_category, department,
                                    file_type, file_name, original_name, file_path, file_size,
                                    version, is_required, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.category.as_str())
            .bind(&input.sub_category)
            .bind(&input.department)
            .bind(&input.file_type)
            .bind(&input.file_name)
            .bind(&input.original_name)
            .bind(&input.file_path)
            .bind(input.file_size)
            .bind(&input.version)
            .bind(input.is_required)
            .bind(input.uploaded_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Template>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM templates WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list(pool: &PgPool, params: &TemplateQuery) -> Result<Vec<Template>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM templates
             WHERE deleted_at IS NULL
               AND ($1::TEXT IS NULL OR category = $1)
               AND ($2::TEXT IS NULL OR status = $2)
             ORDER BY category ASC, name ASC"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(params.category.map(|c| c.as_str()))
            .bind(params.status.map(|s| s.as_str()))
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateTemplate,
    ) -> Result<Option<Template>, sqlx::Error> {
        let query = format!(
            "UPDATE templates SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                sub_category = COALESCE($5, sub_category),
                department = COALESCE($6, department),
                version = COALESCE($7, version),
                status = COALESCE($8, status),
                is_required = COALESCE($9, is_required)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(input.category.map(|c| c.as_str()))
            .bind(&input.sub_category)
            .bind(&input.department)
            .bind(&input.version)
            .bind(input.status.map(|s| s.as_str()))
            .bind(input.is_required)
            .fetch_optional(pool)
            .await
    }

    /// Activate a template and record the approver.
    pub async fn approve(
        pool: &PgPool,
        id: DbId,
        approver_id: DbId,
    ) -> Result<Option<Template>, sqlx::Error> {
        let query = format!(
            "UPDATE templates SET status = 'active', approved_by = $2, approved_at = NOW()
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Template>(&query)
            .bind(id)
            .bind(approver_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn increment_downloads(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE templates SET download_count = download_count + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE templates SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
