//! Repository for the `policies` table (soft-deleted).

use buildwatch_core::policy::PolicyStatus;
use buildwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::policy::{CreatePolicy, Policy, PolicyQuery, UpdatePolicy};

const COLUMNS: &str = "id, title, description, content, document_type, category, status, \
    version, effective_date, expiry_date, tags, view_count, created_by, approved_by, \
    approved_at, deleted_at, created_at, updated_at";

/// Provides CRUD operations for policy documents.
pub struct PolicyRepo;

impl PolicyRepo {
    pub async fn create(
        pool: &PgPool,
        created_by: DbId,
        input: &CreatePolicy,
    ) -> Result<Policy, sqlx::Error> {
        let query = format!(
            "INSERT INTO policies (title, description, content, document_type, category,
                                   version, effective_date, expiry_date, tags, created_by)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, '1.0'), $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Policy>(&query)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.content)
            .bind(input.document_type.as_str())
            .bind(input.category.as_str())
            .bind(&input.version)
            .bind(input.effective_date)
            .bind(input.expiry_date)
            .bind(&input.tags)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Policy>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM policies WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, Policy>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch a policy and count the view in one statement.
    pub async fn view(pool: &PgPool, id: DbId) -> Result<Option<Policy>, sqlx::Error> {
        let query = format!(
            "UPDATE policies SET view_count = view_count + 1
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Policy>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Listing with optional filters. `search` matches title, description
    /// and tags.
    pub async fn list(pool: &PgPool, params: &PolicyQuery) -> Result<Vec<Policy>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM policies
             WHERE deleted_at IS NULL
               AND ($1::TEXT IS NULL OR category = $1)
               AND ($2::TEXT IS NULL OR status = $2)
               AND ($3::TEXT IS NULL
                    OR title ILIKE '%' || $3 || '%'
                    OR description ILIKE '%' || $3 || '%'
                    OR $3 = ANY(tags))
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Policy>(&query)
            .bind(params.category.map(|c| c.as_str()))
            .bind(params.status.map(|s| s.as_str()))
            .bind(&params.search)
            .fetch_all(pool)
            .await
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdatePolicy,
    ) -> Result<Option<Policy>, sqlx::Error> {
        let query = format!(
            "UPDATE policies SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                content = COALESCE($4, content),
                document_type = COALESCE($5, document_type),
                category = COALESCE($6, category),
                status = COALESCE($7, status),
                version = COALESCE($8, version),
                effective_date = COALESCE($9, effective_date),
                expiry_date = COALESCE($10, expiry_date),
                tags = COALESCE($11, tags)
             WHERE id = $1 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Policy>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(&input.content)
            .bind(input.document_type.map(|d| d.as_str()))
            .bind(input.category.map(|c| c.as_str()))
            .bind(input.status.map(|s| s.as_str()))
            .bind(&input.version)
            .bind(input.effective_date)
            .bind(input.expiry_date)
            .bind(&input.tags)
            .fetch_optional(pool)
            .await
    }

    /// Publish a policy currently in `from`, recording the approver. `None`
    /// when the row moved on concurrently.
    pub async fn publish(
        pool: &PgPool,
        id: DbId,
        from: PolicyStatus,
        approver_id: DbId,
    ) -> Result<Option<Policy>, sqlx::Error> {
        let query = format!(
            "UPDATE policies SET
                status = 'published',
                approved_by = $2,
                approved_at = NOW()
             WHERE id = $1 AND status = $3 AND deleted_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Policy>(&query)
            .bind(id)
            .bind(approver_id)
            .bind(from.as_str())
            .fetch_optional(pool)
            .await
    }

    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE policies SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
