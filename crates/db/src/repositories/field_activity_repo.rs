//! Repository for the `eiu_activities` table.
//!
//! Office-scoped reads join `projects` so an implementing office only ever
//! sees activities on the projects it owns.

use buildwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::field_activity::{
    CreateFieldActivity, FieldActivity, FieldActivityQuery, FieldActivityReview,
    FieldActivityStats, UpdateFieldActivity,
};

const COLUMNS: &str = "a.id, a.project_id, a.eiu_user_id, a.activity_type, a.title, \
    a.description, a.status, a.priority, a.activity_date, a.location, a.findings, \
    a.recommendations, a.attachments, a.review_status, a.reviewed_by, a.reviewed_at, \
    a.review_comments, a.created_at, a.updated_at";

/// Shared filter over `eiu_activities a`; binds `$2` to `$7`.
const FILTERS: &str = "($2::BIGINT IS NULL OR a.project_id = $2)
               AND ($3::TEXT IS NULL OR a.activity_type = $3)
               AND ($4::TEXT IS NULL OR a.review_status = $4)
               AND ($5::TEXT IS NULL OR a.priority = $5)
               AND ($6::TIMESTAMPTZ IS NULL OR a.activity_date >= $6)
               AND ($7::TIMESTAMPTZ IS NULL OR a.activity_date <= $7)";

pub struct FieldActivityRepo;

impl FieldActivityRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateFieldActivity,
    ) -> Result<FieldActivity, sqlx::Error> {
        let query = format!(
            "INSERT INTO eiu_activities AS a (project_id, eiu_user_id, activity_type, title,
                                              description, priority, activity_date, location,
                                              findings, recommendations, attachments)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW()), $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FieldActivity>(&query)
            .bind(input.project_id)
            .bind(input.eiu_user_id)
            .bind(input.activity_type.as_str())
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.priority.as_str())
            .bind(input.activity_date)
            .bind(&input.location)
            .bind(&input.findings)
            .bind(&input.recommendations)
            .bind(&input.attachments)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<FieldActivity>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM eiu_activities a WHERE a.id = $1");
        sqlx::query_as::<_, FieldActivity>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Activities on projects owned by `office_id`, newest activity first.
    pub async fn list_for_office(
        pool: &PgPool,
        office_id: DbId,
        filter: &FieldActivityQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FieldActivity>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM eiu_activities a
             JOIN projects p ON p.id = a.project_id
             WHERE p.implementing_office_id = $1
               AND {FILTERS}
             ORDER BY a.activity_date DESC, a.id DESC
             LIMIT $8 OFFSET $9"
        );
        bind_filters(sqlx::query_as::<_, FieldActivity>(&query).bind(office_id), filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Activities logged by `eiu_user_id`, newest activity first.
    pub async fn list_for_author(
        pool: &PgPool,
        eiu_user_id: DbId,
        filter: &FieldActivityQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FieldActivity>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM eiu_activities a
             WHERE a.eiu_user_id = $1
               AND {FILTERS}
             ORDER BY a.activity_date DESC, a.id DESC
             LIMIT $8 OFFSET $9"
        );
        bind_filters(sqlx::query_as::<_, FieldActivity>(&query).bind(eiu_user_id), filter)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Counters over every activity on the office's projects.
    pub async fn stats_for_office(
        pool: &PgPool,
        office_id: DbId,
    ) -> Result<FieldActivityStats, sqlx::Error> {
        sqlx::query_as::<_, FieldActivityStats>(
            "SELECT COUNT(*) AS total,
                    COUNT(*) FILTER (WHERE a.activity_date::DATE = CURRENT_DATE) AS today,
                    COUNT(*) FILTER (WHERE a.review_status = 'pending_review') AS pending_review,
                    COUNT(*) FILTER (WHERE a.review_status = 'approved') AS approved
             FROM eiu_activities a
             JOIN projects p ON p.id = a.project_id
             WHERE p.implementing_office_id = $1",
        )
        .bind(office_id)
        .fetch_one(pool)
        .await
    }

    /// Edit an activity its author still may change. Any edit puts the
    /// activity back in front of the reviewer.
    pub async fn update_content(
        pool: &PgPool,
        id: DbId,
        eiu_user_id: DbId,
        input: &UpdateFieldActivity,
    ) -> Result<Option<FieldActivity>, sqlx::Error> {
        let query = format!(
            "UPDATE eiu_activities a SET
                title = COALESCE($3, title),
                description = COALESCE($4, description),
                priority = COALESCE($5, priority),
                location = COALESCE($6, location),
                findings = COALESCE($7, findings),
                recommendations = COALESCE($8, recommendations),
                attachments = COALESCE($9, attachments),
                review_status = 'pending_review',
                status = CASE WHEN review_status = 'requires_revision' THEN 'pending' ELSE status END
             WHERE id = $1 AND eiu_user_id = $2
               AND review_status IN ('pending_review', 'requires_revision')
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FieldActivity>(&query)
            .bind(id)
            .bind(eiu_user_id)
            .bind(&input.title)
            .bind(&input.description)
            .bind(input.priority.map(|p| p.as_str()))
            .bind(&input.location)
            .bind(&input.findings)
            .bind(&input.recommendations)
            .bind(&input.attachments)
            .fetch_optional(pool)
            .await
    }

    /// Record a verdict on an activity still `pending_review`.
    pub async fn record_review(
        pool: &PgPool,
        id: DbId,
        review: &FieldActivityReview,
    ) -> Result<Option<FieldActivity>, sqlx::Error> {
        let query = format!(
            "UPDATE eiu_activities a SET
                review_status = $2,
                status = $3,
                reviewed_by = $4,
                reviewed_at = NOW(),
                review_comments = $5
             WHERE id = $1 AND review_status = 'pending_review'
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, FieldActivity>(&query)
            .bind(id)
            .bind(review.review_status.as_str())
            .bind(review.status.as_str())
            .bind(review.reviewer_id)
            .bind(&review.comments)
            .fetch_optional(pool)
            .await
    }

    /// An author withdrawing an activity nobody has reviewed yet.
    pub async fn delete_unreviewed(
        pool: &PgPool,
        id: DbId,
        eiu_user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query(
            "DELETE FROM eiu_activities
             WHERE id = $1 AND eiu_user_id = $2 AND review_status = 'pending_review'",
        )
        .bind(id)
        .bind(eiu_user_id)
        .execute(pool)
        .await
        .map(|result| result.rows_affected() == 1)
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM eiu_activities WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .map(|result| result.rows_affected() == 1)
    }
}

fn bind_filters<'q>(
    query: sqlx::query::QueryAs<'q, sqlx::Postgres, FieldActivity, sqlx::postgres::PgArguments>,
    filter: &'q FieldActivityQuery,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, FieldActivity, sqlx::postgres::PgArguments> {
    query
        .bind(filter.project_id)
        .bind(filter.activity_type.map(|t| t.as_str()))
        .bind(filter.review_status.map(|s| s.as_str()))
        .bind(filter.priority.map(|p| p.as_str()))
        .bind(filter.from)
        .bind(filter.to)
}
