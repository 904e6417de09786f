//! Repository for the `notifications` table.
//!
//! Every read and write after insert is keyed on `(id, user_id)`: a user
//! can only ever see or touch their own rows.

use buildwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::notification::{CreateNotification, Notification, NotificationQuery};

const COLUMNS: &str = "id, user_id, title, message, notification_type, category, entity_type, \
    entity_id, priority, is_read, read_at, action_url, metadata, created_at, updated_at";

pub struct NotificationRepo;

impl NotificationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateNotification,
    ) -> Result<Notification, sqlx::Error> {
        let query = format!(
            "INSERT INTO notifications (user_id, title, message, notification_type, category,
                                        entity_type, entity_id, priority, action_url, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(input.user_id)
            .bind(&input.title)
            .bind(&input.message)
            .bind(input.notification_type.as_str())
            .bind(input.category.as_str())
            .bind(&input.entity_type)
            .bind(input.entity_id)
            .bind(input.priority.as_str())
            .bind(&input.action_url)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    /// Newest first. Unset filters match everything.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        filter: &NotificationQuery,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notifications
             WHERE user_id = $1
               AND (NOT $2 OR is_read = false)
               AND ($3::TEXT IS NULL OR category = $3)
               AND ($4::TEXT IS NULL OR priority = $4)
             ORDER BY created_at DESC, id DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Notification>(&query)
            .bind(user_id)
            .bind(filter.unread_only)
            .bind(filter.category.map(|c| c.as_str()))
            .bind(filter.priority.map(|p| p.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// `false` when the row is missing, someone else's, or already read.
    pub async fn mark_read(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true, read_at = NOW()
             WHERE id = $1 AND user_id = $2 AND NOT is_read",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Returns how many rows flipped to read.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        sqlx::query(
            "UPDATE notifications SET is_read = true, read_at = NOW()
             WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(pool)
        .await
        .map(|result| result.rows_affected())
    }

    /// `(total unread, unread at High or Critical priority)`.
    pub async fn unread_counts(pool: &PgPool, user_id: DbId) -> Result<(i64, i64), sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE priority IN ('High', 'Critical'))
             FROM notifications
             WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        sqlx::query("DELETE FROM notifications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await
            .map(|result| result.rows_affected() == 1)
    }
}
