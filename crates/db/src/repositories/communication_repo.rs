//! Repository for the `communications` table.
//!
//! Deletion is per side: a sender deleting a message hides it from their
//! sent box only, and likewise for the recipient.

use buildwatch_core::communication::Mailbox;
use buildwatch_core::types::DbId;
use sqlx::PgPool;

use crate::models::communication::{
    Communication, CommunicationQuery, CommunicationStats, CreateCommunication,
    UpdateCommunication,
};

const COLUMNS: &str = "id, sender_id, recipient_id, subject, message, category, priority, \
    status, is_read, read_at, is_important, parent_message_id, deleted_by_sender, \
    deleted_by_recipient, created_at, updated_at";

/// Provides messaging operations between users.
pub struct CommunicationRepo;

impl CommunicationRepo {
    pub async fn create(
        pool: &PgPool,
        sender_id: DbId,
        input: &CreateCommunication,
    ) -> Result<Communication, sqlx::Error> {
        let query = format!(
            "INSERT INTO communications (sender_id, recipient_id, subject, message, category,
                                         priority, parent_message_id)
             VALUES ($1, $2, $3, $4, COALESCE($5, 'general'), COALESCE($6, 'medium'), $7)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Communication>(&query)
            .bind(sender_id)
            .bind(input.recipient_id)
            .bind(&input.subject)
            .bind(&input.message)
            .bind(input.category.map(|c| c.as_str()))
            .bind(input.priority.map(|p| p.as_str()))
            .bind(input.parent_message_id)
            .fetch_one(pool)
            .await
    }

    /// Find a message visible to `user_id` (as sender or recipient).
    pub async fn find_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<Option<Communication>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM communications
             WHERE id = $1
               AND ((sender_id = $2 AND deleted_by_sender = false)
                    OR (recipient_id = $2 AND deleted_by_recipient = false))"
        );
        sqlx::query_as::<_, Communication>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// One mailbox of a user, newest first. Defaults to the inbox.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        params: &CommunicationQuery,
    ) -> Result<Vec<Communication>, sqlx::Error> {
        let side = match params.mailbox.unwrap_or(Mailbox::Inbox) {
            Mailbox::Inbox => "recipient_id = $1 AND deleted_by_recipient = false",
            Mailbox::Sent => "sender_id = $1 AND deleted_by_sender = false",
        };
        let query = format!(
            "SELECT {COLUMNS} FROM communications
             WHERE {side}
               AND ($2::TEXT IS NULL OR category = $2)
               AND ($3::BOOLEAN IS NULL OR is_read = $3)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Communication>(&query)
            .bind(user_id)
            .bind(params.category.map(|c| c.as_str()))
            .bind(params.is_read)
            .fetch_all(pool)
            .await
    }

    /// Mark a message read by its recipient. Returns `true` on the first read.
    pub async fn mark_read(pool: &PgPool, id: DbId, recipient_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE communications SET is_read = true, read_at = NOW(), status = 'read'
             WHERE id = $1 AND recipient_id = $2 AND is_read = false",
        )
        .bind(id)
        .bind(recipient_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCommunication,
    ) -> Result<Option<Communication>, sqlx::Error> {
        let query = format!(
            "UPDATE communications SET
                is_important = COALESCE($2, is_important),
                status = COALESCE($3, status)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Communication>(&query)
            .bind(id)
            .bind(input.is_important)
            .bind(input.status.map(|s| s.as_str()))
            .fetch_optional(pool)
            .await
    }

    /// Hide a message from `user_id`'s side of the conversation.
    pub async fn delete_for_user(
        pool: &PgPool,
        id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE communications SET
                deleted_by_sender = deleted_by_sender OR sender_id = $2,
                deleted_by_recipient = deleted_by_recipient OR recipient_id = $2
             WHERE id = $1 AND (sender_id = $2 OR recipient_id = $2)",
        )
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn stats(pool: &PgPool, user_id: DbId) -> Result<CommunicationStats, sqlx::Error> {
        sqlx::query_as::<_, CommunicationStats>(
            "SELECT
                COUNT(*) FILTER (WHERE recipient_id = $1 AND deleted_by_recipient = false)
                    AS inbox_total,
                COUNT(*) FILTER (WHERE recipient_id = $1 AND deleted_by_recipient = false
                                 AND is_read = false) AS unread,
                COUNT(*) FILTER (WHERE recipient_id = $1 AND deleted_by_recipient = false
                                 AND is_important = true) AS important,
                COUNT(*) FILTER (WHERE sender_id = $1 AND deleted_by_sender = false)
                    AS sent_total
             FROM communications",
        )
        .bind(user_id)
        .fetch_one(pool)
        .await
    }
}
