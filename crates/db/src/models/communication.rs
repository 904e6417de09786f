//! Internal message model and DTOs.

use buildwatch_core::communication::{
    CommunicationCategory, CommunicationPriority, CommunicationStatus, Mailbox,
};
use buildwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `communications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Communication {
    pub id: DbId,
    pub sender_id: DbId,
    pub recipient_id: DbId,
    pub subject: String,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub category: CommunicationCategory,
    #[sqlx(try_from = "String")]
    pub priority: CommunicationPriority,
    #[sqlx(try_from = "String")]
    pub status: CommunicationStatus,
    pub is_read: bool,
    pub read_at: Option<Timestamp>,
    pub is_important: bool,
    pub parent_message_id: Option<DbId>,
    #[serde(skip_serializing)]
    pub deleted_by_sender: bool,
    #[serde(skip_serializing)]
    pub deleted_by_recipient: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommunication {
    pub recipient_id: DbId,
    pub subject: String,
    pub message: String,
    pub category: Option<CommunicationCategory>,
    pub priority: Option<CommunicationPriority>,
    pub parent_message_id: Option<DbId>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCommunication {
    pub is_important: Option<bool>,
    pub status: Option<CommunicationStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommunicationQuery {
    #[serde(rename = "box")]
    pub mailbox: Option<Mailbox>,
    pub category: Option<CommunicationCategory>,
    pub is_read: Option<bool>,
}

/// Mailbox counters for one user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CommunicationStats {
    pub inbox_total: i64,
    pub unread: i64,
    pub important: i64,
    pub sent_total: i64,
}
