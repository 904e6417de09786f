//! Policy document model and DTOs.

use buildwatch_core::policy::{PolicyCategory, PolicyDocumentType, PolicyStatus};
use buildwatch_core::types::{Date, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `policies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Policy {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub content: Option<String>,
    #[sqlx(try_from = "String")]
    pub document_type: PolicyDocumentType,
    #[sqlx(try_from = "String")]
    pub category: PolicyCategory,
    #[sqlx(try_from = "String")]
    pub status: PolicyStatus,
    pub version: String,
    pub effective_date: Option<Date>,
    pub expiry_date: Option<Date>,
    pub tags: Vec<String>,
    pub view_count: i32,
    pub created_by: DbId,
    pub approved_by: Option<DbId>,
    pub approved_at: Option<Timestamp>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePolicy {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub content: Option<String>,
    pub document_type: PolicyDocumentType,
    pub category: PolicyCategory,
    pub version: Option<String>,
    pub effective_date: Option<Date>,
    pub expiry_date: Option<Date>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePolicy {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub document_type: Option<PolicyDocumentType>,
    pub category: Option<PolicyCategory>,
    pub status: Option<PolicyStatus>,
    pub version: Option<String>,
    pub effective_date: Option<Date>,
    pub expiry_date: Option<Date>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyQuery {
    pub category: Option<PolicyCategory>,
    pub status: Option<PolicyStatus>,
    pub search: Option<String>,
}
