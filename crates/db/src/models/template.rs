//! Form template model and DTOs.

use buildwatch_core::template::{TemplateCategory, TemplateStatus};
use buildwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Template {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub category: TemplateCategory,
    pub sub_category: Option<String>,
    pub department: Option<String>,
    pub file_type: String,
    pub file_name: String,
    pub original_name: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub file_size: i64,
    pub version: String,
    #[sqlx(try_from = "String")]
    pub status: TemplateStatus,
    pub is_required: bool,
    pub download_count: i32,
    pub uploaded_by: DbId,
    pub approved_by: Option<DbId>,
    pub approved_at: Option<Timestamp>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct CreateTemplate {
    pub name: String,
    pub description: Option<String>,
    pub category: TemplateCategory,
    pub sub_category: Option<String>,
    pub department: Option<String>,
    pub file_type: String,
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub version: String,
    pub is_required: bool,
    pub uploaded_by: DbId,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTemplate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<TemplateCategory>,
    pub sub_category: Option<String>,
    pub department: Option<String>,
    pub version: Option<String>,
    pub status: Option<TemplateStatus>,
    pub is_required: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateQuery {
    pub category: Option<TemplateCategory>,
    pub status: Option<TemplateStatus>,
}
