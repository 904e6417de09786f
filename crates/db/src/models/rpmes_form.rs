//! RPMES form model and DTOs.

use buildwatch_core::rpmes::{FormCategory, FormStatus};
use buildwatch_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `rpmes_forms` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RpmesForm {
    pub id: DbId,
    pub project_id: DbId,
    pub submitted_by: DbId,
    pub form_type: String,
    #[sqlx(try_from = "String")]
    pub form_category: FormCategory,
    pub reporting_year: i32,
    pub reporting_period: Option<String>,
    pub form_data: serde_json::Value,
    pub remarks: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: FormStatus,
    pub validated_by: Option<DbId>,
    pub validated_at: Option<Timestamp>,
    pub feedback: Option<String>,
    pub export_count: i32,
    pub last_exported_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Request body for creating a form.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRpmesFormRequest {
    pub project_id: DbId,
    pub form_type: String,
    pub reporting_year: i32,
    pub reporting_period: Option<String>,
    pub form_data: serde_json::Value,
    pub remarks: Option<String>,
    /// Submit immediately instead of saving a draft.
    #[serde(default)]
    pub submit: bool,
}

/// Validated insert DTO.
#[derive(Debug, Clone)]
pub struct CreateRpmesForm {
    pub project_id: DbId,
    pub submitted_by: DbId,
    pub form_type: String,
    pub form_category: FormCategory,
    pub reporting_year: i32,
    pub reporting_period: Option<String>,
    pub form_data: serde_json::Value,
    pub remarks: Option<String>,
    pub status: FormStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateRpmesForm {
    pub form_data: Option<serde_json::Value>,
    pub reporting_period: Option<String>,
    pub remarks: Option<String>,
    /// Move a draft (or rejected) form to `Submitted`.
    #[serde(default)]
    pub submit: bool,
}
