//! Repository for the `project_update_files` table.

use buildwatch_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::project_update::{CreateProjectUpdateFile, ProjectUpdateFile};

const COLUMNS: &str = "id, project_update_id, file_name, original_name, file_path, file_size, \
    mime_type, file_type, sha256, uploaded_by, created_at, updated_at";

/// Evidence files attached to a progress update.
pub struct UpdateFileRepo;

impl UpdateFileRepo {
    pub async fn create(
        executor: impl PgExecutor<'_>,
        project_update_id: DbId,
        input: &CreateProjectUpdateFile,
    ) -> Result<ProjectUpdateFile, sqlx::Error> {
        let query = format!(
            "INSERT INTO project_update_files (project_update_id, file_name, original_name,
                                               file_path, file_size, mime_type, file_type,
                                               sha256, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectUpdateFile>(&query)
            .bind(project_update_id)
            .bind(&input.file_name)
            .bind(&input.original_name)
            .bind(&input.file_path)
            .bind(input.file_size)
            .bind(&input.mime_type)
            .bind(input.file_type.as_str())
            .bind(&input.sha256)
            .bind(input.uploaded_by)
            .fetch_one(executor)
            .await
    }

    pub async fn list_by_update(
        pool: &PgPool,
        project_update_id: DbId,
    ) -> Result<Vec<ProjectUpdateFile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_update_files
             WHERE project_update_id = $1
             ORDER BY id ASC"
        );
        sqlx::query_as::<_, ProjectUpdateFile>(&query)
            .bind(project_update_id)
            .fetch_all(pool)
            .await
    }
}
