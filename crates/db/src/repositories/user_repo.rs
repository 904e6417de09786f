//! Repository for the `users` table.
//!
//! Every read joins `roles` so the returned [`User`] carries its role name.

use buildwatch_core::roles::{ROLE_LGU_PMT, SUB_ROLE_MPMEC_SECRETARIAT, SUB_ROLE_SECRETARIAT};
use buildwatch_core::types::{DbId, Timestamp};
use buildwatch_core::user::UserStatus;
use sqlx::PgPool;

use crate::models::user::{CreateUser, UpdateUser, User, UserQuery};

/// Column list over `users u JOIN roles r`.
const COLUMNS: &str = "u.id, u.username, u.email, u.password_hash, u.full_name, u.role_id, \
                        r.name AS role, u.sub_role, u.department, u.contact_number, \
                        u.profile_picture_path, u.status, \
                        u.last_login_at, u.failed_login_count, u.locked_until, u.deleted_at, \
                        u.created_at, u.updated_at";

const FROM: &str = "users u JOIN roles r ON r.id = u.role_id";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a new user, returning the created row.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "WITH u AS (
                INSERT INTO users (username, email, password_hash, full_name, role_id,
                                   sub_role, department, contact_number)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
             )
             SELECT {COLUMNS} FROM u JOIN roles r ON r.id = u.role_id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.email)
            .bind(&input.password_hash)
            .bind(&input.full_name)
            .bind(input.role_id)
            .bind(&input.sub_role)
            .bind(&input.department)
            .bind(&input.contact_number)
            .fetch_one(pool)
            .await
    }

    /// Find a user by ID, including soft-deleted users.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM {FROM} WHERE u.id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a login candidate by username or email.
    pub async fn find_by_login(pool: &PgPool, login: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {FROM}
             WHERE u.username = $1 OR LOWER(u.email) = LOWER($1)
             LIMIT 1"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(login)
            .fetch_optional(pool)
            .await
    }

    /// Admin listing. Deleted users are hidden unless `status=deleted` is
    /// asked for explicitly.
    pub async fn list(pool: &PgPool, params: &UserQuery) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {FROM}
             WHERE ($1::TEXT IS NULL OR r.name = $1)
               AND (($2::TEXT IS NULL AND u.status <> 'deleted') OR u.status = $2)
               AND ($3::TEXT IS NULL
                    OR u.username ILIKE '%' || $3 || '%'
                    OR u.full_name ILIKE '%' || $3 || '%'
                    OR u.email ILIKE '%' || $3 || '%')
             ORDER BY u.created_at DESC"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&params.role)
            .bind(params.status.map(|s| s.as_str()))
            .bind(&params.search)
            .fetch_all(pool)
            .await
    }

    /// Active users holding any of `roles`.
    pub async fn list_active_by_roles(
        pool: &PgPool,
        roles: &[&str],
    ) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {FROM}
             WHERE r.name = ANY($1) AND u.status = 'active'
             ORDER BY u.full_name ASC"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(roles)
            .fetch_all(pool)
            .await
    }

    /// Active Secretariat members (LGU-PMT with a Secretariat sub-role).
    pub async fn list_active_secretariat(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM {FROM}
             WHERE r.name = $1 AND u.sub_role = ANY($2) AND u.status = 'active'
             ORDER BY u.id ASC"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(ROLE_LGU_PMT)
            .bind(&[SUB_ROLE_SECRETARIAT, SUB_ROLE_MPMEC_SECRETARIAT][..])
            .fetch_all(pool)
            .await
    }

    /// Update profile fields. `None` fields are left unchanged, except
    /// `sub_role`, which is always written so it can be cleared.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "WITH u AS (
                UPDATE users SET
                    email = COALESCE($2, email),
                    full_name = COALESCE($3, full_name),
                    role_id = COALESCE($4, role_id),
                    sub_role = $5,
                    department = COALESCE($6, department),
                    contact_number = COALESCE($7, contact_number)
                WHERE id = $1 AND status <> 'deleted'
                RETURNING *
             )
             SELECT {COLUMNS} FROM u JOIN roles r ON r.id = u.role_id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(&input.email)
            .bind(&input.full_name)
            .bind(input.role_id)
            .bind(&input.sub_role)
            .bind(&input.department)
            .bind(&input.contact_number)
            .fetch_optional(pool)
            .await
    }

    /// Set an admin-settable status. Deleted users are left alone.
    ///
    /// Returns `true` if the row was updated.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: UserStatus,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET status = $2, failed_login_count = 0, locked_until = NULL
             WHERE id = $1 AND status <> 'deleted'",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Soft-delete: status `deleted` plus `deleted_at`.
    pub async fn soft_delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET status = 'deleted', deleted_at = NOW()
             WHERE id = $1 AND status <> 'deleted'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bring a soft-deleted user back as `active`.
    pub async fn restore(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET status = 'active', deleted_at = NULL, failed_login_count = 0
             WHERE id = $1 AND status = 'deleted'",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Point the user at a new picture (or none), returning the path it
    /// replaced. `None` means the user does not exist.
    pub async fn set_profile_picture(
        pool: &PgPool,
        id: DbId,
        path: Option<&str>,
    ) -> Result<Option<Option<String>>, sqlx::Error> {
        sqlx::query_scalar::<_, Option<String>>(
            "UPDATE users u SET profile_picture_path = $2
             FROM (SELECT id, profile_picture_path FROM users WHERE id = $1 FOR UPDATE) old
             WHERE u.id = old.id
             RETURNING old.profile_picture_path",
        )
        .bind(id)
        .bind(path)
        .fetch_optional(pool)
        .await
    }

    /// Increment the failed login counter, returning the new count.
    pub async fn increment_failed_login(pool: &PgPool, id: DbId) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "UPDATE users SET failed_login_count = failed_login_count + 1
             WHERE id = $1
             RETURNING failed_login_count",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Lock a user account until the specified timestamp.
    pub async fn lock_account(
        pool: &PgPool,
        id: DbId,
        until: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET locked_until = $2 WHERE id = $1")
            .bind(id)
            .bind(until)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Record a successful login: reset the failure counter, clear any lock
    /// and stamp `last_login_at`.
    pub async fn record_successful_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET
                failed_login_count = 0,
                locked_until = NULL,
                last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn update_password(
        pool: &PgPool,
        id: DbId,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
