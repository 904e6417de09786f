//! User entity model and DTOs.

use buildwatch_core::types::{DbId, Timestamp};
use buildwatch_core::user::UserStatus;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Full user row joined with its role name.
///
/// Contains the password hash -- NEVER serialize this to API responses directly.
/// Use [`UserResponse`] for external-facing output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role_id: DbId,
    /// Resolved from `roles.name`.
    pub role: String,
    pub sub_role: Option<String>,
    pub department: Option<String>,
    pub contact_number: Option<String>,
    /// Relative to the upload root, e.g. `profile-pictures/profile_picture-…png`.
    pub profile_picture_path: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: UserStatus,
    pub last_login_at: Option<Timestamp>,
    pub failed_login_count: i32,
    pub locked_until: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Safe user representation for API responses (no password hash).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub role_id: DbId,
    pub sub_role: Option<String>,
    pub department: Option<String>,
    pub contact_number: Option<String>,
    pub profile_picture_url: Option<String>,
    pub status: UserStatus,
    pub last_login_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role.clone(),
            role_id: user.role_id,
            sub_role: user.sub_role.clone(),
            department: user.department.clone(),
            contact_number: user.contact_number.clone(),
            profile_picture_url: user
                .profile_picture_path
                .as_ref()
                .map(|_| format!("/api/v1/profile/picture/{}", user.id)),
            status: user.status,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

/// DTO for creating a new user.
#[derive(Debug)]
pub struct CreateUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub role_id: DbId,
    pub sub_role: Option<String>,
    pub department: Option<String>,
    pub contact_number: Option<String>,
}

/// DTO for updating an existing user.
#[derive(Debug, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role_id: Option<DbId>,
    /// The resulting sub-role; `None` clears it.
    pub sub_role: Option<String>,
    pub department: Option<String>,
    pub contact_number: Option<String>,
}

/// Filters for the admin user listing.
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<String>,
    pub status: Option<UserStatus>,
    pub search: Option<String>,
}
