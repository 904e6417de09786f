//! Route definitions for `/users`.
//!
//! Everything except `/role/{role}` is for system administrators; the
//! extractors in the handlers enforce that.

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// Routes mounted at `/users`.
///
/// ```text
/// GET    /                      -> list_users
/// POST   /                      -> create_user
/// GET    /role/{role}           -> list_by_role (any authenticated user)
/// GET    /{id}                  -> get_user
/// PUT    /{id}                  -> update_user
/// DELETE /{id}                  -> delete_user (soft)
/// PATCH  /{id}/status           -> update_status
/// POST   /{id}/reset-password   -> reset_password
/// PUT    /{id}/restore          -> restore_user
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users).post(users::create_user))
        .route("/role/{role}", get(users::list_by_role))
        .route(
            "/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/{id}/status", patch(users::update_status))
        .route("/{id}/reset-password", post(users::reset_password))
        .route("/{id}/restore", put(users::restore_user))
}
