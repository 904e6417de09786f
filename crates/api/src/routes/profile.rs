//! Route definitions for `/profile`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::profile;
use crate::state::AppState;

/// Routes mounted at `/profile`.
///
/// ```text
/// POST   /picture             -> upload_picture (multipart)
/// DELETE /picture             -> remove_picture
/// GET    /picture/{user_id}   -> get_picture (public)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/picture",
            post(profile::upload_picture).delete(profile::remove_picture),
        )
        .route("/picture/{user_id}", get(profile::get_picture))
}
