//! Route definitions for `/rpmes`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::rpmes;
use crate::state::AppState;

/// Routes mounted at `/rpmes`.
///
/// ```text
/// POST   /                        -> create_form
/// GET    /project/{project_id}    -> list_project_forms
/// GET    /{id}                    -> get_form
/// PUT    /{id}                    -> update_form
/// DELETE /{id}                    -> delete_form
/// POST   /{id}/validate           -> validate_form
/// GET    /{id}/export             -> export_form
/// GET    /export/{project_id}/{group} -> export_form_group
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(rpmes::create_form))
        .route("/project/{project_id}", get(rpmes::list_project_forms))
        .route(
            "/{id}",
            get(rpmes::get_form)
                .put(rpmes::update_form)
                .delete(rpmes::delete_form),
        )
        .route("/{id}/validate", post(rpmes::validate_form))
        .route("/{id}/export", get(rpmes::export_form))
        .route("/export/{project_id}/{group}", get(rpmes::export_form_group))
}
