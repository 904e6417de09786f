//! Route definitions for `/templates`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::templates;
use crate::state::AppState;

/// Routes mounted at `/templates`.
///
/// ```text
/// GET    /                -> list_templates
/// POST   /                -> upload_template (multipart)
/// GET    /{id}            -> get_template
/// PUT    /{id}            -> update_template
/// DELETE /{id}            -> delete_template
/// GET    /{id}/download   -> download_template
/// POST   /{id}/approve    -> approve_template
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(templates::list_templates).post(templates::upload_template),
        )
        .route(
            "/{id}",
            get(templates::get_template)
                .put(templates::update_template)
                .delete(templates::delete_template),
        )
        .route("/{id}/download", get(templates::download_template))
        .route("/{id}/approve", post(templates::approve_template))
}
