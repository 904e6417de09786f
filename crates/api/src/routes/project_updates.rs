//! Route definitions for `/project-updates`.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::project_updates;
use crate::state::AppState;

/// Routes mounted at `/project-updates`.
///
/// ```text
/// POST   /                                       -> submit_update (multipart)
/// GET    /project/{project_id}                   -> list_project_updates
/// GET    /milestone/{milestone_id}/pending-status -> pending_status
/// GET    /{id}                                   -> get_update
/// PUT    /{id}/iu-review                         -> iu_review
/// PUT    /{id}/secretariat-review                -> secretariat_review
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(project_updates::submit_update))
        .route(
            "/project/{project_id}",
            get(project_updates::list_project_updates),
        )
        .route(
            "/milestone/{milestone_id}/pending-status",
            get(project_updates::pending_status),
        )
        .route("/{id}", get(project_updates::get_update))
        .route("/{id}/iu-review", put(project_updates::iu_review))
        .route(
            "/{id}/secretariat-review",
            put(project_updates::secretariat_review),
        )
}
