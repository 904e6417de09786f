//! Route definitions for `/projects`, including the nested milestone
//! collection.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{milestones, projects};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// GET    /                                -> list_projects
/// POST   /                                -> create_project
/// POST   /delay-check                     -> check_all_delays (oversight)
/// GET    /dashboard/stats                 -> dashboard_stats
/// GET    /{id}                            -> get_project
/// PUT    /{id}                            -> update_project
/// DELETE /{id}                            -> delete_project
///
/// POST   /{id}/submit-to-secretariat      -> submit_to_secretariat
/// POST   /{id}/secretariat-approve        -> secretariat_approve
/// POST   /{id}/secretariat-reject         -> secretariat_reject
/// POST   /{id}/compile-and-submit         -> compile_and_submit
/// POST   /{id}/validate-compiled          -> validate_compiled
/// POST   /{id}/mpmec-approve              -> mpmec_approve
///
/// GET    /{id}/progress                   -> get_progress
/// GET    /{id}/activity                   -> get_activity
/// GET    /{id}/export                     -> export_project (.xlsx)
/// POST   /{id}/delay-check                -> check_project_delay
///
/// GET    /{id}/milestones                 -> list_milestones
/// POST   /{id}/milestones                 -> create_milestone
/// GET    /{id}/milestones/weights         -> get_weights
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(projects::list_projects).post(projects::create_project))
        .route("/delay-check", post(projects::check_all_delays))
        .route("/dashboard/stats", get(projects::dashboard_stats))
        .route(
            "/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        // Workflow
        .route(
            "/{id}/submit-to-secretariat",
            post(projects::submit_to_secretariat),
        )
        .route("/{id}/secretariat-approve", post(projects::secretariat_approve))
        .route("/{id}/secretariat-reject", post(projects::secretariat_reject))
        .route("/{id}/compile-and-submit", post(projects::compile_and_submit))
        .route("/{id}/validate-compiled", post(projects::validate_compiled))
        .route("/{id}/mpmec-approve", post(projects::mpmec_approve))
        // Reporting
        .route("/{id}/progress", get(projects::get_progress))
        .route("/{id}/activity", get(projects::get_activity))
        .route("/{id}/export", get(projects::export_project))
        .route("/{id}/delay-check", post(projects::check_project_delay))
        // Milestones
        .route(
            "/{id}/milestones",
            get(milestones::list_milestones).post(milestones::create_milestone),
        )
        .route("/{id}/milestones/weights", get(milestones::get_weights))
}
