//! Route definitions for `/milestones`.

use axum::routing::put;
use axum::Router;

use crate::handlers::milestones;
use crate::state::AppState;

/// Routes mounted at `/milestones`.
///
/// ```text
/// PUT    /{id}   -> update_milestone
/// DELETE /{id}   -> delete_milestone
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        put(milestones::update_milestone).delete(milestones::delete_milestone),
    )
}
