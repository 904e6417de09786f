//! Route definitions for `/policies`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::policies;
use crate::state::AppState;

/// Routes mounted at `/policies`.
///
/// ```text
/// GET    /               -> list_policies
/// POST   /               -> create_policy (oversight)
/// GET    /{id}           -> get_policy
/// PUT    /{id}           -> update_policy (oversight)
/// DELETE /{id}           -> delete_policy (oversight)
/// POST   /{id}/publish   -> publish_policy (oversight)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(policies::list_policies).post(policies::create_policy),
        )
        .route(
            "/{id}",
            get(policies::get_policy)
                .put(policies::update_policy)
                .delete(policies::delete_policy),
        )
        .route("/{id}/publish", post(policies::publish_policy))
}
