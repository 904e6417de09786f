//! Route definitions for `/eiu-activities`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::field_activities;
use crate::state::AppState;

/// Routes mounted at `/eiu-activities`.
///
/// ```text
/// GET    /              -> list_office_activities
/// POST   /              -> create_activity
/// GET    /mine          -> list_my_activities
/// GET    /{id}          -> get_activity
/// PUT    /{id}          -> update_activity
/// DELETE /{id}          -> delete_activity
/// POST   /{id}/review   -> review_activity
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(field_activities::list_office_activities).post(field_activities::create_activity),
        )
        .route("/mine", get(field_activities::list_my_activities))
        .route(
            "/{id}",
            get(field_activities::get_activity)
                .put(field_activities::update_activity)
                .delete(field_activities::delete_activity),
        )
        .route("/{id}/review", post(field_activities::review_activity))
}
