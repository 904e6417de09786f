//! Route definitions for `/communications`.

use axum::routing::get;
use axum::Router;

use crate::handlers::communications;
use crate::state::AppState;

/// Routes mounted at `/communications`.
///
/// ```text
/// GET    /         -> list_communications (?box=inbox|sent)
/// POST   /         -> send_communication
/// GET    /stats    -> get_stats
/// GET    /{id}     -> get_communication (marks read for the recipient)
/// PATCH  /{id}     -> update_communication
/// DELETE /{id}     -> delete_communication
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(communications::list_communications).post(communications::send_communication),
        )
        .route("/stats", get(communications::get_stats))
        .route(
            "/{id}",
            get(communications::get_communication)
                .patch(communications::update_communication)
                .delete(communications::delete_communication),
        )
}
