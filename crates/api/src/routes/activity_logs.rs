//! Route definitions for `/activity-logs`.

use axum::routing::get;
use axum::Router;

use crate::handlers::activity_logs;
use crate::state::AppState;

/// Routes mounted at `/activity-logs`.
///
/// ```text
/// GET    /     -> query_activity_logs (SYS.AD)
/// GET    /me   -> my_activity
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(activity_logs::query_activity_logs))
        .route("/me", get(activity_logs::my_activity))
}
