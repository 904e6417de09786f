use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::email::Mailer;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheap to clone: the pool and everything else is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub pool: buildwatch_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// SMTP mailer, or the log-only fallback.
    pub mailer: Arc<dyn Mailer>,
}
