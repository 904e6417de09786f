//! Hourly purge of dead refresh-token sessions.
//!
//! Expired and revoked rows stay for [`RETENTION_DAYS`] so recent logouts and
//! rotations remain visible, then are deleted.

use std::time::Duration;

use buildwatch_db::repositories::SessionRepo;
use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

pub const RETENTION_DAYS: i64 = 30;

const INTERVAL: Duration = Duration::from_secs(60 * 60);

pub async fn run(pool: PgPool, cancel: CancellationToken) {
    tracing::info!(
        retention_days = RETENTION_DAYS,
        interval_secs = INTERVAL.as_secs(),
        "Session cleanup started"
    );
    let mut interval = tokio::time::interval(INTERVAL);

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!("Session cleanup stopping");
                break;
            }
            _ = interval.tick() => purge_once(&pool).await,
        }
    }
}

async fn purge_once(pool: &PgPool) {
    let cutoff = Utc::now() - chrono::Duration::days(RETENTION_DAYS);
    match SessionRepo::purge_dead(pool, cutoff).await {
        Ok(0) => tracing::debug!("Session cleanup: nothing to purge"),
        Ok(deleted) => tracing::info!(deleted, "Session cleanup: purged dead sessions"),
        Err(e) => tracing::error!(error = %e, "Session cleanup failed"),
    }
}
