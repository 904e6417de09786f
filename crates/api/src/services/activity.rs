//! Activity log writer.
//!
//! Handlers describe what happened with an [`ActivityEntry`] and hand it to
//! [`record`]. Metadata is redacted before it is stored, and a failed insert
//! is logged and swallowed so it never fails the request being logged.

use buildwatch_core::activity::{
    action_to_module, default_level, redact_sensitive_fields, ActivityLevel, ActivityStatus,
};
use buildwatch_core::types::DbId;
use buildwatch_db::models::activity_log::CreateActivityLog;
use buildwatch_db::repositories::ActivityLogRepo;
use buildwatch_db::DbPool;
use serde_json::Value;

use crate::middleware::auth::AuthUser;

/// One activity log row, before the actor is attached.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub action: &'static str,
    pub entity_type: Option<&'static str>,
    pub entity_id: Option<DbId>,
    pub details: Option<String>,
    pub level: ActivityLevel,
    pub status: ActivityStatus,
    pub metadata: Option<Value>,
}

impl ActivityEntry {
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            entity_type: None,
            entity_id: None,
            details: None,
            level: default_level(action),
            status: ActivityStatus::Success,
            metadata: None,
        }
    }

    pub fn entity(mut self, entity_type: &'static str, entity_id: DbId) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(entity_id);
        self
    }

    pub fn details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn failed(mut self) -> Self {
        self.status = ActivityStatus::Failed;
        self
    }

    pub fn level(mut self, level: ActivityLevel) -> Self {
        self.level = level;
        self
    }

    fn into_row(
        self,
        user_id: Option<DbId>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> CreateActivityLog {
        CreateActivityLog {
            user_id,
            action: self.action.to_string(),
            entity_type: self.entity_type.map(str::to_string),
            entity_id: self.entity_id,
            details: self.details,
            ip_address,
            user_agent,
            level: self.level,
            module: action_to_module(self.action).to_string(),
            status: self.status,
            metadata: self.metadata.as_ref().map(redact_sensitive_fields),
        }
    }
}

/// Record an action performed by an authenticated user.
pub async fn record(pool: &DbPool, actor: &AuthUser, entry: ActivityEntry) {
    let row = entry.into_row(
        Some(actor.user_id),
        actor.ip_address.clone(),
        actor.user_agent.clone(),
    );
    insert(pool, row).await;
}

/// Record an action with no token behind it (login attempts).
pub async fn record_anonymous(
    pool: &DbPool,
    user_id: Option<DbId>,
    ip_address: Option<String>,
    user_agent: Option<String>,
    entry: ActivityEntry,
) {
    insert(pool, entry.into_row(user_id, ip_address, user_agent)).await;
}

async fn insert(pool: &DbPool, row: CreateActivityLog) {
    if let Err(e) = ActivityLogRepo::create(pool, &row).await {
        tracing::warn!(action = %row.action, error = %e, "Failed to write activity log");
    }
}
