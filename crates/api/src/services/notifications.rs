//! In-app notification fan-out.
//!
//! Workflow handlers build one [`NotificationDraft`] and deliver it to every
//! recipient concurrently. Recipients are de-duplicated; a failed insert is
//! logged and skipped, and a failure never fails the triggering request.

use buildwatch_core::notification::{NotificationCategory, NotificationPriority, NotificationType};
use buildwatch_core::types::DbId;
use buildwatch_db::models::notification::CreateNotification;
use buildwatch_db::repositories::{NotificationRepo, UserRepo};
use buildwatch_db::DbPool;
use futures::future::join_all;
use serde_json::Value;

/// Notification content shared by every recipient.
#[derive(Debug, Clone)]
pub struct NotificationDraft {
    pub title: String,
    pub message: String,
    pub notification_type: NotificationType,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    pub entity_type: Option<&'static str>,
    pub entity_id: Option<DbId>,
    pub action_url: Option<String>,
    pub metadata: Option<Value>,
}

impl NotificationDraft {
    pub fn new(
        category: NotificationCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            notification_type: NotificationType::Info,
            category,
            priority: NotificationPriority::Medium,
            entity_type: None,
            entity_id: None,
            action_url: None,
            metadata: None,
        }
    }

    pub fn kind(mut self, notification_type: NotificationType) -> Self {
        self.notification_type = notification_type;
        self
    }

    pub fn priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn entity(mut self, entity_type: &'static str, entity_id: DbId) -> Self {
        self.entity_type = Some(entity_type);
        self.entity_id = Some(entity_id);
        self
    }

    pub fn action_url(mut self, url: impl Into<String>) -> Self {
        self.action_url = Some(url.into());
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn for_user(&self, user_id: DbId) -> CreateNotification {
        CreateNotification {
            user_id,
            title: self.title.clone(),
            message: self.message.clone(),
            notification_type: self.notification_type,
            category: self.category,
            entity_type: self.entity_type.map(str::to_string),
            entity_id: self.entity_id,
            priority: self.priority,
            action_url: self.action_url.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Sorted, de-duplicated recipient list.
pub fn unique_recipients(recipients: impl IntoIterator<Item = DbId>) -> Vec<DbId> {
    let mut ids: Vec<DbId> = recipients.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Deliver `draft` to each recipient. Returns how many rows were written.
pub async fn notify_users(
    pool: &DbPool,
    recipients: impl IntoIterator<Item = DbId>,
    draft: &NotificationDraft,
) -> usize {
    let recipients = unique_recipients(recipients);
    let inserts = recipients.iter().map(|&user_id| {
        let row = draft.for_user(user_id);
        async move { (user_id, NotificationRepo::create(pool, &row).await) }
    });

    let mut delivered = 0;
    for (user_id, result) in join_all(inserts).await {
        match result {
            Ok(_) => delivered += 1,
            Err(e) => tracing::warn!(
                user_id,
                title = %draft.title,
                error = %e,
                "Failed to create notification"
            ),
        }
    }
    tracing::debug!(delivered, title = %draft.title, "Notifications delivered");
    delivered
}

/// Deliver to every active Secretariat user.
pub async fn notify_secretariat(pool: &DbPool, draft: &NotificationDraft) -> usize {
    match UserRepo::list_active_secretariat(pool).await {
        Ok(users) => notify_users(pool, users.iter().map(|u| u.id), draft).await,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load Secretariat recipients");
            0
        }
    }
}

/// Deliver to every active user holding one of `roles`.
pub async fn notify_roles(pool: &DbPool, roles: &[&str], draft: &NotificationDraft) -> usize {
    match UserRepo::list_active_by_roles(pool, roles).await {
        Ok(users) => notify_users(pool, users.iter().map(|u| u.id), draft).await,
        Err(e) => {
            tracing::warn!(error = %e, ?roles, "Failed to load role recipients");
            0
        }
    }
}
