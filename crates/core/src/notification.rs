//! Notification vocabulary.

define_text_enum! {
    NotificationType {
        Info => "Info",
        Success => "Success",
        Warning => "Warning",
        Error => "Error",
        Alert => "Alert",
    }
}

define_text_enum! {
    NotificationCategory {
        Project => "Project",
        Update => "Update",
        Validation => "Validation",
        System => "System",
        Reminder => "Reminder",
        Alert => "Alert",
    }
}

define_text_enum! {
    NotificationPriority {
        Low => "Low",
        Medium => "Medium",
        High => "High",
        Critical => "Critical",
    }
}

/// Entity types referenced by `notifications.entity_type`.
pub mod entity_types {
    pub const PROJECT: &str = "Project";
    pub const PROJECT_UPDATE: &str = "ProjectUpdate";
    pub const MILESTONE: &str = "ProjectMilestone";
    pub const COMMUNICATION: &str = "Communication";
    pub const RPMES_FORM: &str = "RPMESForm";
    pub const EIU_ACTIVITY: &str = "EIUActivity";
    pub const USER: &str = "User";
}

/// Notification priority matching a delay severity.
pub fn priority_for_delay(severity: crate::delay::DelaySeverity) -> NotificationPriority {
    use crate::delay::DelaySeverity;
    match severity {
        DelaySeverity::Low => NotificationPriority::Low,
        DelaySeverity::Medium => NotificationPriority::Medium,
        DelaySeverity::High => NotificationPriority::High,
        DelaySeverity::Critical => NotificationPriority::Critical,
    }
}
