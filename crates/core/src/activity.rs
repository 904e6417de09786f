//! Activity log vocabulary and metadata redaction.
//!
//! Every state-changing handler records one `activity_logs` row. The action
//! names below are the stable values stored in `activity_logs.action`.

// ---------------------------------------------------------------------------
// Action constants
// ---------------------------------------------------------------------------

pub mod actions {
    pub const LOGIN: &str = "LOGIN";
    pub const FAILED_LOGIN: &str = "FAILED_LOGIN";
    pub const LOGOUT: &str = "LOGOUT";
    pub const CHANGE_PASSWORD: &str = "CHANGE_PASSWORD";

    pub const CREATE_USER: &str = "CREATE_USER";
    pub const UPDATE_USER: &str = "UPDATE_USER";
    pub const UPDATE_USER_STATUS: &str = "UPDATE_USER_STATUS";
    pub const RESET_USER_PASSWORD: &str = "RESET_USER_PASSWORD";
    pub const SOFT_DELETE_USER: &str = "SOFT_DELETE_USER";
    pub const RESTORE_USER: &str = "RESTORE_USER";

    pub const CREATE_PROJECT: &str = "CREATE_PROJECT";
    pub const UPDATE_PROJECT: &str = "UPDATE_PROJECT";
    pub const DELETE_PROJECT: &str = "DELETE_PROJECT";
    pub const SUBMIT_PROJECT_TO_SECRETARIAT: &str = "SUBMIT_PROJECT_TO_SECRETARIAT";
    pub const SECRETARIAT_APPROVE_PROJECT: &str = "SECRETARIAT_APPROVE_PROJECT";
    pub const SECRETARIAT_REJECT_PROJECT: &str = "SECRETARIAT_REJECT_PROJECT";
    pub const COMPILE_AND_SUBMIT_TO_SECRETARIAT: &str = "COMPILE_AND_SUBMIT_TO_SECRETARIAT";
    pub const VALIDATE_COMPILED_REPORT: &str = "VALIDATE_COMPILED_REPORT";
    pub const MPMEC_APPROVE_PROJECT: &str = "MPMEC_APPROVE_PROJECT";
    pub const EXPORT_PROJECT: &str = "EXPORT_PROJECT";
    pub const DELAY_CHECK: &str = "DELAY_CHECK";

    pub const CREATE_MILESTONE: &str = "CREATE_MILESTONE";
    pub const UPDATE_MILESTONE: &str = "UPDATE_MILESTONE";
    pub const DELETE_MILESTONE: &str = "DELETE_MILESTONE";

    pub const SUBMIT_PROJECT_UPDATE: &str = "SUBMIT_PROJECT_UPDATE";
    pub const APPROVE_PROJECT_UPDATE: &str = "APPROVE_PROJECT_UPDATE";
    pub const REJECT_PROJECT_UPDATE: &str = "REJECT_PROJECT_UPDATE";

    pub const CREATE_POLICY: &str = "CREATE_POLICY";
    pub const UPDATE_POLICY: &str = "UPDATE_POLICY";
    pub const DELETE_POLICY: &str = "DELETE_POLICY";
    pub const PUBLISH_POLICY: &str = "PUBLISH_POLICY";

    pub const SEND_COMMUNICATION: &str = "SEND_COMMUNICATION";
    pub const DELETE_COMMUNICATION: &str = "DELETE_COMMUNICATION";

    pub const UPLOAD_TEMPLATE: &str = "UPLOAD_TEMPLATE";
    pub const UPDATE_TEMPLATE: &str = "UPDATE_TEMPLATE";
    pub const DELETE_TEMPLATE: &str = "DELETE_TEMPLATE";
    pub const APPROVE_TEMPLATE: &str = "APPROVE_TEMPLATE";
    pub const DOWNLOAD_TEMPLATE: &str = "DOWNLOAD_TEMPLATE";

    pub const CREATE_RPMES_FORM: &str = "CREATE_RPMES_FORM";
    pub const UPDATE_RPMES_FORM: &str = "UPDATE_RPMES_FORM";
    pub const VALIDATE_RPMES_FORM: &str = "VALIDATE_RPMES_FORM";
    pub const DELETE_RPMES_FORM: &str = "DELETE_RPMES_FORM";
    pub const EXPORT_RPMES_FORMS: &str = "EXPORT_RPMES_FORMS";

    pub const CREATE_EIU_ACTIVITY: &str = "CREATE_EIU_ACTIVITY";
    pub const UPDATE_EIU_ACTIVITY: &str = "UPDATE_EIU_ACTIVITY";
    pub const REVIEW_EIU_ACTIVITY: &str = "REVIEW_EIU_ACTIVITY";
    pub const DELETE_EIU_ACTIVITY: &str = "DELETE_EIU_ACTIVITY";

    pub const UPDATE_PROFILE_PICTURE: &str = "UPDATE_PROFILE_PICTURE";
    pub const REMOVE_PROFILE_PICTURE: &str = "REMOVE_PROFILE_PICTURE";
}

// ---------------------------------------------------------------------------
// Modules
// ---------------------------------------------------------------------------

/// Values of `activity_logs.module`.
pub mod modules {
    pub const AUTH: &str = "auth";
    pub const USERS: &str = "users";
    pub const PROJECTS: &str = "projects";
    pub const UPDATES: &str = "project_updates";
    pub const POLICIES: &str = "policies";
    pub const COMMUNICATIONS: &str = "communications";
    pub const TEMPLATES: &str = "templates";
    pub const RPMES: &str = "rpmes";
    pub const EIU_ACTIVITIES: &str = "eiu_activities";
    pub const SYSTEM: &str = "system";
}

/// Module an action is filed under. Unknown actions go to `system`.
pub fn action_to_module(action: &str) -> &'static str {
    match action {
        actions::LOGIN | actions::FAILED_LOGIN | actions::LOGOUT | actions::CHANGE_PASSWORD => {
            modules::AUTH
        }
        a if a.ends_with("_USER")
            || a == actions::UPDATE_USER_STATUS
            || a == actions::RESET_USER_PASSWORD
            || a.contains("PROFILE_PICTURE") =>
        {
            modules::USERS
        }
        a if a.contains("EIU_ACTIVITY") => modules::EIU_ACTIVITIES,
        a if a.contains("PROJECT_UPDATE") => modules::UPDATES,
        a if a.contains("PROJECT")
            || a.contains("MILESTONE")
            || a.contains("SECRETARIAT")
            || a.contains("COMPILED")
            || a == actions::DELAY_CHECK =>
        {
            modules::PROJECTS
        }
        a if a.contains("POLICY") => modules::POLICIES,
        a if a.contains("COMMUNICATION") => modules::COMMUNICATIONS,
        a if a.contains("TEMPLATE") => modules::TEMPLATES,
        a if a.contains("RPMES") => modules::RPMES,
        _ => modules::SYSTEM,
    }
}

define_text_enum! {
    ActivityLevel {
        Info => "Info",
        Warning => "Warning",
        Error => "Error",
        Critical => "Critical",
    }
}

define_text_enum! {
    ActivityStatus {
        Success => "Success",
        Failed => "Failed",
        Pending => "Pending",
    }
}

/// Default level for an action: failed logins warn, deletions of people warn.
pub fn default_level(action: &str) -> ActivityLevel {
    match action {
        actions::FAILED_LOGIN | actions::SOFT_DELETE_USER => ActivityLevel::Warning,
        _ => ActivityLevel::Info,
    }
}

// ---------------------------------------------------------------------------
// Sensitive field redaction
// ---------------------------------------------------------------------------

/// Key fragments whose values never reach `activity_logs.metadata`.
pub const SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "token",
    "secret",
    "authorization",
    "credential",
];

/// Redact sensitive keys at any depth, replacing their values with
/// `"[REDACTED]"`. Matching is a case-insensitive substring test.
pub fn redact_sensitive_fields(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut redacted = serde_json::Map::new();
            for (key, val) in map {
                let lower_key = key.to_lowercase();
                if SENSITIVE_FIELDS.iter().any(|f| lower_key.contains(f)) {
                    redacted.insert(
                        key.clone(),
                        serde_json::Value::String("[REDACTED]".to_string()),
                    );
                } else {
                    redacted.insert(key.clone(), redact_sensitive_fields(val));
                }
            }
            serde_json::Value::Object(redacted)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.iter().map(redact_sensitive_fields).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn auth_actions_map_to_auth() {
        assert_eq!(action_to_module(actions::LOGIN), modules::AUTH);
        assert_eq!(action_to_module(actions::FAILED_LOGIN), modules::AUTH);
        assert_eq!(action_to_module(actions::CHANGE_PASSWORD), modules::AUTH);
    }

    #[test]
    fn user_actions_map_to_users() {
        assert_eq!(action_to_module(actions::CREATE_USER), modules::USERS);
        assert_eq!(action_to_module(actions::UPDATE_USER_STATUS), modules::USERS);
        assert_eq!(action_to_module(actions::RESET_USER_PASSWORD), modules::USERS);
        assert_eq!(action_to_module(actions::RESTORE_USER), modules::USERS);
    }

    #[test]
    fn update_actions_are_not_project_actions() {
        assert_eq!(action_to_module(actions::APPROVE_PROJECT_UPDATE), modules::UPDATES);
        assert_eq!(action_to_module(actions::SUBMIT_PROJECT_UPDATE), modules::UPDATES);
        assert_eq!(action_to_module(actions::CREATE_PROJECT), modules::PROJECTS);
        assert_eq!(action_to_module(actions::COMPILE_AND_SUBMIT_TO_SECRETARIAT), modules::PROJECTS);
        assert_eq!(action_to_module(actions::VALIDATE_COMPILED_REPORT), modules::PROJECTS);
        assert_eq!(action_to_module(actions::DELETE_MILESTONE), modules::PROJECTS);
        assert_eq!(action_to_module(actions::DELAY_CHECK), modules::PROJECTS);
    }

    #[test]
    fn peripheral_actions() {
        assert_eq!(action_to_module(actions::PUBLISH_POLICY), modules::POLICIES);
        assert_eq!(action_to_module(actions::SEND_COMMUNICATION), modules::COMMUNICATIONS);
        assert_eq!(action_to_module(actions::DOWNLOAD_TEMPLATE), modules::TEMPLATES);
        assert_eq!(action_to_module(actions::VALIDATE_RPMES_FORM), modules::RPMES);
        assert_eq!(action_to_module(actions::EXPORT_RPMES_FORMS), modules::RPMES);
        assert_eq!(action_to_module(actions::REVIEW_EIU_ACTIVITY), modules::EIU_ACTIVITIES);
        assert_eq!(action_to_module(actions::UPDATE_PROFILE_PICTURE), modules::USERS);
        assert_eq!(action_to_module("SOMETHING_ELSE"), modules::SYSTEM);
    }

    #[test]
    fn levels() {
        assert_eq!(default_level(actions::FAILED_LOGIN), ActivityLevel::Warning);
        assert_eq!(default_level(actions::CREATE_PROJECT), ActivityLevel::Info);
        assert_eq!(ActivityStatus::parse("Failed").unwrap(), ActivityStatus::Failed);
    }

    #[test]
    fn redacts_nested_keys() {
        let input = json!({
            "username": "jdoe",
            "new_password": "hunter22",
            "nested": {"refresh_token": "abc", "keep": 1},
            "list": [{"Authorization": "Bearer x"}]
        });
        let out = redact_sensitive_fields(&input);
        assert_eq!(out["username"], "jdoe");
        assert_eq!(out["new_password"], "[REDACTED]");
        assert_eq!(out["nested"]["refresh_token"], "[REDACTED]");
        assert_eq!(out["nested"]["keep"], 1);
        assert_eq!(out["list"][0]["Authorization"], "[REDACTED]");
    }

    #[test]
    fn scalars_pass_through() {
        assert_eq!(redact_sensitive_fields(&json!("password")), json!("password"));
        assert_eq!(redact_sensitive_fields(&json!(null)), json!(null));
    }
}
