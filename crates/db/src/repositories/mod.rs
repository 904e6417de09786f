//! Repository layer: one zero-sized struct per table, each method taking the
//! pool explicitly.

pub mod activity_log_repo;
pub mod communication_repo;
pub mod field_activity_repo;
pub mod milestone_repo;
pub mod notification_repo;
pub mod policy_repo;
pub mod project_repo;
pub mod project_update_repo;
pub mod role_repo;
pub mod rpmes_form_repo;
pub mod session_repo;
pub mod template_repo;
pub mod update_file_repo;
pub mod user_repo;

pub use activity_log_repo::ActivityLogRepo;
pub use communication_repo::CommunicationRepo;
pub use field_activity_repo::FieldActivityRepo;
pub use milestone_repo::MilestoneRepo;
pub use notification_repo::NotificationRepo;
pub use policy_repo::PolicyRepo;
pub use project_repo::ProjectRepo;
pub use project_update_repo::ProjectUpdateRepo;
pub use role_repo::RoleRepo;
pub use rpmes_form_repo::RpmesFormRepo;
pub use session_repo::SessionRepo;
pub use template_repo::TemplateRepo;
pub use update_file_repo::UpdateFileRepo;
pub use user_repo::UserRepo;
