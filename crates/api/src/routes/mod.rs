pub mod activity_logs;
pub mod auth;
pub mod communications;
pub mod field_activities;
pub mod health;
pub mod milestones;
pub mod notifications;
pub mod policies;
pub mod profile;
pub mod project_updates;
pub mod projects;
pub mod rpmes;
pub mod templates;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/login                                    login (public)
/// /auth/refresh                                  refresh (public)
/// /auth/logout                                   logout
/// /auth/me                                       current user
/// /auth/password                                 change password (PUT)
///
/// /users                                         list, create (SYS.AD)
/// /users/role/{role}                             active users of a role
/// /users/{id}                                    get, update, soft delete
/// /users/{id}/status                             set status (PATCH)
/// /users/{id}/reset-password                     reset password (POST)
/// /users/{id}/restore                            restore (PUT)
///
/// /profile/picture                               upload (multipart), remove
/// /profile/picture/{user_id}                     image (public)
///
/// /projects                                      list, create
/// /projects/dashboard/stats                      role-scoped counters
/// /projects/delay-check                          check every active project (POST)
/// /projects/{id}                                 get, update, delete
/// /projects/{id}/submit-to-secretariat           workflow (POST)
/// /projects/{id}/secretariat-approve             workflow (POST)
/// /projects/{id}/secretariat-reject              workflow (POST)
/// /projects/{id}/compile-and-submit              workflow (POST)
/// /projects/{id}/validate-compiled               workflow (POST)
/// /projects/{id}/mpmec-approve                   workflow (POST)
/// /projects/{id}/progress                        recomputed progress report
/// /projects/{id}/activity                        activity entries
/// /projects/{id}/export                          .xlsx export
/// /projects/{id}/delay-check                     delay check (POST)
/// /projects/{id}/milestones                      list, create
/// /projects/{id}/milestones/weights              weight report
///
/// /milestones/{id}                               update, delete
///
/// /project-updates                               submit (multipart)
/// /project-updates/project/{project_id}          list for a project
/// /project-updates/milestone/{id}/pending-status pending check
/// /project-updates/{id}                          get with files
/// /project-updates/{id}/iu-review                first review gate (PUT)
/// /project-updates/{id}/secretariat-review       final review gate (PUT)
///
/// /notifications                                 list (?unread_only, category, priority)
/// /notifications/read-all                        mark all read (POST)
/// /notifications/unread-count                    unread count
/// /notifications/{id}                            delete
/// /notifications/{id}/read                       mark read (POST)
///
/// /activity-logs                                 filtered query (SYS.AD)
/// /activity-logs/me                              own entries
///
/// /policies                                      list, create
/// /policies/{id}                                 get, update, delete
/// /policies/{id}/publish                         publish (POST)
///
/// /communications                                mailbox, send
/// /communications/stats                          mailbox counters
/// /communications/{id}                           get, patch, delete
///
/// /templates                                     list, upload (multipart)
/// /templates/{id}                                get, update, delete
/// /templates/{id}/download                       stream file
/// /templates/{id}/approve                        activate (POST)
///
/// /rpmes                                         create
/// /rpmes/project/{project_id}                    list for a project
/// /rpmes/{id}                                    get, update, delete
/// /rpmes/{id}/validate                           validate (POST)
/// /rpmes/{id}/export                             single form .xlsx
/// /rpmes/export/{project_id}/{group}             input (1-4) or output (5-11) .xlsx
///
/// /eiu-activities                                office list with stats, create (EIU)
/// /eiu-activities/mine                           own activities (EIU)
/// /eiu-activities/{id}                           get, update, delete
/// /eiu-activities/{id}/review                    review verdict (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/profile", profile::router())
        .nest("/projects", projects::router())
        .nest("/milestones", milestones::router())
        .nest("/project-updates", project_updates::router())
        .nest("/notifications", notifications::router())
        .nest("/activity-logs", activity_logs::router())
        .nest("/policies", policies::router())
        .nest("/communications", communications::router())
        .nest("/templates", templates::router())
        .nest("/rpmes", rpmes::router())
        .nest("/eiu-activities", field_activities::router())
}
