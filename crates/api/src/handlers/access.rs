//! Row-level access rules shared by the project-scoped handlers.
//!
//! Role extractors answer "may this role call the route at all"; these
//! helpers answer "may this user touch this particular project".

use buildwatch_core::roles::{ROLE_EIU, ROLE_LGU_IU};
use buildwatch_core::types::DbId;
use buildwatch_db::models::project::Project;
use buildwatch_db::repositories::ProjectRepo;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Whether `user` may read `project`.
///
/// Implementing offices see the projects they own, EIU users the projects
/// they are assigned to, and every other role sees all projects.
pub fn can_view(user: &AuthUser, project: &Project) -> bool {
    visible_to(
        &user.role,
        user.user_id,
        project.implementing_office_id,
        project.eiu_partner_id,
    )
}

fn visible_to(role: &str, user_id: DbId, office_id: DbId, partner_id: Option<DbId>) -> bool {
    match role {
        ROLE_LGU_IU => office_id == user_id,
        ROLE_EIU => partner_id == Some(user_id),
        _ => true,
    }
}

/// Whether `user` is the project's implementing office.
pub fn is_owner(user: &AuthUser, project: &Project) -> bool {
    user.has_role(ROLE_LGU_IU) && project.implementing_office_id == user.user_id
}

pub async fn load_project(state: &AppState, id: DbId) -> AppResult<Project> {
    ProjectRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::not_found("Project", id))
}

/// Load a project the caller may read.
pub async fn load_visible_project(
    state: &AppState,
    user: &AuthUser,
    id: DbId,
) -> AppResult<Project> {
    let project = load_project(state, id).await?;
    if !can_view(user, &project) {
        return Err(AppError::forbidden("You do not have access to this project"));
    }
    Ok(project)
}

/// Load a project the caller owns as its implementing office.
pub async fn load_owned_project(
    state: &AppState,
    user: &AuthUser,
    id: DbId,
) -> AppResult<Project> {
    let project = load_project(state, id).await?;
    if !is_owner(user, &project) {
        return Err(AppError::forbidden(
            "Only the project's implementing office can do this",
        ));
    }
    Ok(project)
}

#[cfg(test)]
mod tests {
    use buildwatch_core::roles::{ROLE_EMS, ROLE_LGU_PMT};

    use super::*;

    #[test]
    fn visibility_follows_role() {
        assert!(visible_to(ROLE_LGU_IU, 2, 2, None));
        assert!(!visible_to(ROLE_LGU_IU, 3, 2, None));
        assert!(visible_to(ROLE_EIU, 5, 2, Some(5)));
        assert!(!visible_to(ROLE_EIU, 5, 2, None));
        assert!(visible_to(ROLE_LGU_PMT, 9, 2, None));
        assert!(visible_to(ROLE_EMS, 9, 2, None));
    }
}
