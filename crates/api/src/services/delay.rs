//! On-demand delay check for one project or the whole portfolio.

use buildwatch_core::delay::{self, DelayAssessment, CHECKED_PROJECT_STATUSES};
use buildwatch_core::milestone::MilestoneStatus;
use buildwatch_core::notification::{
    entity_types, priority_for_delay, NotificationCategory, NotificationType,
};
use buildwatch_core::project::ProjectStatus;
use buildwatch_core::roles::{ROLE_EMS, ROLE_LGU_PMT, ROLE_SYS_AD};
use buildwatch_core::types::{Date, DbId};
use buildwatch_db::models::project::Project;
use buildwatch_db::repositories::{MilestoneRepo, ProjectRepo, UserRepo};
use buildwatch_db::DbPool;
use serde::Serialize;

use super::notifications::{notify_users, NotificationDraft};

const OVERSIGHT_ROLES: &[&str] = &[ROLE_LGU_PMT, ROLE_EMS, ROLE_SYS_AD];

/// Outcome of checking one project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDelayReport {
    pub project_id: DbId,
    pub project_code: String,
    pub project_name: String,
    pub previous_status: ProjectStatus,
    pub status: ProjectStatus,
    #[serde(flatten)]
    pub assessment: DelayAssessment,
    pub milestones_marked_delayed: u64,
    pub notified: usize,
}

/// Outcome of a portfolio-wide run.
#[derive(Debug, Clone, Serialize)]
pub struct DelayRunSummary {
    pub checked: usize,
    pub delayed: usize,
    pub reports: Vec<ProjectDelayReport>,
}

/// Check one project against `today`: mark overdue milestones delayed,
/// move the project status, and notify the people responsible.
pub async fn check_project(
    pool: &DbPool,
    project: &Project,
    today: Date,
) -> Result<ProjectDelayReport, sqlx::Error> {
    let milestones = MilestoneRepo::list_by_project(pool, project.id).await?;
    let snapshots: Vec<_> = milestones.iter().map(|m| m.snapshot()).collect();
    let assessment = delay::assess(&snapshots, today);

    let overdue_ids: Vec<DbId> = assessment.overdue_milestones.iter().map(|m| m.id).collect();
    let milestones_marked_delayed = if overdue_ids.is_empty() {
        0
    } else {
        MilestoneRepo::mark_delayed(pool, &overdue_ids).await?
    };

    let has_open_milestones = milestones
        .iter()
        .any(|m| matches!(m.status, MilestoneStatus::Pending | MilestoneStatus::InProgress));

    let mut status = project.status;
    if let Some(next) = delay::next_project_status(project.status, &assessment, has_open_milestones)
    {
        ProjectRepo::set_status(pool, project.id, next).await?;
        tracing::info!(
            project_id = project.id,
            from = %project.status,
            to = %next,
            "Project status changed by delay check"
        );
        status = next;
    }

    let notified = if assessment.is_delayed {
        notify_delay(pool, project, &assessment).await?
    } else {
        0
    };

    Ok(ProjectDelayReport {
        project_id: project.id,
        project_code: project.project_code.clone(),
        project_name: project.name.clone(),
        previous_status: project.status,
        status,
        assessment,
        milestones_marked_delayed,
        notified,
    })
}

/// Check every ongoing or delayed project.
pub async fn check_all(pool: &DbPool, today: Date) -> Result<DelayRunSummary, sqlx::Error> {
    let projects = ProjectRepo::list_by_statuses(pool, CHECKED_PROJECT_STATUSES).await?;
    let mut reports = Vec::with_capacity(projects.len());
    for project in &projects {
        reports.push(check_project(pool, project, today).await?);
    }
    let delayed = reports.iter().filter(|r| r.assessment.is_delayed).count();
    tracing::info!(checked = projects.len(), delayed, "Delay check completed");
    Ok(DelayRunSummary {
        checked: projects.len(),
        delayed,
        reports,
    })
}

async fn notify_delay(
    pool: &DbPool,
    project: &Project,
    assessment: &DelayAssessment,
) -> Result<usize, sqlx::Error> {
    let info = &assessment.delay_info;
    let draft = NotificationDraft::new(
        NotificationCategory::Alert,
        format!("Project delayed: {}", project.name),
        format!(
            "{} milestone(s) of {} are overdue (up to {} days, {:.2}% of total weight).",
            info.overdue_milestone_count,
            project.project_code,
            info.max_days_overdue,
            info.total_overdue_weight
        ),
    )
    .kind(NotificationType::Warning)
    .priority(priority_for_delay(info.severity))
    .entity(entity_types::PROJECT, project.id)
    .action_url(format!("/projects/{}", project.id))
    .metadata(serde_json::json!({
        "severity": info.severity,
        "overdue_milestones": info.overdue_milestone_count,
        "max_days_overdue": info.max_days_overdue,
    }));

    let oversight = UserRepo::list_active_by_roles(pool, OVERSIGHT_ROLES).await?;
    let recipients = oversight
        .iter()
        .map(|u| u.id)
        .chain(std::iter::once(project.implementing_office_id))
        .chain(project.eiu_partner_id);

    Ok(notify_users(pool, recipients, &draft).await)
}
