//! Project progress: load inputs, compute, and refresh the cached columns.
//!
//! The only input is the milestone rows plus the `milestone_updates` payload
//! of the latest Secretariat-approved milestone-type update. Updates still in
//! review are skipped so a claim cannot move the numbers before both gates
//! pass. The cached `*_progress` columns on `projects` are written here and
//! never read back.

use buildwatch_core::progress::{self, parse_milestone_updates, ProgressComputation};
use buildwatch_core::types::{DbId, Timestamp};
use buildwatch_core::workflow::UpdateStatus;
use buildwatch_db::models::milestone::Milestone;
use buildwatch_db::models::project::{ProgressCache, Project};
use buildwatch_db::models::project_update::ProjectUpdate;
use buildwatch_db::repositories::{MilestoneRepo, ProjectRepo, ProjectUpdateRepo};
use buildwatch_db::DbPool;
use serde::Serialize;
use sqlx::PgConnection;

/// Statuses whose payload feeds the progress numbers.
const PROGRESS_SOURCE: &[UpdateStatus] = &[UpdateStatus::SecretariatApproved];

/// Statuses shown as the compiled report on the progress page.
const COMPILED_SOURCE: &[UpdateStatus] =
    &[UpdateStatus::IuApproved, UpdateStatus::SecretariatApproved];

/// Latest compiled milestone report, as listed on the progress page.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledReportSummary {
    pub update_id: DbId,
    pub title: String,
    pub status: UpdateStatus,
    pub submitted_by: DbId,
    pub submitted_at: Timestamp,
    pub iu_reviewed_at: Option<Timestamp>,
    pub secretariat_reviewed_at: Option<Timestamp>,
    pub milestone_count: usize,
}

impl CompiledReportSummary {
    fn from_update(update: &ProjectUpdate) -> Self {
        let milestone_count = update
            .milestone_updates
            .as_ref()
            .and_then(|raw| parse_milestone_updates(raw).ok())
            .map_or(0, |entries| entries.len());
        Self {
            update_id: update.id,
            title: update.title.clone(),
            status: update.status,
            submitted_by: update.submitted_by,
            submitted_at: update.submitted_at,
            iu_reviewed_at: update.iu_reviewed_at,
            secretariat_reviewed_at: update.secretariat_reviewed_at,
            milestone_count,
        }
    }
}

/// Response body of `GET /projects/{id}/progress`.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressReport {
    pub project_id: DbId,
    pub project_code: String,
    pub project_name: String,
    pub total_budget: f64,
    #[serde(flatten)]
    pub progress: ProgressComputation,
    pub source_update_id: Option<DbId>,
    pub compiled_report: Option<CompiledReportSummary>,
    pub computed_at: Timestamp,
}

/// Compute progress for `project` from current milestone and update rows.
///
/// Takes a connection so an approval can recompute inside its transaction.
pub async fn compute_for_project(
    conn: &mut PgConnection,
    project: &Project,
) -> Result<(ProgressComputation, Vec<Milestone>, Option<ProjectUpdate>), sqlx::Error> {
    let milestones = MilestoneRepo::list_by_project(&mut *conn, project.id).await?;
    let source =
        ProjectUpdateRepo::latest_milestone_update(&mut *conn, project.id, PROGRESS_SOURCE)
            .await?;

    let snapshots: Vec<_> = milestones.iter().map(Milestone::snapshot).collect();
    let computation = progress::compute(
        project.total_budget,
        &snapshots,
        source.as_ref().and_then(|u| u.milestone_updates.as_ref()),
    );

    if let Some(error) = &computation.malformed {
        tracing::warn!(
            project_id = project.id,
            update_id = source.as_ref().map(|u| u.id),
            error = %error,
            "Malformed milestone_updates payload; progress treated as zero"
        );
    }

    Ok((computation, milestones, source))
}

/// Recompute and write the cached progress columns.
pub async fn refresh_cache(
    conn: &mut PgConnection,
    project: &Project,
) -> Result<ProgressComputation, sqlx::Error> {
    let (computation, _, _) = compute_for_project(&mut *conn, project).await?;
    let cache = ProgressCache {
        timeline: computation.timeline,
        budget: computation.budget,
        physical: computation.physical,
        overall: computation.overall,
    };
    ProjectRepo::write_progress(&mut *conn, project.id, &cache).await?;
    tracing::info!(
        project_id = project.id,
        overall = computation.overall,
        timeline = computation.timeline,
        budget = computation.budget,
        physical = computation.physical,
        "Project progress cache refreshed"
    );
    Ok(computation)
}

/// Full progress report. Always recomputed; the cache is not consulted.
pub async fn report(pool: &DbPool, project: &Project) -> Result<ProgressReport, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let (computation, _, source) = compute_for_project(&mut *conn, project).await?;
    let compiled =
        ProjectUpdateRepo::latest_milestone_update(&mut *conn, project.id, COMPILED_SOURCE)
            .await?;

    Ok(ProgressReport {
        project_id: project.id,
        project_code: project.project_code.clone(),
        project_name: project.name.clone(),
        total_budget: project.total_budget,
        progress: computation,
        source_update_id: source.map(|u| u.id),
        compiled_report: compiled.as_ref().map(CompiledReportSummary::from_update),
        computed_at: chrono::Utc::now(),
    })
}
