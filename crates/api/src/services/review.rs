//! Secretariat approval of a progress update.
//!
//! The status compare-and-set and its effects commit in one transaction:
//! division statuses on the milestone rows, milestone promotion, and the
//! project progress cache. If any step fails the update stays `iu_approved`
//! and the review can be repeated.

use buildwatch_core::milestone::status_after_approval;
use buildwatch_core::progress::{apply_division_verdicts, parse_milestone_updates, DivisionVerdict};
use buildwatch_core::types::DbId;
use buildwatch_core::workflow::{resolve_final_progress, UpdateStatus};
use buildwatch_db::models::milestone::{DivisionStatuses, Milestone};
use buildwatch_db::models::project::Project;
use buildwatch_db::models::project_update::{ProjectUpdate, SecretariatReview};
use buildwatch_db::repositories::{MilestoneRepo, ProjectUpdateRepo};
use buildwatch_db::DbPool;
use serde_json::Value;
use sqlx::PgConnection;

use crate::error::{AppError, AppResult};
use crate::services::progress;

/// What the Secretariat decided for an `iu_approved` update.
#[derive(Debug)]
pub struct Approval<'a> {
    pub reviewer_id: DbId,
    pub final_progress: Option<f64>,
    pub remarks: Option<String>,
    pub verdicts: &'a [DivisionVerdict],
}

/// Approve `update` and apply every effect, or change nothing.
///
/// `Ok(None)` means the update left `iu_approved` before this call won the
/// compare-and-set.
pub async fn approve_update(
    pool: &DbPool,
    project: &Project,
    update: &ProjectUpdate,
    approval: Approval<'_>,
) -> AppResult<Option<ProjectUpdate>> {
    let mut tx = pool.begin().await?;
    let approved = approve_in(&mut *tx, project, update, approval).await?;
    if approved.is_some() {
        tx.commit().await?;
    }
    Ok(approved)
}

/// [`approve_update`] on a caller-owned transaction. Nothing is committed.
pub async fn approve_in(
    conn: &mut PgConnection,
    project: &Project,
    update: &ProjectUpdate,
    approval: Approval<'_>,
) -> AppResult<Option<ProjectUpdate>> {
    let milestone_updates = if approval.verdicts.is_empty() {
        None
    } else {
        let milestones = MilestoneRepo::list_by_project(&mut *conn, project.id).await?;
        Some(merge_verdicts(update, approval.verdicts, &milestones)?)
    };

    let review = SecretariatReview {
        reviewer_id: approval.reviewer_id,
        status: UpdateStatus::SecretariatApproved,
        final_progress: Some(resolve_final_progress(
            approval.final_progress,
            update.adjusted_progress,
            update.claimed_progress,
        )),
        remarks: approval.remarks,
        milestone_updates,
    };
    let Some(approved) =
        ProjectUpdateRepo::record_secretariat_review(&mut *conn, update.id, &review).await?
    else {
        return Ok(None);
    };

    for verdict in approval.verdicts {
        let statuses = DivisionStatuses {
            timeline: verdict.timeline_status,
            budget: verdict.budget_status,
            physical: verdict.physical_status,
        };
        MilestoneRepo::set_division_statuses(&mut *conn, verdict.milestone_id, &statuses).await?;
    }

    if let (Some(milestone_id), Some(final_progress)) =
        (approved.milestone_id, approved.final_progress)
    {
        if let Some(status) = status_after_approval(final_progress) {
            MilestoneRepo::set_status(&mut *conn, milestone_id, status).await?;
            tracing::info!(milestone_id, %status, final_progress, "Milestone promoted");
        }
    }

    progress::refresh_cache(&mut *conn, project).await?;
    Ok(Some(approved))
}

/// Merge verdicts into the update's stored entries.
fn merge_verdicts(
    update: &ProjectUpdate,
    verdicts: &[DivisionVerdict],
    milestones: &[Milestone],
) -> AppResult<Value> {
    let mut entries = match &update.milestone_updates {
        Some(raw) => parse_milestone_updates(raw).map_err(|e| {
            AppError::validation(format!("Stored milestone_updates are invalid: {}", e.0))
        })?,
        None => Vec::new(),
    };
    let snapshots: Vec<_> = milestones.iter().map(Milestone::snapshot).collect();
    apply_division_verdicts(&mut entries, verdicts, &snapshots).map_err(AppError::validation)?;
    serde_json::to_value(&entries).map_err(|e| AppError::InternalError(e.to_string()))
}
