//! Overdue milestone detection.
//!
//! Runs on demand: a milestone is overdue when its due date is before today
//! and it is not completed. Severity escalates with the worst lateness and
//! the share of project weight that is late.

use serde::Serialize;

use crate::milestone::MilestoneStatus;
use crate::progress::{round2, MilestoneSnapshot};
use crate::project::ProjectStatus;
use crate::types::{Date, DbId};

define_text_enum! {
    DelaySeverity {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

/// Severity from the longest delay (days) and total overdue weight (%).
pub fn severity(max_days_overdue: i64, total_overdue_weight: f64) -> DelaySeverity {
    if max_days_overdue >= 30 || total_overdue_weight >= 50.0 {
        DelaySeverity::Critical
    } else if max_days_overdue >= 14 || total_overdue_weight >= 30.0 {
        DelaySeverity::High
    } else if max_days_overdue >= 7 || total_overdue_weight >= 15.0 {
        DelaySeverity::Medium
    } else {
        DelaySeverity::Low
    }
}

/// Whole days `due` lies before `today`, or `None` when not overdue.
pub fn days_overdue(due: Date, today: Date) -> Option<i64> {
    (due < today).then(|| (today - due).num_days())
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueMilestone {
    pub id: DbId,
    pub title: String,
    pub due_date: Date,
    pub days_overdue: i64,
    pub weight: f64,
    pub status: MilestoneStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct DelayInfo {
    pub overdue_milestone_count: usize,
    pub max_days_overdue: i64,
    pub total_overdue_weight: f64,
    pub first_overdue_date: Option<Date>,
    pub severity: DelaySeverity,
}

#[derive(Debug, Clone, Serialize)]
pub struct DelayAssessment {
    pub is_delayed: bool,
    pub overdue_milestones: Vec<OverdueMilestone>,
    pub delay_info: DelayInfo,
}

/// Assess a project's milestones against `today`.
///
/// Milestones without a due date are never overdue. Overdue milestones are
/// returned earliest-due first.
pub fn assess(milestones: &[MilestoneSnapshot], today: Date) -> DelayAssessment {
    let mut overdue: Vec<OverdueMilestone> = milestones
        .iter()
        .filter(|m| m.status != MilestoneStatus::Completed)
        .filter_map(|m| {
            let due = m.due_date?;
            let days = days_overdue(due, today)?;
            Some(OverdueMilestone {
                id: m.id,
                title: m.title.clone(),
                due_date: due,
                days_overdue: days,
                weight: m.weight,
                status: m.status,
            })
        })
        .collect();
    overdue.sort_by_key(|m| (m.due_date, m.id));

    let max_days_overdue = overdue.iter().map(|m| m.days_overdue).max().unwrap_or(0);
    let total_overdue_weight = round2(overdue.iter().map(|m| m.weight).sum());

    DelayAssessment {
        is_delayed: !overdue.is_empty(),
        delay_info: DelayInfo {
            overdue_milestone_count: overdue.len(),
            max_days_overdue,
            total_overdue_weight,
            first_overdue_date: overdue.first().map(|m| m.due_date),
            severity: severity(max_days_overdue, total_overdue_weight),
        },
        overdue_milestones: overdue,
    }
}

/// The project status a delay check should write, if it changes.
///
/// A late project becomes `delayed` unless it is already delayed or
/// complete. A delayed project with nothing overdue goes back to `ongoing`
/// while it still has open (pending or in-progress) milestones.
pub fn next_project_status(
    current: ProjectStatus,
    assessment: &DelayAssessment,
    has_open_milestones: bool,
) -> Option<ProjectStatus> {
    match (assessment.is_delayed, current) {
        (true, ProjectStatus::Delayed | ProjectStatus::Complete) => None,
        (true, _) => Some(ProjectStatus::Delayed),
        (false, ProjectStatus::Delayed) if has_open_milestones => Some(ProjectStatus::Ongoing),
        (false, _) => None,
    }
}

/// Project statuses included in a portfolio-wide delay check.
pub const CHECKED_PROJECT_STATUSES: &[ProjectStatus] =
    &[ProjectStatus::Ongoing, ProjectStatus::Delayed];
