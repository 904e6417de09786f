//! Approval state machines for progress updates and project submissions.
//!
//! A progress update moves through two sequential review gates:
//!
//! ```text
//! Submitted --IU approve--> IuApproved --Secretariat approve--> SecretariatApproved
//!     |                         |
//!     +--IU reject--> IuRejected +--Secretariat reject--> SecretariatRejected
//! ```
//!
//! Rejection at either gate is terminal; the submitter files a new update.

use serde::Deserialize;

use crate::error::CoreError;

define_text_enum! {
    /// Lifecycle status of a `project_updates` row.
    UpdateStatus {
        Submitted => "submitted",
        IuApproved => "iu_approved",
        IuRejected => "iu_rejected",
        SecretariatApproved => "secretariat_approved",
        SecretariatRejected => "secretariat_rejected",
    }
}

/// The two review gates an update passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStage {
    ImplementingOffice,
    Secretariat,
}

/// A reviewer's verdict at either gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl UpdateStatus {
    /// Statuses that block a new submission for the same milestone.
    pub const PENDING: &'static [UpdateStatus] =
        &[UpdateStatus::Submitted, UpdateStatus::IuApproved];

    /// Still waiting on a reviewer.
    pub fn is_pending(self) -> bool {
        Self::PENDING.contains(&self)
    }

    /// No further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UpdateStatus::IuRejected
                | UpdateStatus::SecretariatApproved
                | UpdateStatus::SecretariatRejected
        )
    }

    /// The status a review at `stage` requires the update to be in.
    pub fn required_for(stage: ReviewStage) -> UpdateStatus {
        match stage {
            ReviewStage::ImplementingOffice => UpdateStatus::Submitted,
            ReviewStage::Secretariat => UpdateStatus::IuApproved,
        }
    }

    /// Apply a review verdict, returning the next status.
    ///
    /// Fails with [`CoreError::Conflict`] when the update is not at the gate
    /// being reviewed, e.g. a Secretariat review of a `submitted` update.
    pub fn review(self, stage: ReviewStage, action: ReviewAction) -> Result<UpdateStatus, CoreError> {
        let expected = Self::required_for(stage);
        if self != expected {
            let msg = match stage {
                ReviewStage::ImplementingOffice => {
                    format!("Update is not awaiting IU review (status: {self})")
                }
                ReviewStage::Secretariat => {
                    format!("Update must be approved by the IU first (status: {self})")
                }
            };
            return Err(CoreError::Conflict(msg));
        }

        Ok(match (stage, action) {
            (ReviewStage::ImplementingOffice, ReviewAction::Approve) => UpdateStatus::IuApproved,
            (ReviewStage::ImplementingOffice, ReviewAction::Reject) => UpdateStatus::IuRejected,
            (ReviewStage::Secretariat, ReviewAction::Approve) => UpdateStatus::SecretariatApproved,
            (ReviewStage::Secretariat, ReviewAction::Reject) => UpdateStatus::SecretariatRejected,
        })
    }
}

/// Progress value recorded when the Secretariat approves an update.
///
/// The Secretariat's figure wins, then the IU's adjustment, then the
/// submitter's claim.
pub fn resolve_final_progress(
    final_progress: Option<f64>,
    adjusted_progress: Option<f64>,
    claimed_progress: f64,
) -> f64 {
    final_progress
        .or(adjusted_progress)
        .unwrap_or(claimed_progress)
}

/// Validate a submitted progress percentage.
pub fn validate_progress_value(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(format!("{field} must be between 0 and 100"));
    }
    Ok(())
}

define_text_enum! {
    /// Update categories accepted on submission.
    UpdateType {
        Timeline => "timeline",
        Budget => "budget",
        Physical => "physical",
        Milestone => "milestone",
        MilestoneUpdate => "milestone_update",
    }
}

impl UpdateType {
    /// Milestone-type updates carry the per-division `milestone_updates`
    /// payload the progress engine reads.
    pub fn carries_milestone_payload(self) -> bool {
        matches!(self, UpdateType::Milestone | UpdateType::MilestoneUpdate)
    }
}

// ---------------------------------------------------------------------------
// Project workflow
// ---------------------------------------------------------------------------

define_text_enum! {
    /// Project-level submission workflow (`projects.workflow_status`).
    WorkflowStatus {
        Draft => "draft",
        Submitted => "submitted",
        SecretariatApproved => "secretariat_approved",
        Ongoing => "ongoing",
        CompiledForSecretariat => "compiled_for_secretariat",
        ValidatedBySecretariat => "validated_by_secretariat",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

impl WorkflowStatus {
    /// Implementing Office sends a draft project to the Secretariat.
    pub fn submit_to_secretariat(self) -> Result<WorkflowStatus, CoreError> {
        self.transition(&[WorkflowStatus::Draft], WorkflowStatus::Submitted)
    }

    /// Secretariat accepts a submitted project; it becomes active.
    pub fn secretariat_approve(self) -> Result<WorkflowStatus, CoreError> {
        self.transition(&[WorkflowStatus::Submitted], WorkflowStatus::SecretariatApproved)
    }

    /// Secretariat returns a submitted project to draft.
    pub fn secretariat_reject(self) -> Result<WorkflowStatus, CoreError> {
        self.transition(&[WorkflowStatus::Submitted], WorkflowStatus::Draft)
    }

    /// Implementing Office compiles approved progress for Secretariat
    /// validation. A validated project compiles again for its next report.
    pub fn compile_for_secretariat(self) -> Result<WorkflowStatus, CoreError> {
        self.transition(
            &[
                WorkflowStatus::SecretariatApproved,
                WorkflowStatus::Ongoing,
                WorkflowStatus::ValidatedBySecretariat,
            ],
            WorkflowStatus::CompiledForSecretariat,
        )
    }

    /// Secretariat validates (or returns) a compiled report.
    pub fn validate_compiled(self, validated: bool) -> Result<WorkflowStatus, CoreError> {
        let target = if validated {
            WorkflowStatus::ValidatedBySecretariat
        } else {
            WorkflowStatus::Ongoing
        };
        self.transition(&[WorkflowStatus::CompiledForSecretariat], target)
    }

    fn transition(
        self,
        allowed_from: &[WorkflowStatus],
        to: WorkflowStatus,
    ) -> Result<WorkflowStatus, CoreError> {
        if allowed_from.contains(&self) {
            Ok(to)
        } else {
            Err(CoreError::Conflict(format!(
                "Cannot move project from '{self}' to '{to}'"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn iu_review_from_submitted() {
        let s = UpdateStatus::Submitted;
        assert_eq!(
            s.review(ReviewStage::ImplementingOffice, ReviewAction::Approve).unwrap(),
            UpdateStatus::IuApproved
        );
        assert_eq!(
            s.review(ReviewStage::ImplementingOffice, ReviewAction::Reject).unwrap(),
            UpdateStatus::IuRejected
        );
    }

    #[test]
    fn secretariat_review_requires_iu_approval() {
        for status in [
            UpdateStatus::Submitted,
            UpdateStatus::IuRejected,
            UpdateStatus::SecretariatApproved,
            UpdateStatus::SecretariatRejected,
        ] {
            assert_matches!(
                status.review(ReviewStage::Secretariat, ReviewAction::Approve),
                Err(CoreError::Conflict(_))
            );
        }
        assert_eq!(
            UpdateStatus::IuApproved
                .review(ReviewStage::Secretariat, ReviewAction::Approve)
                .unwrap(),
            UpdateStatus::SecretariatApproved
        );
    }

    #[test]
    fn secretariat_approved_is_only_reachable_through_iu_approved() {
        // Walk every status through every review and collect the sources that
        // can produce SecretariatApproved.
        let mut sources = Vec::new();
        for &from in UpdateStatus::ALL {
            for stage in [ReviewStage::ImplementingOffice, ReviewStage::Secretariat] {
                for action in [ReviewAction::Approve, ReviewAction::Reject] {
                    if from.review(stage, action).ok() == Some(UpdateStatus::SecretariatApproved) {
                        sources.push(from);
                    }
                }
            }
        }
        assert_eq!(sources, vec![UpdateStatus::IuApproved]);
    }

    #[test]
    fn rejections_are_terminal() {
        for status in [UpdateStatus::IuRejected, UpdateStatus::SecretariatRejected] {
            assert!(status.is_terminal());
            assert!(status
                .review(ReviewStage::ImplementingOffice, ReviewAction::Approve)
                .is_err());
            assert!(status.review(ReviewStage::Secretariat, ReviewAction::Approve).is_err());
        }
    }

    #[test]
    fn pending_statuses_block_submission() {
        assert!(UpdateStatus::Submitted.is_pending());
        assert!(UpdateStatus::IuApproved.is_pending());
        assert!(!UpdateStatus::IuRejected.is_pending());
        assert!(!UpdateStatus::SecretariatApproved.is_pending());
    }

    #[test]
    fn status_string_round_trip_and_unknown() {
        assert_eq!(UpdateStatus::parse("iu_approved").unwrap(), UpdateStatus::IuApproved);
        assert_eq!(UpdateStatus::SecretariatRejected.as_str(), "secretariat_rejected");
        assert_matches!(UpdateStatus::parse("iu_reviewed"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn final_progress_precedence() {
        assert_eq!(resolve_final_progress(Some(80.0), Some(70.0), 60.0), 80.0);
        assert_eq!(resolve_final_progress(None, Some(70.0), 60.0), 70.0);
        assert_eq!(resolve_final_progress(None, None, 60.0), 60.0);
        assert_eq!(resolve_final_progress(Some(0.0), Some(70.0), 60.0), 0.0);
    }

    #[test]
    fn progress_value_bounds() {
        assert!(validate_progress_value("claimed_progress", 0.0).is_ok());
        assert!(validate_progress_value("claimed_progress", 100.0).is_ok());
        assert!(validate_progress_value("claimed_progress", 100.5).is_err());
        assert!(validate_progress_value("claimed_progress", -1.0).is_err());
        assert!(validate_progress_value("claimed_progress", f64::NAN).is_err());
    }

    #[test]
    fn review_action_deserializes_lowercase() {
        let action: ReviewAction = serde_json::from_str("\"approve\"").unwrap();
        assert_eq!(action, ReviewAction::Approve);
        assert!(serde_json::from_str::<ReviewAction>("\"maybe\"").is_err());
    }

    #[test]
    fn milestone_payload_types() {
        assert!(UpdateType::Milestone.carries_milestone_payload());
        assert!(UpdateType::MilestoneUpdate.carries_milestone_payload());
        assert!(!UpdateType::Budget.carries_milestone_payload());
    }

    #[test]
    fn project_workflow_happy_path() {
        let s = WorkflowStatus::Draft.submit_to_secretariat().unwrap();
        assert_eq!(s, WorkflowStatus::Submitted);
        let s = s.secretariat_approve().unwrap();
        assert_eq!(s, WorkflowStatus::SecretariatApproved);
        let s = s.compile_for_secretariat().unwrap();
        assert_eq!(s, WorkflowStatus::CompiledForSecretariat);
        let s = s.validate_compiled(true).unwrap();
        assert_eq!(s, WorkflowStatus::ValidatedBySecretariat);
    }

    #[test]
    fn validated_project_can_compile_the_next_report() {
        assert_eq!(
            WorkflowStatus::ValidatedBySecretariat.compile_for_secretariat().unwrap(),
            WorkflowStatus::CompiledForSecretariat
        );
        assert_matches!(
            WorkflowStatus::CompiledForSecretariat.compile_for_secretariat(),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn project_workflow_rejections() {
        assert_eq!(
            WorkflowStatus::Submitted.secretariat_reject().unwrap(),
            WorkflowStatus::Draft
        );
        assert_eq!(
            WorkflowStatus::CompiledForSecretariat.validate_compiled(false).unwrap(),
            WorkflowStatus::Ongoing
        );
        assert_matches!(
            WorkflowStatus::Draft.secretariat_approve(),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            WorkflowStatus::Submitted.submit_to_secretariat(),
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            WorkflowStatus::Draft.compile_for_secretariat(),
            Err(CoreError::Conflict(_))
        );
    }
}
