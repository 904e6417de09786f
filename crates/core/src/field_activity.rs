//! Field activities logged by external implementing units (EIU) on the
//! projects they are assigned to, and reviewed by the owning office.

define_text_enum! {
    FieldActivityType {
        SiteVisit => "site_visit",
        DocumentReview => "document_review",
        ProgressReport => "progress_report",
        IssueIdentified => "issue_identified",
        QualityCheck => "quality_check",
        SafetyInspection => "safety_inspection",
        MaterialDelivery => "material_delivery",
        ConstructionUpdate => "construction_update",
    }
}

define_text_enum! {
    FieldActivityStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Rejected => "rejected",
    }
}

define_text_enum! {
    FieldActivityPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

define_text_enum! {
    ReviewStatus {
        PendingReview => "pending_review",
        Approved => "approved",
        Rejected => "rejected",
        RequiresRevision => "requires_revision",
    }
}

impl ReviewStatus {
    /// The EIU author may still edit the activity.
    pub fn is_editable(self) -> bool {
        matches!(self, ReviewStatus::PendingReview | ReviewStatus::RequiresRevision)
    }

    /// A value the reviewing office may hand down.
    pub fn is_verdict(self) -> bool {
        self != ReviewStatus::PendingReview
    }
}

/// Work status that follows a review verdict.
pub fn status_after_review(verdict: ReviewStatus) -> FieldActivityStatus {
    match verdict {
        ReviewStatus::Approved => FieldActivityStatus::Completed,
        ReviewStatus::Rejected => FieldActivityStatus::Rejected,
        ReviewStatus::RequiresRevision => FieldActivityStatus::InProgress,
        ReviewStatus::PendingReview => FieldActivityStatus::Pending,
    }
}

/// Rejections and revision requests must say why.
pub fn validate_review(verdict: ReviewStatus, comments: Option<&str>) -> Result<(), String> {
    if !verdict.is_verdict() {
        return Err(
            "Review status must be one of: approved, rejected, requires_revision".to_string(),
        );
    }
    let explained = comments.is_some_and(|c| !c.trim().is_empty());
    if verdict != ReviewStatus::Approved && !explained {
        return Err(format!("Review comments are required when the verdict is {verdict}"));
    }
    Ok(())
}

/// Attachments are a JSON array of references (URLs or stored names).
pub fn validate_attachments(attachments: &serde_json::Value) -> Result<(), String> {
    match attachments.as_array() {
        Some(items) if items.iter().all(|i| i.is_string() || i.is_object()) => Ok(()),
        _ => Err("Attachments must be an array of file references".to_string()),
    }
}
