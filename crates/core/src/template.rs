//! Downloadable form template vocabulary.

define_text_enum! {
    TemplateCategory {
        RpmesForms => "rpmes_forms",
        ProgressReports => "progress_reports",
        SpecializedForms => "specialized_forms",
        ComplianceForms => "compliance_forms",
        MonitoringForms => "monitoring_forms",
    }
}

define_text_enum! {
    TemplateStatus {
        Active => "active",
        Draft => "draft",
        Archived => "archived",
        Pending => "pending",
    }
}

/// Only active templates are offered to non-administrators.
pub fn is_downloadable(status: TemplateStatus) -> bool {
    status == TemplateStatus::Active
}
