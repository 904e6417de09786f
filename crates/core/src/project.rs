//! Project value types and input validation.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::Date;

define_text_enum! {
    /// Delivery status (`projects.status`), separate from the submission
    /// workflow in [`crate::workflow::WorkflowStatus`].
    ProjectStatus {
        Pending => "pending",
        Ongoing => "ongoing",
        Delayed => "delayed",
        Complete => "complete",
    }
}

define_text_enum! {
    ProjectCategory {
        Infrastructure => "infrastructure",
        Health => "health",
        Education => "education",
        Agriculture => "agriculture",
        Social => "social",
        Environment => "environment",
        Transportation => "transportation",
    }
}

define_text_enum! {
    ProjectPriority {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

define_text_enum! {
    FundingSource {
        LocalFund => "local_fund",
        NationalFund => "national_fund",
        ForeignFund => "foreign_fund",
        PrivateFund => "private_fund",
        DonorFund => "donor_fund",
        MixedFund => "mixed_fund",
    }
}

/// Upper-case letters, digits and dashes; 3 to 32 characters, not starting
/// with a dash.
static PROJECT_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9][A-Z0-9-]{2,31}$").expect("valid regex"));

pub fn validate_project_code(code: &str) -> Result<(), String> {
    if !PROJECT_CODE_RE.is_match(code) {
        return Err(format!(
            "Invalid project code '{code}'. Use 3-32 upper-case letters, digits or dashes"
        ));
    }
    Ok(())
}

pub fn validate_budget(total_budget: f64) -> Result<(), String> {
    if !total_budget.is_finite() || total_budget < 0.0 {
        return Err("Total budget must be a non-negative amount".to_string());
    }
    Ok(())
}

pub fn validate_dates(start_date: Date, end_date: Date) -> Result<(), String> {
    if end_date < start_date {
        return Err("End date cannot be before the start date".to_string());
    }
    Ok(())
}
