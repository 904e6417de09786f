//! RPMES (Regional Project Monitoring and Evaluation System) form rules.
//!
//! Forms 1 to 4 are Input forms validated by the planning team; forms 5 to
//! 11 are Output forms validated by executive monitoring staff.

use std::ops::RangeInclusive;

use crate::roles::{ROLE_EMS, ROLE_LGU_IU, ROLE_LGU_PMT, ROLE_SYS_AD};

pub const MIN_REPORTING_YEAR: i32 = 2020;
pub const MAX_REPORTING_YEAR: i32 = 2100;

define_text_enum! {
    FormCategory {
        Input => "Input",
        Output => "Output",
    }
}

define_text_enum! {
    FormStatus {
        Draft => "Draft",
        Submitted => "Submitted",
        UnderReview => "Under Review",
        Approved => "Approved",
        Rejected => "Rejected",
    }
}

define_text_enum! {
    /// The two workbook bundles a project's forms export as.
    FormGroup {
        Input => "input",
        Output => "output",
    }
}

impl FormGroup {
    pub fn form_numbers(self) -> RangeInclusive<u8> {
        match self {
            FormGroup::Input => 1..=4,
            FormGroup::Output => 5..=11,
        }
    }

    /// `"RPMES Form N"` for every form in the group.
    pub fn form_types(self) -> Vec<String> {
        self.form_numbers().map(form_type_name).collect()
    }

    /// Input forms are exported by the filing office, Output forms by the
    /// monitoring teams. System administrators may export either.
    pub fn can_export(self, role: &str) -> bool {
        let allowed: &[&str] = match self {
            FormGroup::Input => &[ROLE_LGU_IU, ROLE_SYS_AD],
            FormGroup::Output => &[ROLE_LGU_PMT, ROLE_EMS, ROLE_SYS_AD],
        };
        allowed.contains(&role)
    }

    pub fn range_label(self) -> &'static str {
        match self {
            FormGroup::Input => "1-4",
            FormGroup::Output => "5-11",
        }
    }
}

impl FormStatus {
    /// The submitter may still edit the form.
    pub fn is_editable(self) -> bool {
        matches!(self, FormStatus::Draft | FormStatus::Rejected)
    }

    /// A reviewer may still validate the form.
    pub fn is_reviewable(self) -> bool {
        matches!(self, FormStatus::Submitted | FormStatus::UnderReview)
    }
}

/// Parse `"RPMES Form N"` into its number (1..=11).
pub fn form_number(form_type: &str) -> Result<u8, String> {
    form_type
        .strip_prefix("RPMES Form ")
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=11).contains(n))
        .ok_or_else(|| {
            format!("Invalid form type '{form_type}'. Must be 'RPMES Form 1' to 'RPMES Form 11'")
        })
}

pub fn form_type_name(number: u8) -> String {
    format!("RPMES Form {number}")
}

/// Sheet subtitle for a form number.
pub fn form_title(number: u8) -> &'static str {
    match number {
        1 => "PROJECT IDENTIFICATION AND BASIC INFORMATION",
        2 => "PROJECT OBJECTIVES AND EXPECTED OUTPUTS",
        3 => "PROJECT IMPLEMENTATION DETAILS",
        4 => "PROJECT MONITORING AND EVALUATION",
        5 => "PROJECT PROGRESS REPORT",
        6 => "PROJECT COMPLETION REPORT",
        7 => "PROJECT IMPACT ASSESSMENT",
        8 => "FINANCIAL REPORT",
        9 => "ENVIRONMENTAL COMPLIANCE REPORT",
        10 => "SOCIAL IMPACT REPORT",
        11 => "PROJECT SUSTAINABILITY REPORT",
        _ => "",
    }
}

pub fn form_category(form_type: &str) -> Result<FormCategory, String> {
    Ok(if form_number(form_type)? <= 4 {
        FormCategory::Input
    } else {
        FormCategory::Output
    })
}

/// The role that validates forms of `category`.
pub fn validator_role(category: FormCategory) -> &'static str {
    match category {
        FormCategory::Input => ROLE_LGU_PMT,
        FormCategory::Output => ROLE_EMS,
    }
}

pub fn validate_reporting_year(year: i32) -> Result<(), String> {
    if !(MIN_REPORTING_YEAR..=MAX_REPORTING_YEAR).contains(&year) {
        return Err(format!(
            "Reporting year must be between {MIN_REPORTING_YEAR} and {MAX_REPORTING_YEAR}"
        ));
    }
    Ok(())
}

/// Form data must be a non-empty JSON object.
pub fn validate_form_data(data: &serde_json::Value) -> Result<(), String> {
    match data.as_object() {
        Some(map) if !map.is_empty() => Ok(()),
        _ => Err("Form data must be a non-empty object".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn form_numbers() {
        assert_eq!(form_number("RPMES Form 1").unwrap(), 1);
        assert_eq!(form_number("RPMES Form 11").unwrap(), 11);
        assert!(form_number("RPMES Form 12").is_err());
        assert!(form_number("RPMES Form 0").is_err());
        assert!(form_number("Form 3").is_err());
    }

    #[test]
    fn categories_split_at_four() {
        assert_eq!(form_category("RPMES Form 4").unwrap(), FormCategory::Input);
        assert_eq!(form_category("RPMES Form 5").unwrap(), FormCategory::Output);
        assert_eq!(validator_role(FormCategory::Input), ROLE_LGU_PMT);
        assert_eq!(validator_role(FormCategory::Output), ROLE_EMS);
    }

    #[test]
    fn years() {
        assert!(validate_reporting_year(2020).is_ok());
        assert!(validate_reporting_year(2100).is_ok());
        assert!(validate_reporting_year(2019).is_err());
        assert!(validate_reporting_year(2101).is_err());
    }

    #[test]
    fn form_data_shape() {
        assert!(validate_form_data(&json!({"q1": 10})).is_ok());
        assert!(validate_form_data(&json!({})).is_err());
        assert!(validate_form_data(&json!([1])).is_err());
    }

    #[test]
    fn groups_cover_all_eleven_forms() {
        let input = FormGroup::Input.form_types();
        let output = FormGroup::Output.form_types();
        assert_eq!(input.first().map(String::as_str), Some("RPMES Form 1"));
        assert_eq!(input.len() + output.len(), 11);
        for form in input {
            assert_eq!(form_category(&form).unwrap(), FormCategory::Input);
        }
        for form in output {
            assert_eq!(form_category(&form).unwrap(), FormCategory::Output);
        }
        assert_eq!(FormGroup::parse("output").unwrap().range_label(), "5-11");
        assert!(FormGroup::parse("Input").is_err());
    }

    #[test]
    fn export_roles() {
        assert!(FormGroup::Input.can_export(ROLE_LGU_IU));
        assert!(!FormGroup::Input.can_export(ROLE_LGU_PMT));
        assert!(FormGroup::Output.can_export(ROLE_EMS));
        assert!(FormGroup::Output.can_export(ROLE_LGU_PMT));
        assert!(!FormGroup::Output.can_export(ROLE_LGU_IU));
        assert!(FormGroup::Output.can_export(ROLE_SYS_AD));
    }

    #[test]
    fn status_rules() {
        assert!(FormStatus::Draft.is_editable());
        assert!(FormStatus::Rejected.is_editable());
        assert!(!FormStatus::Submitted.is_editable());
        assert!(FormStatus::UnderReview.is_reviewable());
        assert_eq!(FormStatus::parse("Under Review").unwrap(), FormStatus::UnderReview);
    }
}
