//! `.xlsx` exports: the project report (Summary, Milestones and Updates
//! sheets) and RPMES forms, one sheet per form.

use buildwatch_core::progress::ProgressComputation;
use buildwatch_core::rpmes::{form_number, form_title, FormGroup};
use buildwatch_db::models::milestone::Milestone;
use buildwatch_db::models::project::Project;
use buildwatch_db::models::project_update::ProjectUpdate;
use buildwatch_db::models::rpmes_form::RpmesForm;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet, XlsxError};
use serde_json::Value;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Download name, e.g. `INF-2026-001-report.xlsx`.
pub fn export_file_name(project: &Project) -> String {
    format!("{}-report.xlsx", project.project_code)
}

/// Render the workbook into memory.
pub fn build_project_workbook(
    project: &Project,
    progress: &ProgressComputation,
    milestones: &[Milestone],
    updates: &[ProjectUpdate],
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Summary")?;
        write_summary(sheet, &header, project, progress)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Milestones")?;
        write_milestones(sheet, &header, milestones)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Updates")?;
        write_updates(sheet, &header, updates)?;
    }

    workbook.save_to_buffer()
}

fn write_summary(
    sheet: &mut Worksheet,
    header: &Format,
    project: &Project,
    progress: &ProgressComputation,
) -> Result<(), XlsxError> {
    sheet.set_column_width(0, 28)?;
    sheet.set_column_width(1, 40)?;
    sheet.write_string_with_format(0, 0, "Field", header)?;
    sheet.write_string_with_format(0, 1, "Value", header)?;

    let text_rows = [
        ("Project code", project.project_code.clone()),
        ("Name", project.name.clone()),
        ("Category", project.category.to_string()),
        ("Location", project.location.clone()),
        ("Priority", project.priority.to_string()),
        ("Funding source", project.funding_source.to_string()),
        ("Status", project.status.to_string()),
        ("Workflow status", project.workflow_status.to_string()),
        ("Start date", project.start_date.to_string()),
        ("End date", project.end_date.to_string()),
    ];
    let mut row: u32 = 1;
    for (label, value) in &text_rows {
        sheet.write_string(row, 0, *label)?;
        sheet.write_string(row, 1, value)?;
        row += 1;
    }

    let number_rows = [
        ("Total budget", project.total_budget),
        ("Amount spent", progress.amount_spent),
        ("Overall progress (%)", progress.overall),
        ("Timeline progress (%)", progress.timeline),
        ("Budget progress (%)", progress.budget),
        ("Physical progress (%)", progress.physical),
        ("Total milestone weight (%)", progress.weights.total_weight),
        ("Applied weight (%)", progress.weights.applied_weight),
        ("Remaining weight (%)", progress.weights.remaining_weight),
    ];
    for (label, value) in number_rows {
        sheet.write_string(row, 0, label)?;
        sheet.write_number(row, 1, value)?;
        row += 1;
    }
    Ok(())
}

fn write_milestones(
    sheet: &mut Worksheet,
    header: &Format,
    milestones: &[Milestone],
) -> Result<(), XlsxError> {
    let headers = [
        "Title",
        "Weight (%)",
        "Due date",
        "Status",
        "Timeline weight",
        "Timeline status",
        "Budget weight",
        "Budget status",
        "Physical weight",
        "Physical status",
    ];
    write_header_row(sheet, header, &headers)?;
    sheet.set_column_width(0, 32)?;

    for (i, m) in milestones.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &m.title)?;
        sheet.write_number(row, 1, m.weight)?;
        sheet.write_string(row, 2, m.due_date.map(|d| d.to_string()).unwrap_or_default())?;
        sheet.write_string(row, 3, m.status.as_str())?;
        sheet.write_number(row, 4, m.timeline_weight)?;
        sheet.write_string(row, 5, m.timeline_status.as_str())?;
        sheet.write_number(row, 6, m.budget_weight)?;
        sheet.write_string(row, 7, m.budget_status.as_str())?;
        sheet.write_number(row, 8, m.physical_weight)?;
        sheet.write_string(row, 9, m.physical_status.as_str())?;
    }
    Ok(())
}

fn write_updates(
    sheet: &mut Worksheet,
    header: &Format,
    updates: &[ProjectUpdate],
) -> Result<(), XlsxError> {
    let headers = [
        "Submitted at",
        "Type",
        "Title",
        "Status",
        "Claimed (%)",
        "Adjusted (%)",
        "Final (%)",
        "Budget used",
        "Remarks",
    ];
    write_header_row(sheet, header, &headers)?;
    sheet.set_column_width(2, 32)?;

    for (i, u) in updates.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, u.submitted_at.format("%Y-%m-%d %H:%M").to_string())?;
        sheet.write_string(row, 1, u.update_type.as_str())?;
        sheet.write_string(row, 2, &u.title)?;
        sheet.write_string(row, 3, u.status.as_str())?;
        sheet.write_number(row, 4, u.claimed_progress)?;
        if let Some(v) = u.adjusted_progress {
            sheet.write_number(row, 5, v)?;
        }
        if let Some(v) = u.final_progress {
            sheet.write_number(row, 6, v)?;
        }
        if let Some(v) = u.budget_used {
            sheet.write_number(row, 7, v)?;
        }
        sheet.write_string(row, 8, u.remarks.as_deref().unwrap_or_default())?;
    }
    Ok(())
}

fn write_header_row(sheet: &mut Worksheet, header: &Format, titles: &[&str]) -> Result<(), XlsxError> {
    for (col, title) in titles.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, header)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// RPMES forms
// ---------------------------------------------------------------------------

/// e.g. `RPMES-Form-3-INF-2026-001-2026.xlsx`.
pub fn rpmes_form_file_name(project: &Project, form: &RpmesForm) -> String {
    let number = form_number(&form.form_type).unwrap_or_default();
    format!(
        "RPMES-Form-{number}-{}-{}.xlsx",
        file_safe(&project.project_code),
        form.reporting_year
    )
}

/// e.g. `RPMES-Forms-1-4-Farm-to-market-road-2026.xlsx`.
pub fn rpmes_group_file_name(project: &Project, group: FormGroup, fiscal_year: i32) -> String {
    format!(
        "RPMES-Forms-{}-{}-{fiscal_year}.xlsx",
        group.range_label(),
        file_safe(&project.name)
    )
}

/// A single form on a sheet named after it.
pub fn build_rpmes_form_workbook(project: &Project, form: &RpmesForm) -> Result<Vec<u8>, XlsxError> {
    let number = form_number(&form.form_type).unwrap_or_default();
    let mut workbook = Workbook::new();
    let formats = RpmesFormats::new();
    let sheet = workbook.add_worksheet();
    write_rpmes_sheet(sheet, &formats, project, number, Some(form))?;
    workbook.save_to_buffer()
}

/// Every form of `group`, one sheet each. Forms not yet filed get a
/// placeholder sheet so the bundle always has the full set.
pub fn build_rpmes_group_workbook(
    project: &Project,
    group: FormGroup,
    forms: &[RpmesForm],
) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let formats = RpmesFormats::new();
    for number in group.form_numbers() {
        let form = forms
            .iter()
            .find(|f| form_number(&f.form_type).ok() == Some(number));
        let sheet = workbook.add_worksheet();
        write_rpmes_sheet(sheet, &formats, project, number, form)?;
    }
    workbook.save_to_buffer()
}

struct RpmesFormats {
    title: Format,
    label: Format,
    cell: Format,
    placeholder: Format,
}

impl RpmesFormats {
    fn new() -> Self {
        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            label: Format::new().set_bold().set_border(FormatBorder::Thin),
            cell: Format::new().set_text_wrap().set_border(FormatBorder::Thin),
            placeholder: Format::new().set_italic().set_font_color("#666666"),
        }
    }
}

fn write_rpmes_sheet(
    sheet: &mut Worksheet,
    formats: &RpmesFormats,
    project: &Project,
    number: u8,
    form: Option<&RpmesForm>,
) -> Result<(), XlsxError> {
    sheet.set_name(format!("Form {number}"))?;
    sheet.set_column_width(0, 28)?;
    sheet.set_column_width(1, 48)?;
    sheet.merge_range(0, 0, 0, 3, &format!("RPMES FORM {number}"), &formats.title)?;
    sheet.merge_range(1, 0, 1, 3, form_title(number), &formats.title)?;

    let Some(form) = form else {
        sheet.write_string_with_format(3, 0, "Form data will be populated when submitted", &formats.placeholder)?;
        return Ok(());
    };

    let info = [
        ("Project", project.name.clone()),
        ("Project code", project.project_code.clone()),
        ("Location", project.location.clone()),
        ("Reporting year", form.reporting_year.to_string()),
        ("Reporting period", form.reporting_period.clone().unwrap_or_default()),
        ("Status", form.status.to_string()),
    ];
    let mut row: u32 = 3;
    for (label, value) in &info {
        sheet.write_string_with_format(row, 0, *label, &formats.label)?;
        sheet.write_string_with_format(row, 1, value, &formats.cell)?;
        row += 1;
    }

    row += 1;
    sheet.write_string_with_format(row, 0, "Field", &formats.label)?;
    sheet.write_string_with_format(row, 1, "Value", &formats.label)?;
    row += 1;
    if let Some(fields) = form.form_data.as_object() {
        for (key, value) in fields {
            if value.is_null() {
                continue;
            }
            sheet.write_string_with_format(row, 0, key, &formats.label)?;
            match value {
                Value::Number(n) => {
                    sheet.write_number_with_format(row, 1, n.as_f64().unwrap_or_default(), &formats.cell)?;
                }
                Value::String(text) => {
                    sheet.write_string_with_format(row, 1, text, &formats.cell)?;
                }
                Value::Bool(flag) => {
                    sheet.write_string_with_format(row, 1, if *flag { "Yes" } else { "No" }, &formats.cell)?;
                }
                other => {
                    sheet.write_string_with_format(row, 1, other.to_string(), &formats.cell)?;
                }
            }
            row += 1;
        }
    }

    if let Some(remarks) = form.remarks.as_deref().filter(|r| !r.trim().is_empty()) {
        row += 1;
        sheet.write_string_with_format(row, 0, "Remarks", &formats.label)?;
        sheet.write_string_with_format(row, 1, remarks, &formats.cell)?;
    }
    Ok(())
}

/// ASCII letters and digits kept, everything else becomes `-`.
fn file_safe(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

#[cfg(test)]
mod tests {
    use buildwatch_core::progress::compute;
    use buildwatch_core::rpmes::{FormCategory, FormStatus};
    use serde_json::json;
    use buildwatch_core::project::{FundingSource, ProjectCategory, ProjectPriority, ProjectStatus};
    use buildwatch_core::workflow::WorkflowStatus;
    use chrono::{NaiveDate, Utc};

    use super::*;

    fn project() -> Project {
        Project {
            id: 1,
            project_code: "INF-2026-001".into(),
            name: "Farm-to-market road".into(),
            description: String::new(),
            category: ProjectCategory::Infrastructure,
            location: "Barangay Uno".into(),
            priority: ProjectPriority::High,
            funding_source: FundingSource::LocalFund,
            status: ProjectStatus::Ongoing,
            workflow_status: WorkflowStatus::Ongoing,
            total_budget: 1_000_000.0,
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            expected_outputs: None,
            target_beneficiaries: None,
            implementing_office_id: 2,
            eiu_partner_id: None,
            timeline_progress: 0.0,
            budget_progress: 0.0,
            physical_progress: 0.0,
            overall_progress: 0.0,
            automated_progress: false,
            last_progress_update: None,
            submitted_to_secretariat: false,
            submitted_to_secretariat_at: None,
            approved_by_secretariat: false,
            secretariat_approved_by: None,
            secretariat_approved_at: None,
            secretariat_comments: None,
            approved_by_mpmec: false,
            mpmec_approved_by: None,
            mpmec_approved_at: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn workbook_is_a_zip_container() {
        let project = project();
        let progress = compute(project.total_budget, &[], None);
        let bytes = build_project_workbook(&project, &progress, &[], &[]).unwrap();
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn file_name_uses_project_code() {
        assert_eq!(export_file_name(&project()), "INF-2026-001-report.xlsx");
    }

    fn form(number: u8) -> RpmesForm {
        RpmesForm {
            id: number as i64,
            project_id: 1,
            submitted_by: 2,
            form_type: format!("RPMES Form {number}"),
            form_category: if number <= 4 { FormCategory::Input } else { FormCategory::Output },
            reporting_year: 2026,
            reporting_period: Some("Q2".into()),
            form_data: json!({ "physical_accomplishment": 42.5, "issues": "None", "ok": true, "gap": null }),
            remarks: Some("Filed on time".into()),
            status: FormStatus::Submitted,
            validated_by: None,
            validated_at: None,
            feedback: None,
            export_count: 0,
            last_exported_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn rpmes_workbooks_render() {
        let project = project();
        let single = build_rpmes_form_workbook(&project, &form(3)).unwrap();
        assert_eq!(&single[..2], b"PK");

        let grouped = build_rpmes_group_workbook(&project, FormGroup::Output, &[form(5), form(9)]).unwrap();
        assert_eq!(&grouped[..2], b"PK");
        let empty = build_rpmes_group_workbook(&project, FormGroup::Input, &[]).unwrap();
        assert_eq!(&empty[..2], b"PK");
    }

    #[test]
    fn rpmes_file_names() {
        let project = project();
        assert_eq!(rpmes_form_file_name(&project, &form(3)), "RPMES-Form-3-INF-2026-001-2026.xlsx");
        assert_eq!(
            rpmes_group_file_name(&project, FormGroup::Input, 2026),
            "RPMES-Forms-1-4-Farm-to-market-road-2026.xlsx"
        );
        assert_eq!(
            rpmes_group_file_name(&project, FormGroup::Output, 2027),
            "RPMES-Forms-5-11-Farm-to-market-road-2027.xlsx"
        );
    }
}
