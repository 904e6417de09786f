//! Project progress maths.
//!
//! Progress is derived from the `milestone_updates` payload of the project's
//! latest milestone-type update that has passed both review gates; the
//! caller picks that update. Each entry carries per-division weights and
//! statuses; a division's weight counts only when its status is exactly
//! `"approved"`, and only Secretariat verdicts write that status. The cached
//! progress columns on `projects` are written from [`compute`] and never read
//! back as input.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::milestone::MilestoneStatus;
use crate::types::{Date, DbId};

/// Division status string that makes a weight count.
pub const APPROVED: &str = "approved";

define_text_enum! {
    /// Review status of one division of one milestone.
    DivisionStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

/// The three tracked divisions of every milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Division {
    Timeline,
    Budget,
    Physical,
}

impl Division {
    pub const ALL: [Division; 3] = [Division::Timeline, Division::Budget, Division::Physical];
}

/// The `milestone_updates` payload is not a JSON array of entry objects.
#[derive(Debug, thiserror::Error)]
#[error("malformed milestone_updates payload: {0}")]
pub struct MalformedPayload(pub String);

/// One element of a `milestone_updates` payload.
///
/// Stored payloads come from clients, so weights are kept as raw JSON values
/// and read leniently with [`weight_value`]. Unknown keys survive a
/// read-modify-write through `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MilestoneUpdateEntry {
    #[serde(default, alias = "milestoneId", deserialize_with = "lenient_id")]
    pub milestone_id: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<Value>,
    #[serde(default, alias = "timelineWeight", skip_serializing_if = "Option::is_none")]
    pub timeline_weight: Option<Value>,
    #[serde(default, alias = "timelineStatus", skip_serializing_if = "Option::is_none")]
    pub timeline_status: Option<String>,
    #[serde(default, alias = "budgetWeight", skip_serializing_if = "Option::is_none")]
    pub budget_weight: Option<Value>,
    #[serde(default, alias = "budgetStatus", skip_serializing_if = "Option::is_none")]
    pub budget_status: Option<String>,
    #[serde(default, alias = "physicalWeight", skip_serializing_if = "Option::is_none")]
    pub physical_weight: Option<Value>,
    #[serde(default, alias = "physicalStatus", skip_serializing_if = "Option::is_none")]
    pub physical_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MilestoneUpdateEntry {
    pub fn weight(&self, division: Division) -> f64 {
        let raw = match division {
            Division::Timeline => &self.timeline_weight,
            Division::Budget => &self.budget_weight,
            Division::Physical => &self.physical_weight,
        };
        raw.as_ref().map(weight_value).unwrap_or(0.0)
    }

    pub fn division_status(&self, division: Division) -> Option<&str> {
        let raw = match division {
            Division::Timeline => &self.timeline_status,
            Division::Budget => &self.budget_status,
            Division::Physical => &self.physical_status,
        };
        raw.as_deref().filter(|s| !s.is_empty())
    }

    fn set_division_status(&mut self, division: Division, status: DivisionStatus) {
        let slot = match division {
            Division::Timeline => &mut self.timeline_status,
            Division::Budget => &mut self.budget_status,
            Division::Physical => &mut self.physical_status,
        };
        *slot = Some(status.as_str().to_string());
    }

    fn weight_slot(&mut self, division: Division) -> &mut Option<Value> {
        match division {
            Division::Timeline => &mut self.timeline_weight,
            Division::Budget => &mut self.budget_weight,
            Division::Physical => &mut self.physical_weight,
        }
    }
}

/// Drop every division status a submitter wrote into `entries`.
///
/// Division approval belongs to the Secretariat, so a freshly submitted
/// payload carries weights only. The milestone rows then supply the status
/// until verdicts are merged in.
pub fn clear_division_statuses(entries: &mut [MilestoneUpdateEntry]) {
    for entry in entries {
        entry.timeline_status = None;
        entry.budget_status = None;
        entry.physical_status = None;
    }
}

/// Accepts `12`, `"12"` or null for an id.
fn lenient_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<DbId>, D::Error> {
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Read a weight leniently: numbers as-is, numeric strings parsed, anything
/// else (including NaN/inf) is 0.
pub fn weight_value(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Parse a stored `milestone_updates` value.
///
/// The column holds either a JSON array or a JSON-encoded string of one
/// (older clients double-encoded it). Null means no entries.
pub fn parse_milestone_updates(raw: &Value) -> Result<Vec<MilestoneUpdateEntry>, MalformedPayload> {
    match raw {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => {
            serde_json::from_str(s).map_err(|e| MalformedPayload(e.to_string()))
        }
        Value::Array(_) => {
            serde_json::from_value(raw.clone()).map_err(|e| MalformedPayload(e.to_string()))
        }
        other => Err(MalformedPayload(format!(
            "expected an array, found {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `round(x * 100) / 100`.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn clamp_percent(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

/// Clamp to [0, 100] then round to two decimals.
pub fn report_percent(value: f64) -> f64 {
    round2(clamp_percent(value))
}

/// Per-division percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DivisionProgress {
    pub timeline: f64,
    pub budget: f64,
    pub physical: f64,
}

impl DivisionProgress {
    fn add(&mut self, division: Division, amount: f64) {
        match division {
            Division::Timeline => self.timeline += amount,
            Division::Budget => self.budget += amount,
            Division::Physical => self.physical += amount,
        }
    }

    fn reported(self) -> Self {
        Self {
            timeline: report_percent(self.timeline),
            budget: report_percent(self.budget),
            physical: report_percent(self.physical),
        }
    }
}

/// Sum the weights of approved divisions across all entries.
pub fn division_progress(entries: &[MilestoneUpdateEntry]) -> DivisionProgress {
    let mut totals = DivisionProgress::default();
    for entry in entries {
        for division in Division::ALL {
            if entry.division_status(division) == Some(APPROVED) {
                totals.add(division, entry.weight(division));
            }
        }
    }
    totals.reported()
}

/// Sum of the (already clamped) divisions, clamped again.
pub fn overall_progress(divisions: &DivisionProgress) -> f64 {
    report_percent(divisions.timeline + divisions.budget + divisions.physical)
}

/// Budget utilised, from the approved budget division only.
pub fn amount_spent(total_budget: f64, budget_percentage: f64) -> f64 {
    if budget_percentage > 0.0 && total_budget.is_finite() {
        round2(total_budget * budget_percentage / 100.0)
    } else {
        0.0
    }
}

/// The milestone row as the progress engine sees it.
#[derive(Debug, Clone)]
pub struct MilestoneSnapshot {
    pub id: DbId,
    pub title: String,
    pub weight: f64,
    pub due_date: Option<Date>,
    pub status: MilestoneStatus,
    pub timeline_weight: f64,
    pub budget_weight: f64,
    pub physical_weight: f64,
    pub timeline_status: DivisionStatus,
    pub budget_status: DivisionStatus,
    pub physical_status: DivisionStatus,
}

impl MilestoneSnapshot {
    pub fn weight(&self, division: Division) -> f64 {
        match division {
            Division::Timeline => self.timeline_weight,
            Division::Budget => self.budget_weight,
            Division::Physical => self.physical_weight,
        }
    }

    pub fn division_status(&self, division: Division) -> DivisionStatus {
        match division {
            Division::Timeline => self.timeline_status,
            Division::Budget => self.budget_status,
            Division::Physical => self.physical_status,
        }
    }
}

fn entry_for(entries: &[MilestoneUpdateEntry], id: DbId) -> Option<&MilestoneUpdateEntry> {
    entries.iter().find(|e| e.milestone_id == Some(id))
}

/// Division status of a milestone: update entry, then milestone row.
fn resolved_status<'a>(
    entry: Option<&'a MilestoneUpdateEntry>,
    milestone: &MilestoneSnapshot,
    division: Division,
) -> &'a str {
    entry
        .and_then(|e| e.division_status(division))
        .unwrap_or_else(|| milestone.division_status(division).as_str())
}

/// Share of milestones (by count, not weight) with each division approved.
pub fn internal_division_progress(
    entries: &[MilestoneUpdateEntry],
    milestones: &[MilestoneSnapshot],
) -> DivisionProgress {
    if milestones.is_empty() {
        return DivisionProgress::default();
    }
    let mut approved = DivisionProgress::default();
    for milestone in milestones {
        let entry = entry_for(entries, milestone.id);
        for division in Division::ALL {
            if resolved_status(entry, milestone, division) == APPROVED {
                approved.add(division, 1.0);
            }
        }
    }
    let total = milestones.len() as f64;
    DivisionProgress {
        timeline: approved.timeline / total * 100.0,
        budget: approved.budget / total * 100.0,
        physical: approved.physical / total * 100.0,
    }
    .reported()
}

/// A milestone merged with its entry from the latest update.
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneView {
    pub id: DbId,
    pub title: String,
    pub weight: f64,
    pub due_date: Option<Date>,
    pub status: String,
    pub progress: f64,
    pub timeline_weight: f64,
    pub timeline_status: String,
    pub budget_weight: f64,
    pub budget_status: String,
    pub physical_weight: f64,
    pub physical_status: String,
    pub remarks: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WeightSummary {
    pub total_weight: f64,
    pub applied_weight: f64,
    pub remaining_weight: f64,
}

/// Build the per-milestone view and the weight summary.
///
/// A milestone counts as applied when its resolved status is `completed`.
pub fn milestone_views(
    entries: &[MilestoneUpdateEntry],
    milestones: &[MilestoneSnapshot],
) -> (Vec<MilestoneView>, WeightSummary) {
    let mut total = 0.0;
    let mut applied = 0.0;

    let views = milestones
        .iter()
        .map(|m| {
            let entry = entry_for(entries, m.id);
            let status = entry
                .and_then(|e| e.status.as_deref())
                .filter(|s| !s.is_empty())
                .unwrap_or(m.status.as_str())
                .to_string();

            total += m.weight;
            if status == MilestoneStatus::Completed.as_str() {
                applied += m.weight;
            }

            let division_weight = |d: Division| {
                let from_entry = entry.map(|e| e.weight(d)).unwrap_or(0.0);
                if from_entry > 0.0 {
                    from_entry
                } else {
                    m.weight(d)
                }
            };

            MilestoneView {
                id: m.id,
                title: m.title.clone(),
                weight: m.weight,
                due_date: m.due_date,
                status,
                progress: entry
                    .and_then(|e| e.progress.as_ref())
                    .map(weight_value)
                    .unwrap_or(0.0),
                timeline_weight: division_weight(Division::Timeline),
                timeline_status: resolved_status(entry, m, Division::Timeline).to_string(),
                budget_weight: division_weight(Division::Budget),
                budget_status: resolved_status(entry, m, Division::Budget).to_string(),
                physical_weight: division_weight(Division::Physical),
                physical_status: resolved_status(entry, m, Division::Physical).to_string(),
                remarks: entry.and_then(|e| e.remarks.clone()).unwrap_or_default(),
            }
        })
        .collect();

    let summary = WeightSummary {
        total_weight: round2(total),
        applied_weight: round2(applied),
        remaining_weight: round2(total - applied),
    };
    (views, summary)
}

/// A Secretariat verdict on the divisions of one milestone.
#[derive(Debug, Clone, Deserialize)]
pub struct DivisionVerdict {
    pub milestone_id: DbId,
    pub timeline_status: Option<DivisionStatus>,
    pub budget_status: Option<DivisionStatus>,
    pub physical_status: Option<DivisionStatus>,
}

impl DivisionVerdict {
    pub fn status(&self, division: Division) -> Option<DivisionStatus> {
        match division {
            Division::Timeline => self.timeline_status,
            Division::Budget => self.budget_status,
            Division::Physical => self.physical_status,
        }
    }
}

/// Merge Secretariat verdicts into the update's entries.
///
/// A verdict for a milestone the payload does not mention adds an entry
/// carrying the milestone's division weights; missing weights on existing
/// entries are filled the same way. Verdicts naming an unknown milestone are
/// rejected.
pub fn apply_division_verdicts(
    entries: &mut Vec<MilestoneUpdateEntry>,
    verdicts: &[DivisionVerdict],
    milestones: &[MilestoneSnapshot],
) -> Result<(), String> {
    for verdict in verdicts {
        let milestone = milestones
            .iter()
            .find(|m| m.id == verdict.milestone_id)
            .ok_or_else(|| {
                format!(
                    "Milestone {} does not belong to this project",
                    verdict.milestone_id
                )
            })?;

        let index = match entries
            .iter()
            .position(|e| e.milestone_id == Some(milestone.id))
        {
            Some(i) => i,
            None => {
                entries.push(MilestoneUpdateEntry {
                    milestone_id: Some(milestone.id),
                    ..Default::default()
                });
                entries.len() - 1
            }
        };
        let entry = &mut entries[index];

        for division in Division::ALL {
            let slot = entry.weight_slot(division);
            if slot.is_none() {
                *slot = Some(Value::from(milestone.weight(division)));
            }
            if let Some(status) = verdict.status(division) {
                entry.set_division_status(division, status);
            }
        }
    }
    Ok(())
}

/// Everything `GET /projects/{id}/progress` reports, minus project metadata.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressComputation {
    pub overall: f64,
    pub timeline: f64,
    pub budget: f64,
    pub physical: f64,
    pub internal_timeline: f64,
    pub internal_budget: f64,
    pub internal_physical: f64,
    pub amount_spent: f64,
    pub milestones: Vec<MilestoneView>,
    #[serde(flatten)]
    pub weights: WeightSummary,
    /// Parse error of the latest payload, if any. Callers log it.
    #[serde(skip)]
    pub malformed: Option<String>,
}

/// Compute project progress from the latest milestone-type payload.
///
/// `latest_payload` is `None` when the project has no milestone-type update.
/// A malformed payload is treated as empty: every division is zero.
pub fn compute(
    total_budget: f64,
    milestones: &[MilestoneSnapshot],
    latest_payload: Option<&Value>,
) -> ProgressComputation {
    let (entries, malformed, has_payload) = match latest_payload {
        None => (Vec::new(), None, false),
        Some(raw) => match parse_milestone_updates(raw) {
            Ok(entries) => (entries, None, true),
            Err(e) => (Vec::new(), Some(e.0), false),
        },
    };

    let divisions = division_progress(&entries);
    let internal = if has_payload {
        internal_division_progress(&entries, milestones)
    } else {
        DivisionProgress::default()
    };
    let (views, weights) = milestone_views(&entries, milestones);

    ProgressComputation {
        overall: overall_progress(&divisions),
        timeline: divisions.timeline,
        budget: divisions.budget,
        physical: divisions.physical,
        internal_timeline: internal.timeline,
        internal_budget: internal.budget,
        internal_physical: internal.physical,
        amount_spent: amount_spent(total_budget, divisions.budget),
        milestones: views,
        weights,
        malformed,
    }
}
