//! Milestone weight rules.
//!
//! A project's milestone weights are percentage shares that must not exceed
//! 100 in total, and must equal 100 before the project is submitted to the
//! Secretariat. Each milestone weight is split across the three divisions.

use serde::Serialize;

use crate::progress::round2;

define_text_enum! {
    MilestoneStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Delayed => "delayed",
    }
}

/// Tolerance for weight sums, absorbing two-decimal rounding.
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// Float slack so a difference of exactly one cent passes.
const EPSILON: f64 = 1e-9;

/// Timeline, budget and physical shares of one milestone weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DivisionWeights {
    pub timeline: f64,
    pub budget: f64,
    pub physical: f64,
}

impl DivisionWeights {
    pub fn sum(&self) -> f64 {
        self.timeline + self.budget + self.physical
    }
}

/// Default three-way split. Physical takes the rounding remainder.
pub fn split_division_weights(weight: f64) -> DivisionWeights {
    let third = round2(weight / 3.0);
    DivisionWeights {
        timeline: third,
        budget: third,
        physical: round2(weight - 2.0 * third),
    }
}

pub fn validate_weight(weight: f64) -> Result<(), String> {
    if !weight.is_finite() || weight <= 0.0 || weight > 100.0 {
        return Err("Milestone weight must be greater than 0 and at most 100".to_string());
    }
    Ok(())
}

/// Use the caller's division weights when all three are given, otherwise
/// split the milestone weight evenly.
pub fn resolve_division_weights(
    weight: f64,
    timeline: Option<f64>,
    budget: Option<f64>,
    physical: Option<f64>,
) -> Result<DivisionWeights, String> {
    validate_weight(weight)?;
    match (timeline, budget, physical) {
        (None, None, None) => Ok(split_division_weights(weight)),
        (Some(timeline), Some(budget), Some(physical)) => {
            let weights = DivisionWeights { timeline, budget, physical };
            if [timeline, budget, physical]
                .iter()
                .any(|w| !w.is_finite() || *w < 0.0)
            {
                return Err("Division weights must be non-negative".to_string());
            }
            if (weights.sum() - weight).abs() > WEIGHT_TOLERANCE + EPSILON {
                return Err(format!(
                    "Division weights sum to {:.2} but the milestone weight is {:.2}",
                    weights.sum(),
                    weight
                ));
            }
            Ok(weights)
        }
        _ => Err(
            "Provide all three division weights (timeline, budget, physical) or none".to_string(),
        ),
    }
}

/// Check that adding `new_weight` to the other milestones keeps the project
/// total at or below 100.
pub fn validate_weight_total(other_weights: f64, new_weight: f64) -> Result<(), String> {
    let total = other_weights + new_weight;
    if total > 100.0 + WEIGHT_TOLERANCE + EPSILON {
        return Err(format!(
            "Total milestone weight would be {:.2}%; the remaining weight is {:.2}%",
            total,
            (100.0 - other_weights).max(0.0)
        ));
    }
    Ok(())
}

/// Summary returned by the weights endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeightReport {
    pub total_weight: f64,
    pub is_complete: bool,
    pub remaining_weight: f64,
    pub milestone_count: usize,
}

pub fn weight_report(weights: &[f64]) -> WeightReport {
    let total: f64 = weights.iter().sum();
    WeightReport {
        total_weight: round2(total),
        is_complete: weights_complete(total),
        remaining_weight: round2((100.0 - total).max(0.0)),
        milestone_count: weights.len(),
    }
}

pub fn weights_complete(total: f64) -> bool {
    (total - 100.0).abs() <= WEIGHT_TOLERANCE + EPSILON
}

/// Milestone status after the Secretariat approves an update claiming
/// `final_progress`. `None` leaves the status unchanged.
pub fn status_after_approval(final_progress: f64) -> Option<MilestoneStatus> {
    if final_progress >= 100.0 {
        Some(MilestoneStatus::Completed)
    } else if final_progress > 0.0 {
        Some(MilestoneStatus::InProgress)
    } else {
        None
    }
}
