use crate::logic::assigner::AssignmentOutcome;
use crate::models::{layout::Assignment, params::OptimizationParams};

/// First pass plus at most one relaxed retry.
pub const MAX_PASSES: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilizationReport {
    pub used_area: f64,
    pub total_area: f64,
    /// Always within 0-100.
    pub percent: f64,
    pub target: f64,
}

impl UtilizationReport {
    pub fn meets_target(&self) -> bool {
        self.percent >= self.target
    }
}

/// Share of `total_area` the placed plants need at full spacing, in percent,
/// capped at 100. Spacing relaxed by a second pass does not count as space saved.
pub fn utilization_percent(assignment: &Assignment, total_area: f64) -> f64 {
    if total_area <= 0.0 {
        return 0.0;
    }
    (assignment.required_area() / total_area * 100.0).clamp(0.0, 100.0)
}

pub fn evaluate(assignment: &Assignment, total_area: f64, target: f64) -> UtilizationReport {
    UtilizationReport {
        used_area: assignment.required_area(),
        total_area,
        percent: utilization_percent(assignment, total_area),
        target,
    }
}

/// A relaxed retry is only worth running when it is enabled, the budget
/// allows another pass, the first pass finished in time, the target was
/// missed, and some plant is still waiting for a spot.
pub fn should_retry(
    report: &UtilizationReport,
    outcome: &AssignmentOutcome,
    params: &OptimizationParams,
    passes_run: u8,
) -> bool {
    params.allow_second_pass
        && params.spacing_slack > 0.0
        && passes_run < MAX_PASSES
        && !outcome.timed_out
        && !report.meets_target()
        && !outcome.unplaced.is_empty()
}

/// Whether the retry result should replace the current one: more plants
/// placed wins, then higher utilization. A timed-out retry never wins.
pub fn improves_on(
    candidate: (&AssignmentOutcome, &UtilizationReport),
    current: (&AssignmentOutcome, &UtilizationReport),
) -> bool {
    let (cand, cand_report) = candidate;
    let (cur, cur_report) = current;
    if cand.timed_out {
        return false;
    }
    let cand_placed = cand.assignment.placed_count();
    let cur_placed = cur.assignment.placed_count();
    cand_placed > cur_placed
        || (cand_placed == cur_placed && cand_report.percent > cur_report.percent)
}
