// GPA Aggregator - credit-weighted average of grade points

use crate::store::CourseRecord;

/// Round to two decimal places, exact ties to the even digit (3.125 -> 3.12)
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Credit-weighted GPA over `records`, rounded to 2 places.
///
/// Returns 0.0 for an empty slice. Callers that need to tell "no courses"
/// apart from a real 0.0 must check emptiness themselves.
pub fn compute_gpa(records: &[CourseRecord]) -> f64 {
    let (total_points, total_credits) = records.iter().fold((0.0, 0.0), |(points, credits), r| {
        (points + r.grade.points() * r.credits, credits + r.credits)
    });

    if total_credits > 0.0 {
        round2(total_points / total_credits)
    } else {
        0.0
    }
}
