//! Boundary rounding for numeric intervals

use crate::pipeline::stats::round_to_accuracy;

/// Round interior boundaries to `accuracy` and freeze them.
///
/// Input boundaries must be ascending. A rounded boundary is dropped when it
/// collapses onto the previous kept boundary or falls outside the open range
/// `(min, max)`, so the output stays strictly ascending.
pub(crate) fn round_boundaries(boundaries: &[f64], min: f64, max: f64, accuracy: f64) -> Vec<f64> {
    let mut frozen: Vec<f64> = Vec::with_capacity(boundaries.len());
    for &boundary in boundaries {
        let rounded = round_to_accuracy(boundary, accuracy);
        if rounded <= min || rounded >= max {
            tracing::debug!(boundary, rounded, min, max, "dropping boundary outside range");
            continue;
        }
        if frozen.last().is_some_and(|&prev| rounded <= prev) {
            tracing::debug!(boundary, rounded, "dropping collapsed boundary");
            continue;
        }
        frozen.push(rounded);
    }
    frozen
}
