//! Merging of adjacent candidate bins
//!
//! The statistical pass merges neighbours whose event rates are not
//! significantly different; the monotonic pass merges neighbours whose WoE
//! breaks the configured trend.

use super::partition::Segment;
use crate::pipeline::monotonicity::MonotonicityConstraint;
use crate::pipeline::stats::{chi_squared_p_value, woe_iv};

fn pair_p_value<K>(left: &Segment<K>, right: &Segment<K>) -> f64 {
    chi_squared_p_value(left.events, left.total(), right.events, right.total())
}

fn merge_at<K>(segments: &mut Vec<Segment<K>>, idx: usize) {
    let right = segments.remove(idx + 1);
    segments[idx].absorb(right);
}

/// Repeatedly merge the least significantly different adjacent pair
///
/// The pair with the largest chi-squared p-value is merged while that
/// p-value exceeds `significance_threshold`. Ties go to the leftmost pair.
pub(crate) fn merge_insignificant<K>(segments: &mut Vec<Segment<K>>, significance_threshold: f64) {
    while segments.len() > 1 {
        let mut best_idx = 0;
        let mut best_p = f64::NEG_INFINITY;
        for i in 0..segments.len() - 1 {
            let p = pair_p_value(&segments[i], &segments[i + 1]);
            if p > best_p {
                best_p = p;
                best_idx = i;
            }
        }

        if best_p <= significance_threshold {
            break;
        }

        tracing::debug!(
            pair = best_idx,
            p_value = best_p,
            threshold = significance_threshold,
            "merging indistinguishable bins"
        );
        merge_at(segments, best_idx);
    }
}

/// Merge adjacent segments until their WoE follows the constraint
///
/// `Auto` resolves its direction once, from the first and last segment
/// before any merging. Among violating pairs the one with the largest
/// p-value is merged first.
pub(crate) fn enforce_monotonicity<K>(
    segments: &mut Vec<Segment<K>>,
    constraint: MonotonicityConstraint,
    total_events: u64,
    total_non_events: u64,
    smoothing: f64,
) {
    let segment_woe = |s: &Segment<K>| woe_iv(s.events, s.non_events, total_events, total_non_events, smoothing).0;

    let woes: Vec<f64> = segments.iter().map(segment_woe).collect();
    let Some(direction) = constraint.resolve(&woes) else {
        return;
    };

    loop {
        let woes: Vec<f64> = segments.iter().map(segment_woe).collect();
        let mut candidate: Option<(usize, f64)> = None;
        for i in 0..woes.len().saturating_sub(1) {
            if !direction.violated_by(woes[i], woes[i + 1]) {
                continue;
            }
            let p = pair_p_value(&segments[i], &segments[i + 1]);
            if candidate.map_or(true, |(_, best)| p > best) {
                candidate = Some((i, p));
            }
        }

        match candidate {
            Some((idx, p)) => {
                tracing::debug!(pair = idx, p_value = p, ?direction, "merging non-monotone bins");
                merge_at(segments, idx);
            }
            None => break,
        }
    }
}
