//! Greedy Gini-impurity split search over one ordered axis
//!
//! The axis is a sequence of count groups: distinct numeric values in
//! ascending order, or categories in descending event-rate order. Splits
//! fall between groups, never inside one.

use crate::pipeline::stats::gini_impurity;

/// Gains closer than this are treated as equal; the earlier boundary wins
const GAIN_TOLERANCE: f64 = 1e-12;

/// Event/non-event counts for one distinct key on the axis
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CountGroup<K> {
    pub key: K,
    pub events: u64,
    pub non_events: u64,
}

impl<K> CountGroup<K> {
    pub fn total(&self) -> u64 {
        self.events + self.non_events
    }
}

/// A run of adjacent groups that forms one candidate bin
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Segment<K> {
    pub members: Vec<K>,
    pub events: u64,
    pub non_events: u64,
}

impl<K> Segment<K> {
    pub fn total(&self) -> u64 {
        self.events + self.non_events
    }

    /// Absorb the segment immediately to the right
    pub fn absorb(&mut self, right: Segment<K>) {
        self.members.extend(right.members);
        self.events += right.events;
        self.non_events += right.non_events;
    }
}

/// Effective minimum leaf population for `n` observations: the larger of the
/// absolute count and the fraction of `n`, and never below one
pub(crate) fn min_leaf_size(n: usize, min_leaf_count: usize, min_leaf_fraction: f64) -> usize {
    let from_fraction = (min_leaf_fraction * n as f64).ceil() as usize;
    min_leaf_count.max(from_fraction).max(1)
}

/// Find the split that maximises Gini impurity reduction
///
/// Returns the index of the first group of the right-hand side together
/// with the gain, or `None` when no split has positive gain while leaving
/// at least `min_leaf` observations on each side.
pub(crate) fn find_best_split<K>(groups: &[CountGroup<K>], min_leaf: usize) -> Option<(usize, f64)> {
    if groups.len() < 2 {
        return None;
    }

    let total_events: u64 = groups.iter().map(|g| g.events).sum();
    let total_non_events: u64 = groups.iter().map(|g| g.non_events).sum();
    let total = (total_events + total_non_events) as f64;
    if (total as usize) < 2 * min_leaf {
        return None;
    }

    let parent_gini = gini_impurity(total_events as f64, total_non_events as f64);

    let mut best_gain = 0.0;
    let mut best_split_idx = None;

    let mut left_events = 0u64;
    let mut left_non_events = 0u64;

    for i in 0..groups.len() - 1 {
        left_events += groups[i].events;
        left_non_events += groups[i].non_events;

        let left_count = left_events + left_non_events;
        let right_events = total_events - left_events;
        let right_non_events = total_non_events - left_non_events;
        let right_count = right_events + right_non_events;

        if (left_count as usize) < min_leaf || (right_count as usize) < min_leaf {
            continue;
        }

        let left_gini = gini_impurity(left_events as f64, left_non_events as f64);
        let right_gini = gini_impurity(right_events as f64, right_non_events as f64);
        let weighted_child_gini =
            (left_count as f64 / total) * left_gini + (right_count as f64 / total) * right_gini;

        let gain = parent_gini - weighted_child_gini;
        if gain > best_gain + GAIN_TOLERANCE {
            best_gain = gain;
            best_split_idx = Some(i + 1);
        }
    }

    best_split_idx.map(|idx| (idx, best_gain))
}

/// Recursively split up to `max_depth` levels deep
///
/// Returns the sorted group indices at which a new leaf starts.
pub(crate) fn find_split_points<K>(groups: &[CountGroup<K>], max_depth: usize, min_leaf: usize) -> Vec<usize> {
    let mut split_indices = Vec::new();
    split_recursive(groups, 0, max_depth, min_leaf, &mut split_indices);
    split_indices.sort_unstable();
    split_indices
}

fn split_recursive<K>(
    groups: &[CountGroup<K>],
    offset: usize,
    depth_left: usize,
    min_leaf: usize,
    split_indices: &mut Vec<usize>,
) {
    if depth_left == 0 {
        return;
    }

    if let Some((local_idx, gain)) = find_best_split(groups, min_leaf) {
        let global_idx = offset + local_idx;
        tracing::debug!(split_at = global_idx, gain, depth_left, "accepted split");
        split_indices.push(global_idx);

        let (left, right) = groups.split_at(local_idx);
        split_recursive(left, offset, depth_left - 1, min_leaf, split_indices);
        split_recursive(right, global_idx, depth_left - 1, min_leaf, split_indices);
    }
}

/// Cut the axis into segments at the given sorted split indices
pub(crate) fn segments_from_splits<K: Clone>(groups: &[CountGroup<K>], split_indices: &[usize]) -> Vec<Segment<K>> {
    let mut segments = Vec::with_capacity(split_indices.len() + 1);
    let mut start = 0;
    for &end in split_indices.iter().chain(std::iter::once(&groups.len())) {
        if end <= start || end > groups.len() {
            continue;
        }
        let slice = &groups[start..end];
        segments.push(Segment {
            members: slice.iter().map(|g| g.key.clone()).collect(),
            events: slice.iter().map(|g| g.events).sum(),
            non_events: slice.iter().map(|g| g.non_events).sum(),
        });
        start = end;
    }
    segments
}

/// One segment per group
pub(crate) fn singleton_segments<K: Clone>(groups: &[CountGroup<K>]) -> Vec<Segment<K>> {
    groups
        .iter()
        .map(|g| Segment {
            members: vec![g.key.clone()],
            events: g.events,
            non_events: g.non_events,
        })
        .collect()
}
