//! Supervised binning
//!
//! Derives bins from a cleaned feature column and the binary target:
//! recursive Gini split search, a chi-squared merge pass, optional
//! monotonic merging and boundary rounding. Numeric values become
//! intervals, categorical values become category groups, and missing
//! values get a sentinel bin of their own.

mod merge;
mod partition;
mod rounding;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::column::{FeatureColumn, FeatureValue, Target};
use super::config::{BinningConfig, DEFAULT_SMOOTHING};
use super::error::BinningError;
use merge::{enforce_monotonicity, merge_insignificant};
use partition::{find_split_points, min_leaf_size, segments_from_splits, singleton_segments, CountGroup, Segment};
use rounding::round_boundaries;

/// One bin of a fitted feature
///
/// Intervals are half-open `[lower, upper)`; the last interval of a feature
/// is also closed on the right so its observed maximum is covered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Bin {
    Interval { lower: f64, upper: f64 },
    Categories { categories: BTreeSet<String> },
    Missing,
}

impl Bin {
    pub fn is_interval(&self) -> bool {
        matches!(self, Bin::Interval { .. })
    }

    pub fn is_categories(&self) -> bool {
        matches!(self, Bin::Categories { .. })
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Bin::Missing)
    }

    /// Whether `value` falls in this bin; `closed_right` marks the last interval
    pub fn contains(&self, value: &FeatureValue, closed_right: bool) -> bool {
        match (self, value) {
            (Bin::Missing, v) => v.is_missing(),
            (Bin::Interval { lower, upper }, FeatureValue::Numeric(x)) => {
                *x >= *lower && (*x < *upper || (closed_right && *x <= *upper))
            }
            (Bin::Categories { categories }, FeatureValue::Category(c)) => categories.contains(c),
            _ => false,
        }
    }
}

impl std::fmt::Display for Bin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bin::Interval { lower, upper } => write!(f, "[{}, {})", lower, upper),
            Bin::Categories { categories } => {
                let names: Vec<&str> = categories.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", names.join(", "))
            }
            Bin::Missing => write!(f, "MISSING"),
        }
    }
}

/// Produces an ordered bin list for one feature
pub trait Binner {
    fn fit(&self, column: &FeatureColumn, target: &Target) -> Result<Vec<Bin>, BinningError>;
}

/// Bins derived from the target by split search and merging
#[derive(Debug, Clone)]
pub struct SupervisedBinner {
    config: BinningConfig,
    smoothing: f64,
}

impl Default for SupervisedBinner {
    fn default() -> Self {
        Self::new(BinningConfig::default(), DEFAULT_SMOOTHING)
    }
}

/// Fixed bins supplied by the caller, e.g. from domain knowledge
#[derive(Debug, Clone, PartialEq)]
pub struct PreSpecifiedBinner {
    bins: Vec<Bin>,
}

impl PreSpecifiedBinner {
    pub fn new(bins: Vec<Bin>) -> Self {
        Self { bins }
    }

    /// Contiguous intervals over the given edges plus a missing bin
    pub fn from_edges(edges: &[f64]) -> Self {
        let mut bins: Vec<Bin> = edges
            .windows(2)
            .map(|w| Bin::Interval {
                lower: w[0],
                upper: w[1],
            })
            .collect();
        bins.push(Bin::Missing);
        Self { bins }
    }
}

impl Binner for PreSpecifiedBinner {
    fn fit(&self, column: &FeatureColumn, target: &Target) -> Result<Vec<Bin>, BinningError> {
        check_lengths(column, target)?;
        Ok(self.bins.clone())
    }
}

impl SupervisedBinner {
    pub fn new(config: BinningConfig, smoothing: f64) -> Self {
        Self { config, smoothing }
    }

    pub fn config(&self) -> &BinningConfig {
        &self.config
    }

    /// Bin the numeric part: sorted distinct values to interval edges
    fn bin_numeric(&self, groups: Vec<CountGroup<f64>>, totals: (u64, u64)) -> Vec<Bin> {
        let (Some(min), Some(max)) = (groups.first().map(|g| g.key), groups.last().map(|g| g.key)) else {
            return Vec::new();
        };

        let mut segments = self.search(&groups);
        if groups.len() >= self.config.min_bins {
            merge_insignificant(&mut segments, self.config.significance_threshold);
        }
        enforce_monotonicity(&mut segments, self.config.monotonicity, totals.0, totals.1, self.smoothing);

        let raw_boundaries: Vec<f64> = segments
            .windows(2)
            .filter_map(|w| match (w[0].members.last(), w[1].members.first()) {
                (Some(&left), Some(&right)) => Some(left + (right - left) / 2.0),
                _ => None,
            })
            .collect();
        let boundaries = round_boundaries(&raw_boundaries, min, max, self.config.numeric_accuracy);

        let edges: Vec<f64> = std::iter::once(min)
            .chain(boundaries)
            .chain(std::iter::once(max))
            .collect();
        edges
            .windows(2)
            .map(|w| Bin::Interval {
                lower: w[0],
                upper: w[1],
            })
            .collect()
    }

    /// Bin the categorical part: categories ordered by event rate, then grouped
    fn bin_categories(&self, mut groups: Vec<CountGroup<String>>) -> Vec<Bin> {
        groups.sort_by(|a, b| {
            let rate_a = a.events as f64 / a.total() as f64;
            let rate_b = b.events as f64 / b.total() as f64;
            rate_b.total_cmp(&rate_a).then_with(|| a.key.cmp(&b.key))
        });

        let mut segments = self.search(&groups);
        if groups.len() >= self.config.min_bins {
            merge_insignificant(&mut segments, self.config.significance_threshold);
        }

        segments
            .into_iter()
            .map(|s| Bin::Categories {
                categories: s.members.into_iter().collect(),
            })
            .collect()
    }

    /// Split search, or one segment per group when there are too few groups
    fn search<K: Clone>(&self, groups: &[CountGroup<K>]) -> Vec<Segment<K>> {
        if groups.len() < self.config.min_bins {
            return singleton_segments(groups);
        }
        let n: u64 = groups.iter().map(|g| g.total()).sum();
        let min_leaf = min_leaf_size(n as usize, self.config.min_leaf_count, self.config.min_leaf_fraction);
        let splits = find_split_points(groups, self.config.max_depth, min_leaf);
        segments_from_splits(groups, &splits)
    }
}

impl Binner for SupervisedBinner {
    fn fit(&self, column: &FeatureColumn, target: &Target) -> Result<Vec<Bin>, BinningError> {
        check_lengths(column, target)?;

        let mut numeric: Vec<(f64, bool)> = Vec::new();
        let mut categories: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
        let mut missing = 0usize;

        for (row, value) in column.values.iter().enumerate() {
            let is_event = target.is_event(row);
            match value {
                FeatureValue::Numeric(v) if v.is_finite() => numeric.push((*v, is_event)),
                FeatureValue::Category(c) => {
                    let counts = categories.entry(c.as_str()).or_insert((0, 0));
                    if is_event {
                        counts.0 += 1;
                    } else {
                        counts.1 += 1;
                    }
                }
                _ => missing += 1,
            }
        }

        let observations = column.len() - missing;
        if observations == 0 {
            return Err(BinningError::NoBinnableValues {
                feature: column.name.clone(),
            });
        }
        if observations < 2 {
            return Err(BinningError::InsufficientData {
                feature: column.name.clone(),
                observations,
            });
        }

        let totals = (target.events(), target.non_events());
        if totals.0 == 0 || totals.1 == 0 {
            return Err(BinningError::DegenerateTarget {
                feature: column.name.clone(),
            });
        }

        numeric.sort_by(|a, b| a.0.total_cmp(&b.0));
        let numeric_groups = group_sorted(&numeric);
        let category_groups: Vec<CountGroup<String>> = categories
            .into_iter()
            .map(|(key, (events, non_events))| CountGroup {
                key: key.to_string(),
                events,
                non_events,
            })
            .collect();

        let mut bins = self.bin_numeric(numeric_groups, totals);
        bins.extend(self.bin_categories(category_groups));
        if missing > 0 {
            bins.push(Bin::Missing);
        }

        tracing::debug!(
            feature = %column.name,
            bins = bins.len(),
            missing,
            "binned feature"
        );
        Ok(bins)
    }
}

fn check_lengths(column: &FeatureColumn, target: &Target) -> Result<(), BinningError> {
    if column.len() != target.len() {
        return Err(BinningError::LengthMismatch {
            feature: column.name.clone(),
            column_len: column.len(),
            target_len: target.len(),
        });
    }
    Ok(())
}

/// Collapse sorted (value, is_event) pairs into per-value count groups
fn group_sorted(sorted: &[(f64, bool)]) -> Vec<CountGroup<f64>> {
    let mut groups: Vec<CountGroup<f64>> = Vec::new();
    for &(value, is_event) in sorted {
        match groups.last_mut() {
            Some(last) if last.key == value => {
                if is_event {
                    last.events += 1;
                } else {
                    last.non_events += 1;
                }
            }
            _ => groups.push(CountGroup {
                key: value,
                events: u64::from(is_event),
                non_events: u64::from(!is_event),
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::monotonicity::MonotonicityConstraint;

    fn scenario_config() -> BinningConfig {
        BinningConfig {
            max_depth: 1,
            min_leaf_fraction: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_separable_feature_splits_at_midpoint() {
        let column = FeatureColumn::numeric("x", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        let target = Target::new(vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1]).unwrap();
        let bins = SupervisedBinner::new(scenario_config(), 0.5).fit(&column, &target).unwrap();
        assert_eq!(
            bins,
            vec![
                Bin::Interval { lower: 1.0, upper: 5.5 },
                Bin::Interval { lower: 5.5, upper: 10.0 },
            ]
        );
    }

    #[test]
    fn test_few_distinct_values_get_own_bins() {
        let column = FeatureColumn::numeric("x", &[1.0, 1.0, 2.0, 2.0, 1.0, 2.0]);
        let target = Target::new(vec![0, 1, 0, 1, 1, 0]).unwrap();
        let bins = SupervisedBinner::default().fit(&column, &target).unwrap();
        assert_eq!(
            bins,
            vec![
                Bin::Interval { lower: 1.0, upper: 1.5 },
                Bin::Interval { lower: 1.5, upper: 2.0 },
            ]
        );
    }

    #[test]
    fn test_missing_values_get_sentinel_bin() {
        let column = FeatureColumn::numeric_opt("x", &[Some(1.0), None, Some(3.0), Some(4.0)]);
        let target = Target::new(vec![0, 1, 1, 0]).unwrap();
        let bins = SupervisedBinner::default().fit(&column, &target).unwrap();
        assert_eq!(bins.last(), Some(&Bin::Missing));
        assert_eq!(bins.iter().filter(|b| b.is_missing()).count(), 1);
    }

    #[test]
    fn test_categories_grouped_by_event_rate() {
        let mut values = Vec::new();
        let mut target = Vec::new();
        for (cat, events, non_events) in [("A", 2, 38), ("B", 3, 37), ("C", 30, 10), ("D", 29, 11)] {
            for i in 0..(events + non_events) {
                values.push(cat);
                target.push(u8::from(i < events));
            }
        }
        let column = FeatureColumn::categorical("grade", &values);
        let target = Target::new(target).unwrap();
        let bins = SupervisedBinner::default().fit(&column, &target).unwrap();

        let high: BTreeSet<String> = ["C", "D"].iter().map(|s| s.to_string()).collect();
        let low: BTreeSet<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
        assert_eq!(
            bins,
            vec![Bin::Categories { categories: high }, Bin::Categories { categories: low }]
        );
    }

    #[test]
    fn test_mixed_column_has_both_parts() {
        let mut values = Vec::new();
        let mut target = Vec::new();
        for i in 0..20 {
            values.push(FeatureValue::Numeric(i as f64));
            target.push(u8::from(i >= 10));
        }
        for i in 0..6 {
            values.push(FeatureValue::from("NO_HIT"));
            target.push(u8::from(i % 2 == 0));
        }
        let column = FeatureColumn::new("bureau", values);
        let bins = SupervisedBinner::default()
            .fit(&column, &Target::new(target).unwrap())
            .unwrap();
        assert!(bins.iter().any(Bin::is_interval));
        let last = bins.last().unwrap();
        assert!(last.is_categories());
    }

    #[test]
    fn test_monotone_intervals() {
        // Event rate rises, dips, then rises again
        let mut values = Vec::new();
        let mut target = Vec::new();
        for (start, rate) in [(0, 0.1), (100, 0.5), (200, 0.3), (300, 0.8)] {
            for i in 0..100 {
                values.push((start + i) as f64);
                target.push(u8::from((i as f64) < rate * 100.0));
            }
        }
        let column = FeatureColumn::numeric("x", &values);
        let target = Target::new(target).unwrap();
        let config = BinningConfig {
            monotonicity: MonotonicityConstraint::Ascending,
            ..Default::default()
        };
        let binner = SupervisedBinner::new(config, 0.5);
        let bins = binner.fit(&column, &target).unwrap();

        let woes: Vec<f64> = bins
            .iter()
            .enumerate()
            .map(|(i, bin)| {
                let last = i + 1 == bins.len();
                let (mut events, mut non_events) = (0u64, 0u64);
                for (row, v) in column.values.iter().enumerate() {
                    if bin.contains(v, last) {
                        if target.is_event(row) {
                            events += 1;
                        } else {
                            non_events += 1;
                        }
                    }
                }
                crate::pipeline::stats::woe_iv(events, non_events, target.events(), target.non_events(), 0.5).0
            })
            .collect();
        assert!(woes.windows(2).all(|w| w[0] <= w[1]), "{:?}", woes);
    }

    #[test]
    fn test_errors() {
        let target = Target::new(vec![0, 1]).unwrap();
        let binner = SupervisedBinner::default();

        let only_missing = FeatureColumn::numeric_opt("m", &[None, None]);
        assert!(matches!(
            binner.fit(&only_missing, &target),
            Err(BinningError::NoBinnableValues { .. })
        ));

        let one_obs = FeatureColumn::numeric_opt("o", &[Some(1.0), None]);
        assert!(matches!(
            binner.fit(&one_obs, &target),
            Err(BinningError::InsufficientData { observations: 1, .. })
        ));

        let flat_target = Target::new(vec![1, 1]).unwrap();
        let column = FeatureColumn::numeric("f", &[1.0, 2.0]);
        assert!(matches!(
            binner.fit(&column, &flat_target),
            Err(BinningError::DegenerateTarget { .. })
        ));

        let short = FeatureColumn::numeric("s", &[1.0]);
        assert!(matches!(
            binner.fit(&short, &target),
            Err(BinningError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_deterministic() {
        let values: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64 / 7.0).collect();
        let target: Vec<u8> = (0..200).map(|i| u8::from((i * 37) % 101 > 60)).collect();
        let column = FeatureColumn::numeric("x", &values);
        let target = Target::new(target).unwrap();
        let binner = SupervisedBinner::default();
        assert_eq!(binner.fit(&column, &target).unwrap(), binner.fit(&column, &target).unwrap());
    }

    #[test]
    fn test_pre_specified_binner() {
        let binner = PreSpecifiedBinner::from_edges(&[0.0, 10.0, 20.0]);
        let column = FeatureColumn::numeric("x", &[1.0, 15.0]);
        let bins = binner.fit(&column, &Target::new(vec![0, 1]).unwrap()).unwrap();
        assert_eq!(bins.len(), 3);
        assert!(bins[2].is_missing());
    }

    #[test]
    fn test_bin_contains() {
        let bin = Bin::Interval { lower: 1.0, upper: 2.0 };
        assert!(bin.contains(&FeatureValue::Numeric(1.0), false));
        assert!(!bin.contains(&FeatureValue::Numeric(2.0), false));
        assert!(bin.contains(&FeatureValue::Numeric(2.0), true));
        assert!(Bin::Missing.contains(&FeatureValue::Numeric(f64::NAN), false));
        assert!(!bin.contains(&FeatureValue::from("1.5"), true));
    }
}
