//! Weight-of-Evidence encoding
//!
//! Per-bin statistics, Information Value and the deployable [`WoeSpec`]
//! that maps any value, including unseen ones, to a WoE number.

use serde::{Deserialize, Serialize};

use super::binning::Bin;
use super::column::{ColumnKind, FeatureColumn, FeatureValue, Target};
use super::config::{EncodingConfig, DEFAULT_SMOOTHING};
use super::error::EncodingError;
use super::stats::{gini_from_groups, woe_iv};
use super::validator::CleaningRules;

/// How values outside every fitted bin are encoded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Out-of-range numbers take the nearest edge interval's WoE; unseen
    /// categories and unbinned missing values take the most populated bin's WoE
    #[default]
    NearestBin,
    /// Every uncovered value encodes to 0.0
    Neutral,
}

impl std::fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackPolicy::NearestBin => write!(f, "nearest_bin"),
            FallbackPolicy::Neutral => write!(f, "neutral"),
        }
    }
}

impl std::str::FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest_bin" | "nearest" | "nearestbin" => Ok(FallbackPolicy::NearestBin),
            "neutral" | "zero" => Ok(FallbackPolicy::Neutral),
            _ => Err(format!(
                "Unknown fallback policy: '{}'. Use 'nearest_bin' or 'neutral'.",
                s
            )),
        }
    }
}

/// Counts and WoE for one bin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinStatistics {
    pub event_count: u64,
    pub non_event_count: u64,
    pub woe: f64,
    pub iv_contribution: f64,
}

impl BinStatistics {
    pub fn count(&self) -> u64 {
        self.event_count + self.non_event_count
    }

    pub fn event_rate(&self) -> f64 {
        if self.count() == 0 {
            0.0
        } else {
            self.event_count as f64 / self.count() as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WoeBin {
    pub bin: Bin,
    pub stats: BinStatistics,
}

/// Deployable bin → WoE mapping for one feature
///
/// Immutable once fitted. Lookups are pure and apply the fit-time cleaning
/// rules to raw values, so the same spec reproduces the same encoding in
/// any process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WoeSpec {
    feature: String,
    kind: ColumnKind,
    bins: Vec<WoeBin>,
    fallback_policy: FallbackPolicy,
    fallback_woe: f64,
    iv: f64,
    smoothing: f64,
    #[serde(default)]
    cleaning: CleaningRules,
}

impl WoeSpec {
    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    /// Bins with their fitted statistics, in spec order
    pub fn woe_bins(&self) -> &[WoeBin] {
        &self.bins
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.fallback_policy
    }

    pub fn fallback_woe(&self) -> f64 {
        self.fallback_woe
    }

    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    pub fn cleaning(&self) -> &CleaningRules {
        &self.cleaning
    }

    pub fn bins(&self) -> Vec<&Bin> {
        self.bins.iter().map(|b| &b.bin).collect()
    }

    pub fn woe(&self) -> Vec<f64> {
        self.bins.iter().map(|b| b.stats.woe).collect()
    }

    pub fn iv(&self) -> f64 {
        self.iv
    }

    /// Gini coefficient of the WoE encoding on the fitted sample
    pub fn gini(&self) -> f64 {
        let groups: Vec<(f64, u64, u64)> = self
            .bins
            .iter()
            .map(|b| (b.stats.woe, b.stats.event_count, b.stats.non_event_count))
            .collect();
        gini_from_groups(&groups)
    }

    fn interval_count(&self) -> usize {
        self.bins.iter().take_while(|b| b.bin.is_interval()).count()
    }

    /// Check internal consistency.
    ///
    /// Intervals come first and are contiguous, category groups follow with
    /// no category in more than one group, and at most one missing bin comes
    /// last. The bin types must agree with the declared kind.
    pub fn validate(&self) -> Result<(), EncodingError> {
        let mismatch = |detail: String| EncodingError::DomainMismatch {
            feature: self.feature.clone(),
            detail,
        };

        if self.bins.iter().all(|b| b.bin.is_missing()) {
            return Err(mismatch("no value bins".to_string()));
        }

        let n_intervals = self.interval_count();
        let mut seen_categories = std::collections::BTreeSet::new();
        let mut seen_missing = false;
        let mut prev_upper: Option<f64> = None;

        for (i, woe_bin) in self.bins.iter().enumerate() {
            if seen_missing {
                return Err(mismatch(format!("bin {} follows the missing bin", i)));
            }
            match &woe_bin.bin {
                Bin::Interval { lower, upper } => {
                    if i >= n_intervals {
                        return Err(mismatch(format!("interval bin {} is not with the other intervals", i)));
                    }
                    if !lower.is_finite() || !upper.is_finite() || lower > upper {
                        return Err(mismatch(format!("bin {} has invalid bounds [{}, {})", i, lower, upper)));
                    }
                    if let Some(prev) = prev_upper {
                        if prev != *lower {
                            return Err(mismatch(format!(
                                "gap or overlap between {} and {} at bin {}",
                                prev, lower, i
                            )));
                        }
                    }
                    if lower == upper && i + 1 != n_intervals {
                        return Err(mismatch(format!("empty interval at bin {}", i)));
                    }
                    prev_upper = Some(*upper);
                }
                Bin::Categories { categories } => {
                    if categories.is_empty() {
                        return Err(mismatch(format!("category group {} is empty", i)));
                    }
                    for c in categories {
                        if !seen_categories.insert(c.as_str()) {
                            return Err(mismatch(format!("category '{}' appears in more than one bin", c)));
                        }
                    }
                }
                Bin::Missing => seen_missing = true,
            }
            if !woe_bin.stats.woe.is_finite() || !woe_bin.stats.iv_contribution.is_finite() {
                return Err(mismatch(format!("bin {} has a non-finite WoE", i)));
            }
        }

        let has_categories = !seen_categories.is_empty();
        match self.kind {
            ColumnKind::Numeric if has_categories => {
                return Err(mismatch("numeric feature has category bins".to_string()))
            }
            ColumnKind::Categorical if n_intervals > 0 => {
                return Err(mismatch("categorical feature has interval bins".to_string()))
            }
            _ => {}
        }

        if !self.fallback_woe.is_finite() || !self.iv.is_finite() {
            return Err(mismatch("non-finite fallback WoE or IV".to_string()));
        }
        Ok(())
    }

    /// WoE for a single raw value; never fails
    pub fn lookup(&self, value: &FeatureValue) -> f64 {
        match self.cleaning.clean(value) {
            FeatureValue::Missing => self
                .bins
                .iter()
                .find(|b| b.bin.is_missing())
                .map_or(self.fallback_woe, |b| b.stats.woe),
            FeatureValue::Numeric(x) => self.lookup_numeric(x),
            FeatureValue::Category(c) => self
                .bins
                .iter()
                .find(|b| matches!(&b.bin, Bin::Categories { categories } if categories.contains(&c)))
                .map_or(self.fallback_woe, |b| b.stats.woe),
        }
    }

    fn lookup_numeric(&self, x: f64) -> f64 {
        let intervals = &self.bins[..self.interval_count()];
        let (Some(first), Some(last)) = (intervals.first(), intervals.last()) else {
            return self.fallback_woe;
        };
        let (Bin::Interval { lower: min, .. }, Bin::Interval { upper: max, .. }) = (&first.bin, &last.bin) else {
            return self.fallback_woe;
        };

        if x < *min || x > *max {
            return match self.fallback_policy {
                FallbackPolicy::NearestBin if x < *min => first.stats.woe,
                FallbackPolicy::NearestBin => last.stats.woe,
                FallbackPolicy::Neutral => self.fallback_woe,
            };
        }

        let idx = intervals.partition_point(|b| match b.bin {
            Bin::Interval { upper, .. } => upper <= x,
            _ => false,
        });
        intervals
            .get(idx)
            .unwrap_or(last)
            .stats
            .woe
    }

    /// Encode a raw column, one WoE per row in input order
    pub fn transform(&self, column: &FeatureColumn) -> Result<Vec<f64>, EncodingError> {
        self.validate()?;
        Ok(column.values.iter().map(|v| self.lookup(v)).collect())
    }

    pub fn to_json(&self) -> Result<String, EncodingError> {
        serde_json::to_string_pretty(self).map_err(|e| EncodingError::Serialization(e.to_string()))
    }

    /// Deserialize and validate a spec
    pub fn from_json(json: &str) -> Result<Self, EncodingError> {
        let spec: WoeSpec =
            serde_json::from_str(json).map_err(|e| EncodingError::Serialization(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }
}

/// Encode `column` with a fitted spec
pub fn transform(column: &FeatureColumn, spec: &WoeSpec) -> Result<Vec<f64>, EncodingError> {
    spec.transform(column)
}

/// Fits per-bin statistics and owns the resulting spec
#[derive(Debug, Clone)]
pub struct WoeEncoder {
    config: EncodingConfig,
    smoothing: f64,
    cleaning: CleaningRules,
    spec: Option<WoeSpec>,
}

impl Default for WoeEncoder {
    fn default() -> Self {
        Self::new(EncodingConfig::default(), DEFAULT_SMOOTHING)
    }
}

impl WoeEncoder {
    pub fn new(config: EncodingConfig, smoothing: f64) -> Self {
        Self {
            config,
            smoothing,
            cleaning: CleaningRules::default(),
            spec: None,
        }
    }

    /// Cleaning rules recorded in the fitted spec
    pub fn with_cleaning(mut self, cleaning: CleaningRules) -> Self {
        self.cleaning = cleaning;
        self
    }

    /// Wrap a deployed spec for transform-only use
    pub fn from_spec(spec: WoeSpec) -> Result<Self, EncodingError> {
        spec.validate()?;
        Ok(Self {
            config: EncodingConfig {
                fallback: spec.fallback_policy,
            },
            smoothing: spec.smoothing,
            cleaning: spec.cleaning.clone(),
            spec: Some(spec),
        })
    }

    /// Compute statistics for `bins` on a column.
    ///
    /// Values are cleaned with the encoder's rules first. Every value must
    /// then fall in one of the bins; values the bins leave uncovered are a
    /// `DomainMismatch`.
    pub fn fit(&mut self, column: &FeatureColumn, target: &Target, bins: &[Bin]) -> Result<&WoeSpec, EncodingError> {
        if column.len() != target.len() {
            return Err(EncodingError::LengthMismatch {
                feature: column.name.clone(),
                column_len: column.len(),
                target_len: target.len(),
            });
        }
        let total_events = target.events();
        let total_non_events = target.non_events();
        if total_events == 0 || total_non_events == 0 {
            return Err(EncodingError::DegenerateTarget {
                feature: column.name.clone(),
            });
        }

        let n_intervals = bins.iter().take_while(|b| b.is_interval()).count();
        let mut counts = vec![(0u64, 0u64); bins.len()];
        let mut uncovered = 0usize;

        let cleaned = self.cleaning.clean_column(column);
        for (row, value) in cleaned.values.iter().enumerate() {
            match locate(bins, n_intervals, value) {
                Some(idx) => {
                    if target.is_event(row) {
                        counts[idx].0 += 1;
                    } else {
                        counts[idx].1 += 1;
                    }
                }
                None => uncovered += 1,
            }
        }

        if uncovered > 0 {
            return Err(EncodingError::DomainMismatch {
                feature: column.name.clone(),
                detail: format!("{} value(s) fall outside every bin", uncovered),
            });
        }

        let woe_bins: Vec<WoeBin> = bins
            .iter()
            .zip(&counts)
            .map(|(bin, &(events, non_events))| {
                let (woe, iv_contribution) =
                    woe_iv(events, non_events, total_events, total_non_events, self.smoothing);
                WoeBin {
                    bin: bin.clone(),
                    stats: BinStatistics {
                        event_count: events,
                        non_event_count: non_events,
                        woe,
                        iv_contribution,
                    },
                }
            })
            .collect();

        let iv = woe_bins.iter().map(|b| b.stats.iv_contribution).sum();
        let fallback_woe = match self.config.fallback {
            FallbackPolicy::Neutral => 0.0,
            FallbackPolicy::NearestBin => most_populated_woe(&woe_bins),
        };

        let spec = WoeSpec {
            feature: column.name.clone(),
            kind: cleaned.kind(),
            bins: woe_bins,
            fallback_policy: self.config.fallback,
            fallback_woe,
            iv,
            smoothing: self.smoothing,
            cleaning: self.cleaning.clone(),
        };
        spec.validate()?;

        tracing::debug!(feature = %spec.feature, bins = spec.bins.len(), iv = spec.iv, "fitted WoE spec");
        Ok(self.spec.insert(spec))
    }

    pub fn spec(&self) -> Result<&WoeSpec, EncodingError> {
        self.spec.as_ref().ok_or(EncodingError::NotFitted)
    }

    pub fn transform(&self, column: &FeatureColumn) -> Result<Vec<f64>, EncodingError> {
        self.spec()?.transform(column)
    }

    pub fn into_spec(self) -> Result<WoeSpec, EncodingError> {
        self.spec.ok_or(EncodingError::NotFitted)
    }
}

/// Index of the bin holding `value`, without any fallback
fn locate(bins: &[Bin], n_intervals: usize, value: &FeatureValue) -> Option<usize> {
    if value.is_missing() {
        return bins.iter().position(Bin::is_missing);
    }
    if let FeatureValue::Numeric(x) = value {
        let idx = bins[..n_intervals].partition_point(|b| match b {
            Bin::Interval { upper, .. } => *upper <= *x,
            _ => false,
        });
        if idx < n_intervals && bins[idx].contains(value, idx + 1 == n_intervals) {
            return Some(idx);
        }
        // Value equal to the closed right edge of the last interval
        if idx == n_intervals && n_intervals > 0 && bins[n_intervals - 1].contains(value, true) {
            return Some(n_intervals - 1);
        }
        return None;
    }
    bins.iter().position(|b| b.contains(value, false))
}

fn most_populated_woe(bins: &[WoeBin]) -> f64 {
    let mut best: Option<&WoeBin> = None;
    for b in bins {
        if best.map_or(true, |cur| b.stats.count() > cur.stats.count()) {
            best = Some(b);
        }
    }
    best.map_or(0.0, |b| b.stats.woe)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> (FeatureColumn, Target, Vec<Bin>) {
        let column = FeatureColumn::numeric_opt(
            "x",
            &[Some(1.0), Some(2.0), Some(3.0), Some(4.0), None, Some(6.0), Some(7.0), Some(8.0)],
        );
        let target = Target::new(vec![0, 0, 1, 0, 1, 1, 1, 0]).unwrap();
        let bins = vec![
            Bin::Interval { lower: 1.0, upper: 3.5 },
            Bin::Interval { lower: 3.5, upper: 8.0 },
            Bin::Missing,
        ];
        (column, target, bins)
    }

    #[test]
    fn test_fit_counts_and_iv() {
        let (column, target, bins) = scenario();
        let mut encoder = WoeEncoder::default();
        let spec = encoder.fit(&column, &target, &bins).unwrap();

        assert_eq!(spec.bins[0].stats.event_count, 1);
        assert_eq!(spec.bins[0].stats.non_event_count, 2);
        assert_eq!(spec.bins[1].stats.event_count, 2);
        assert_eq!(spec.bins[1].stats.non_event_count, 2);
        assert_eq!(spec.bins[2].stats.event_count, 1);

        let sum: f64 = spec.bins.iter().map(|b| b.stats.iv_contribution).sum();
        assert!((spec.iv() - sum).abs() < 1e-12);
        assert!(spec.iv() >= 0.0);
        assert!(spec.woe()[0] < spec.woe()[1]);
    }

    #[test]
    fn test_lookup_edges_and_fallback() {
        let (column, target, bins) = scenario();
        let mut encoder = WoeEncoder::default();
        let spec = encoder.fit(&column, &target, &bins).unwrap().clone();
        let woe = spec.woe();

        assert_eq!(spec.lookup(&FeatureValue::Numeric(1.0)), woe[0]);
        assert_eq!(spec.lookup(&FeatureValue::Numeric(3.5)), woe[1]);
        assert_eq!(spec.lookup(&FeatureValue::Numeric(8.0)), woe[1]);
        assert_eq!(spec.lookup(&FeatureValue::Missing), woe[2]);

        // Outside the fitted range: nearest edge interval
        assert_eq!(spec.lookup(&FeatureValue::Numeric(-100.0)), woe[0]);
        assert_eq!(spec.lookup(&FeatureValue::Numeric(1e9)), woe[1]);

        // Unseen category: most populated bin
        assert_eq!(spec.lookup(&FeatureValue::from("GOLD")), spec.fallback_woe);
        assert_eq!(spec.fallback_woe, woe[1]);
    }

    #[test]
    fn test_neutral_fallback() {
        let (column, target, bins) = scenario();
        let config = EncodingConfig {
            fallback: FallbackPolicy::Neutral,
        };
        let mut encoder = WoeEncoder::new(config, 0.5);
        let spec = encoder.fit(&column, &target, &bins).unwrap();
        assert_eq!(spec.fallback_woe, 0.0);
        assert_eq!(spec.lookup(&FeatureValue::Numeric(99.0)), 0.0);
        assert_eq!(spec.lookup(&FeatureValue::from("GOLD")), 0.0);
    }

    #[test]
    fn test_transform_before_fit() {
        let encoder = WoeEncoder::default();
        let column = FeatureColumn::numeric("x", &[1.0]);
        assert!(matches!(encoder.transform(&column), Err(EncodingError::NotFitted)));
    }

    #[test]
    fn test_uncovered_values_are_domain_mismatch() {
        let (column, target, _) = scenario();
        let bins = vec![Bin::Interval { lower: 1.0, upper: 8.0 }];
        let mut encoder = WoeEncoder::default();
        let err = encoder.fit(&column, &target, &bins).unwrap_err();
        assert!(matches!(err, EncodingError::DomainMismatch { .. }), "{}", err);
    }

    #[test]
    fn test_validate_rejects_gaps_and_duplicates() {
        let (column, target, bins) = scenario();
        let mut encoder = WoeEncoder::default();
        let mut spec = encoder.fit(&column, &target, &bins).unwrap().clone();

        if let Bin::Interval { lower, .. } = &mut spec.bins[1].bin {
            *lower = 4.0;
        }
        assert!(spec.validate().is_err());

        let groups = vec![
            Bin::Categories {
                categories: ["a", "b"].iter().map(|s| s.to_string()).collect(),
            },
            Bin::Categories {
                categories: ["b"].iter().map(|s| s.to_string()).collect(),
            },
        ];
        let column = FeatureColumn::categorical("c", &["a", "b"]);
        let err = WoeEncoder::default()
            .fit(&column, &Target::new(vec![0, 1]).unwrap(), &groups)
            .unwrap_err();
        assert!(err.to_string().contains("more than one bin"), "{}", err);
    }

    #[test]
    fn test_json_round_trip_is_exact() {
        let (column, target, bins) = scenario();
        let mut encoder = WoeEncoder::default();
        let spec = encoder.fit(&column, &target, &bins).unwrap().clone();

        let json = spec.to_json().unwrap();
        let restored = WoeSpec::from_json(&json).unwrap();
        assert_eq!(restored, spec);
        assert_eq!(restored.to_json().unwrap(), json);
        for (a, b) in restored.woe().iter().zip(spec.woe()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }

        let redeployed = WoeEncoder::from_spec(restored).unwrap();
        assert_eq!(
            redeployed.transform(&column).unwrap(),
            transform(&column, &spec).unwrap()
        );
    }

    #[test]
    fn test_lookup_cleans_raw_values() {
        let (column, target, bins) = scenario();
        let mut encoder = WoeEncoder::default();
        let spec = encoder.fit(&column, &target, &bins).unwrap().clone();
        let woe = spec.woe();

        assert_eq!(spec.lookup(&FeatureValue::Numeric(f64::INFINITY)), woe[2]);
        assert_eq!(spec.lookup(&FeatureValue::Numeric(f64::NAN)), woe[2]);
        assert_eq!(spec.lookup(&FeatureValue::from(" NA ")), woe[2]);
        assert_eq!(spec.lookup(&FeatureValue::from("2")), woe[0]);
        assert_eq!(spec.lookup(&FeatureValue::from("7.5")), woe[1]);
    }

    #[test]
    fn test_spec_without_cleaning_section_uses_defaults() {
        let (column, target, bins) = scenario();
        let mut encoder = WoeEncoder::default();
        let spec = encoder.fit(&column, &target, &bins).unwrap().clone();

        let mut value = serde_json::to_value(&spec).unwrap();
        value.as_object_mut().unwrap().remove("cleaning");
        let restored = WoeSpec::from_json(&value.to_string()).unwrap();
        assert_eq!(restored.cleaning(), &CleaningRules::default());
        assert_eq!(restored, spec);
    }

    #[test]
    fn test_fallback_policy_parsing() {
        assert_eq!("nearest".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::NearestBin);
        assert_eq!("NEUTRAL".parse::<FallbackPolicy>().unwrap(), FallbackPolicy::Neutral);
        assert!("closest".parse::<FallbackPolicy>().is_err());
        assert_eq!(FallbackPolicy::NearestBin.to_string(), "nearest_bin");
    }
}
