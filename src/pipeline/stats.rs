//! Shared numeric and statistical helpers
//!
//! Impurity, WoE/IV, the two-sample chi-squared test used for bin merging,
//! boundary rounding and the weighted AUC behind the Gini diagnostic.

/// Calculate Gini impurity for a set of samples
///
/// For binary classification: Gini = 2 * p * (1 - p)
/// where p is the proportion of positive class (events).
pub fn gini_impurity(events: f64, non_events: f64) -> f64 {
    let total = events + non_events;
    if total == 0.0 {
        return 0.0;
    }
    let p = events / total;
    2.0 * p * (1.0 - p)
}

/// Calculate WoE and IV contribution for a bin
///
/// Uses the ln(%bad/%good) convention where:
/// - WoE > 0 indicates higher risk (more events/defaults)
/// - WoE < 0 indicates lower risk (fewer events/defaults)
///
/// When either count of the bin is zero, `smoothing` is added to both counts
/// of that bin so the logarithm stays finite. A bin with no observations
/// at all is neutral: WoE 0 and no IV contribution.
pub fn woe_iv(
    events: u64,
    non_events: u64,
    total_events: u64,
    total_non_events: u64,
    smoothing: f64,
) -> (f64, f64) {
    if total_events == 0 || total_non_events == 0 || events + non_events == 0 {
        return (0.0, 0.0);
    }

    let (e, ne) = if events == 0 || non_events == 0 {
        (events as f64 + smoothing, non_events as f64 + smoothing)
    } else {
        (events as f64, non_events as f64)
    };

    let dist_events = e / total_events as f64;
    let dist_non_events = ne / total_non_events as f64;

    let woe = (dist_events / dist_non_events).ln();
    let iv_contrib = (dist_events - dist_non_events) * woe;

    (woe, iv_contrib)
}

/// p-value of Pearson's chi-squared test of independence on a 2x2 table.
///
/// Compares the event rates of two groups given as (events, total) pairs.
/// One degree of freedom, no continuity correction. Tables with an empty
/// row or column carry no evidence of a difference and yield 1.0.
pub fn chi_squared_p_value(a_events: u64, a_total: u64, b_events: u64, b_total: u64) -> f64 {
    let a = a_events as f64;
    let b = a_total.saturating_sub(a_events) as f64;
    let c = b_events as f64;
    let d = b_total.saturating_sub(b_events) as f64;
    let n = a + b + c + d;

    let row_a = a + b;
    let row_b = c + d;
    let col_events = a + c;
    let col_non_events = b + d;

    if row_a == 0.0 || row_b == 0.0 || col_events == 0.0 || col_non_events == 0.0 {
        return 1.0;
    }

    let cross = a * d - b * c;
    let statistic = n * cross * cross / (row_a * row_b * col_events * col_non_events);

    chi_squared_sf_1df(statistic)
}

/// Survival function of the chi-squared distribution with one degree of
/// freedom: P(X > x) = erfc(sqrt(x / 2)).
pub fn chi_squared_sf_1df(statistic: f64) -> f64 {
    if statistic <= 0.0 {
        return 1.0;
    }
    erfc((statistic / 2.0).sqrt()).clamp(0.0, 1.0)
}

/// Complementary error function (Chebyshev fit, fractional error < 1.2e-7)
pub fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = -z * z - 1.265_512_23
        + t * (1.000_023_68
            + t * (0.374_091_96
                + t * (0.096_784_18
                    + t * (-0.186_288_06
                        + t * (0.278_868_07
                            + t * (-1.135_203_98
                                + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77))))))));
    let r = t * poly.exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}

/// Round `value` to the nearest multiple of `accuracy`.
///
/// Power-of-ten accuracies round through decimal scaling so that e.g. 5.5
/// stays exactly 5.5 at an accuracy of 1e-6.
pub fn round_to_accuracy(value: f64, accuracy: f64) -> f64 {
    if !value.is_finite() || accuracy.is_nan() || accuracy <= 0.0 {
        return value;
    }

    let decimals = -accuracy.log10();
    let rounded = if (decimals - decimals.round()).abs() < 1e-9 && (0.0..=15.0).contains(&decimals.round()) {
        let scale = 10f64.powi(decimals.round() as i32);
        (value * scale).round() / scale
    } else {
        (value / accuracy).round() * accuracy
    };

    if rounded.is_finite() {
        rounded
    } else {
        value
    }
}

/// Calculate weighted AUC using weighted Mann-Whitney U statistic
///
/// Input is (score, is_event, weight) tuples sorted ascending by score.
/// For weighted data, instead of counting samples, we sum their weights.
pub fn weighted_auc(sorted: &[(f64, bool, f64)]) -> f64 {
    let total_pos: f64 = sorted.iter().filter(|(_, e, _)| *e).map(|(_, _, w)| w).sum();
    let total_neg: f64 = sorted.iter().filter(|(_, e, _)| !*e).map(|(_, _, w)| w).sum();

    if total_pos <= 0.0 || total_neg <= 0.0 {
        return 0.5;
    }

    let n = sorted.len();
    let mut weighted_rank_sum_pos = 0.0;
    let mut cumulative_weight = 0.0;
    let mut i = 0;

    while i < n {
        let current_value = sorted[i].0;
        let mut j = i;

        // Find all ties with same value
        while j < n && (sorted[j].0 - current_value).abs() < 1e-10 {
            j += 1;
        }

        let group_weight: f64 = sorted[i..j].iter().map(|(_, _, w)| w).sum();
        let avg_rank = cumulative_weight + group_weight / 2.0;

        for &(_, is_event, weight) in &sorted[i..j] {
            if is_event {
                weighted_rank_sum_pos += avg_rank * weight;
            }
        }

        cumulative_weight += group_weight;
        i = j;
    }

    let u = weighted_rank_sum_pos - total_pos * total_pos / 2.0;
    (u / (total_pos * total_neg)).clamp(0.0, 1.0)
}

/// Gini coefficient (2 * AUC - 1) of a grouped encoding.
///
/// Each group is (score, events, non_events); groups with equal scores tie.
pub fn gini_from_groups(groups: &[(f64, u64, u64)]) -> f64 {
    let mut weighted: Vec<(f64, bool, f64)> = Vec::with_capacity(groups.len() * 2);
    for &(score, events, non_events) in groups {
        if events > 0 {
            weighted.push((score, true, events as f64));
        }
        if non_events > 0 {
            weighted.push((score, false, non_events as f64));
        }
    }
    if weighted.is_empty() {
        return 0.0;
    }
    weighted.sort_by(|a, b| a.0.total_cmp(&b.0));
    2.0 * weighted_auc(&weighted) - 1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gini_impurity() {
        // Pure node (all one class) should have 0 impurity
        assert!((gini_impurity(0.0, 10.0) - 0.0).abs() < 0.01);
        assert!((gini_impurity(10.0, 0.0) - 0.0).abs() < 0.01);

        // 50/50 split should have maximum impurity (0.5)
        assert!((gini_impurity(5.0, 5.0) - 0.5).abs() < 0.01);

        let skewed = gini_impurity(9.0, 1.0);
        assert!(skewed < 0.5, "Skewed split should have lower impurity than 50/50");
        assert!(skewed > 0.0, "Non-pure split should have positive impurity");
    }

    #[test]
    fn test_woe_iv_calculation() {
        // Bin mirrors the overall distribution
        let (woe, iv) = woe_iv(10, 90, 100, 900, 0.5);
        assert!(woe.abs() < 1e-12, "WoE should be 0 for equal distributions, got {}", woe);
        assert!(iv.abs() < 1e-12);

        // Riskier bin
        let (woe, iv) = woe_iv(30, 70, 100, 900, 0.5);
        assert!(woe > 0.0, "Higher event rate should give positive WoE");
        assert!(iv > 0.0);
    }

    #[test]
    fn test_woe_zero_count_is_finite() {
        let (woe, iv) = woe_iv(0, 50, 50, 100, 0.5);
        assert!(woe.is_finite() && woe < 0.0, "got {}", woe);
        assert!(iv.is_finite() && iv > 0.0);

        let (woe, _) = woe_iv(50, 0, 50, 100, 0.5);
        assert!(woe.is_finite() && woe > 0.0);
    }

    #[test]
    fn test_empty_bin_is_neutral() {
        // Smoothing an empty bin would give ln(NE/E) with E != NE
        assert_eq!(woe_iv(0, 0, 20, 60, 0.5), (0.0, 0.0));
    }

    #[test]
    fn test_erfc_reference_values() {
        assert!((erfc(0.0) - 1.0).abs() < 1e-7);
        assert!((erfc(1.0) - 0.157_299_207).abs() < 1e-7);
        assert!((erfc(-1.0) - 1.842_700_793).abs() < 1e-7);
        assert!(erfc(6.0) < 1e-15);
    }

    #[test]
    fn test_chi_squared_p_value() {
        // Same event rate -> no evidence of difference
        let p_same = chi_squared_p_value(10, 100, 20, 200);
        assert!((p_same - 1.0).abs() < 1e-6, "got {}", p_same);

        // Very different rates -> tiny p-value
        let p_diff = chi_squared_p_value(5, 100, 60, 100);
        assert!(p_diff < 1e-6, "got {}", p_diff);

        // 3.841 is the 95% quantile of chi2(1)
        assert!((chi_squared_sf_1df(3.841_458_8) - 0.05).abs() < 1e-5);

        // Degenerate tables
        assert_eq!(chi_squared_p_value(0, 10, 0, 10), 1.0);
        assert_eq!(chi_squared_p_value(0, 0, 3, 10), 1.0);
    }

    #[test]
    fn test_round_to_accuracy() {
        assert_eq!(round_to_accuracy(5.5, 1e-6), 5.5);
        assert_eq!(round_to_accuracy(5.500_000_4, 1e-6), 5.5);
        assert_eq!(round_to_accuracy(0.123_456_789, 1e-3), 0.123);
        assert_eq!(round_to_accuracy(17.0, 5.0), 15.0);
        assert_eq!(round_to_accuracy(f64::INFINITY, 1e-6), f64::INFINITY);
    }

    #[test]
    fn test_weighted_auc_calculation() {
        // Perfect separation: all 0s have lower values than all 1s (weight=1.0)
        let perfect = vec![(1.0, false, 1.0), (2.0, false, 1.0), (3.0, true, 1.0), (4.0, true, 1.0)];
        let auc = weighted_auc(&perfect);
        assert!((auc - 1.0).abs() < 0.01, "Perfect separation should give AUC ≈ 1.0, got {}", auc);

        // No discrimination: 0s and 1s have same values (ties)
        let no_disc = vec![(1.0, false, 1.0), (1.0, true, 1.0), (2.0, false, 1.0), (2.0, true, 1.0)];
        let auc = weighted_auc(&no_disc);
        assert!((auc - 0.5).abs() < 0.1, "No discrimination should give AUC ≈ 0.5, got {}", auc);
    }

    #[test]
    fn test_gini_from_groups() {
        let gini = gini_from_groups(&[(-1.0, 0, 5), (1.0, 5, 0)]);
        assert!((gini - 1.0).abs() < 1e-9, "got {}", gini);

        let flat = gini_from_groups(&[(0.0, 5, 5)]);
        assert!(flat.abs() < 1e-9);
    }
}
