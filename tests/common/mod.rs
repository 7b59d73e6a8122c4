//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rand::prelude::*;
use rand::SeedableRng;
use tempfile::TempDir;
use woebin::pipeline::{FeatureColumn, FeatureValue, Target};

/// Feature 1..=10 whose lower half are non-events and upper half events
pub fn separable_feature() -> (FeatureColumn, Target) {
    let column = FeatureColumn::numeric("x", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
    let target = Target::new(vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1]).unwrap();
    (column, target)
}

/// Synthetic credit-style sample with known characteristics
///
/// Columns:
/// - `income`: numeric, event rate falls as income rises
/// - `noise`: numeric, unrelated to the target
/// - `grade`: categorical A-E, event rate rises from A to E
/// - `bureau_score`: numeric with "NO_HIT" indicators and 5% missing markers
/// - `constant`: a single value everywhere
pub fn credit_sample(n: usize, seed: u64) -> (Vec<FeatureColumn>, Target) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);

    let mut income = Vec::with_capacity(n);
    let mut noise = Vec::with_capacity(n);
    let mut grade = Vec::with_capacity(n);
    let mut bureau = Vec::with_capacity(n);
    let mut target = Vec::with_capacity(n);

    let grades = ["A", "B", "C", "D", "E"];

    for i in 0..n {
        let inc: f64 = rng.gen_range(10_000.0..150_000.0);
        let g = rng.gen_range(0..grades.len());
        let risk = 0.45 - 0.3 * (inc - 10_000.0) / 140_000.0 + 0.08 * g as f64;
        let is_event = rng.gen::<f64>() < risk.clamp(0.02, 0.95);

        income.push(FeatureValue::Numeric(inc));
        noise.push(FeatureValue::Numeric(rng.gen::<f64>()));
        grade.push(FeatureValue::from(grades[g]));
        bureau.push(if i % 20 == 0 {
            FeatureValue::from("NA")
        } else if i % 13 == 0 {
            FeatureValue::from("NO_HIT")
        } else {
            let score = 700.0 - 150.0 * f64::from(u8::from(is_event)) + rng.gen_range(-80.0..80.0);
            FeatureValue::Numeric(score.round())
        });
        target.push(u8::from(is_event));
    }

    let columns = vec![
        FeatureColumn::new("income", income),
        FeatureColumn::new("noise", noise),
        FeatureColumn::new("grade", grade),
        FeatureColumn::new("bureau_score", bureau),
        FeatureColumn::numeric("constant", &vec![1.0; n]),
    ];
    (columns, Target::new(target).unwrap())
}

/// Create a small test DataFrame with a binary target
pub fn create_test_dataframe() -> DataFrame {
    df! {
        "target" => [0i32, 0, 0, 0, 0, 1, 1, 1, 1, 1],
        "feature_good" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "feature_grade" => ["A", "A", "B", "A", "B", "C", "C", "B", "C", "C"],
        "feature_missing" => [Some(1.0f64), None, None, None, None, None, None, None, None, Some(10.0)],
        "feature_constant" => [5.0f64; 10],
    }
    .unwrap()
}

/// Create a temporary directory for export tests
pub fn create_temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

/// Assert two floats agree within `tol`
pub fn assert_close(actual: f64, expected: f64, tol: f64) {
    assert!(
        (actual - expected).abs() <= tol,
        "expected {} within {} of {}",
        actual,
        tol,
        expected
    );
}
