//! Conversion between polars frames and feature columns

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use polars::prelude::{Column, DataFrame, DataType};

use super::column::{FeatureColumn, FeatureValue, Target};
use super::encoder::WoeSpec;
use super::fit::encode_feature;

/// Convert a polars column into a feature column.
///
/// Numeric dtypes become numeric values, booleans become 0/1, strings and
/// categoricals become category values; nulls become `Missing`. Any other
/// dtype is cast to string.
pub fn feature_from_column(col: &Column) -> Result<FeatureColumn> {
    let name = col.name().to_string();

    let values: Vec<FeatureValue> = if col.dtype().is_primitive_numeric() {
        let float_col = col
            .cast(&DataType::Float64)
            .with_context(|| format!("Failed to cast column '{}' to Float64", name))?;
        float_col.f64()?.into_iter().map(FeatureValue::from).collect()
    } else if matches!(col.dtype(), DataType::Boolean) {
        col.bool()?
            .into_iter()
            .map(|v| FeatureValue::from(v.map(|b| if b { 1.0 } else { 0.0 })))
            .collect()
    } else {
        let string_col = col
            .cast(&DataType::String)
            .with_context(|| format!("Failed to cast column '{}' to String", name))?;
        string_col.str()?.into_iter().map(FeatureValue::from).collect()
    };

    Ok(FeatureColumn::new(name, values))
}

/// Convert a polars column into a binary target; nulls are rejected
pub fn target_from_column(col: &Column) -> Result<Target> {
    let name = col.name().to_string();
    if col.len() == 0 {
        anyhow::bail!("Target column '{}' is empty", name);
    }
    if col.null_count() > 0 {
        anyhow::bail!(
            "Target column '{}' contains {} null value(s)",
            name,
            col.null_count()
        );
    }

    let target = match col.dtype() {
        DataType::Boolean => {
            let values: Vec<bool> = col.bool()?.into_iter().flatten().collect();
            Target::from_bools(&values)
        }
        dtype if dtype.is_primitive_numeric() => {
            let float_col = col.cast(&DataType::Float64)?;
            let values: Vec<f64> = float_col.f64()?.into_iter().flatten().collect();
            Target::from_f64(&values).with_context(|| format!("Invalid target column '{}'", name))?
        }
        other => anyhow::bail!("Target column '{}' has unsupported dtype {}", name, other),
    };
    Ok(target)
}

/// Split a frame into its feature columns and the target
pub fn features_from_frame(df: &DataFrame, target: &str) -> Result<(Vec<FeatureColumn>, Target)> {
    let target_col = df
        .column(target)
        .with_context(|| format!("Target column '{}' not found", target))?;
    let target_values = target_from_column(target_col)?;

    let features = df
        .get_columns()
        .iter()
        .filter(|col| col.name().as_str() != target)
        .map(feature_from_column)
        .collect::<Result<Vec<_>>>()?;

    Ok((features, target_values))
}

/// Replace every column that has a spec with its WoE encoding.
///
/// Columns without a spec are dropped; the remaining order follows the frame.
pub fn encode_frame(df: &DataFrame, specs: &BTreeMap<String, WoeSpec>) -> Result<DataFrame> {
    let mut encoded: Vec<Column> = Vec::with_capacity(specs.len());
    for col in df.get_columns() {
        let Some(spec) = specs.get(col.name().as_str()) else {
            continue;
        };
        let feature = feature_from_column(col)?;
        let woe = encode_feature(&feature, spec)
            .with_context(|| format!("Failed to encode column '{}'", feature.name))?;
        encoded.push(Column::new(col.name().clone(), woe));
    }
    DataFrame::new(encoded).context("Failed to assemble encoded frame")
}
