//! Feature columns, cell values and the binary target

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Tolerance for floating point comparison when checking binary 0/1 values
const TOLERANCE: f64 = 1e-9;

/// A single raw feature cell
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Category(String),
    Missing,
}

impl FeatureValue {
    /// True for `Missing` and for numeric `NaN`
    pub fn is_missing(&self) -> bool {
        match self {
            FeatureValue::Missing => true,
            FeatureValue::Numeric(v) => v.is_nan(),
            FeatureValue::Category(_) => false,
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Numeric(v)
    }
}

impl From<Option<f64>> for FeatureValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(FeatureValue::Missing, FeatureValue::Numeric)
    }
}

impl From<&str> for FeatureValue {
    fn from(v: &str) -> Self {
        FeatureValue::Category(v.to_string())
    }
}

impl From<Option<&str>> for FeatureValue {
    fn from(v: Option<&str>) -> Self {
        v.map_or(FeatureValue::Missing, FeatureValue::from)
    }
}

impl From<String> for FeatureValue {
    fn from(v: String) -> Self {
        FeatureValue::Category(v)
    }
}

/// Value type of a column, derived from its non-missing cells
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    /// Numeric values mixed with categorical indicator strings
    Mixed,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
            ColumnKind::Mixed => write!(f, "mixed"),
        }
    }
}

/// A named feature column, positionally aligned with a [`Target`]
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureColumn {
    pub name: String,
    pub values: Vec<FeatureValue>,
}

impl FeatureColumn {
    pub fn new(name: impl Into<String>, values: Vec<FeatureValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Build a numeric column; `NaN` entries count as missing
    pub fn numeric(name: impl Into<String>, values: &[f64]) -> Self {
        Self::new(name, values.iter().map(|&v| FeatureValue::Numeric(v)).collect())
    }

    pub fn numeric_opt(name: impl Into<String>, values: &[Option<f64>]) -> Self {
        Self::new(name, values.iter().map(|&v| FeatureValue::from(v)).collect())
    }

    pub fn categorical(name: impl Into<String>, values: &[&str]) -> Self {
        Self::new(name, values.iter().map(|&v| FeatureValue::from(v)).collect())
    }

    pub fn categorical_opt(name: impl Into<String>, values: &[Option<&str>]) -> Self {
        Self::new(name, values.iter().map(|&v| FeatureValue::from(v)).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Kind of the column from its non-missing values.
    ///
    /// A column with no non-missing values reports `Numeric`.
    pub fn kind(&self) -> ColumnKind {
        let mut has_numeric = false;
        let mut has_category = false;
        for value in &self.values {
            match value {
                FeatureValue::Numeric(v) if !v.is_nan() => has_numeric = true,
                FeatureValue::Category(_) => has_category = true,
                _ => {}
            }
        }
        match (has_numeric, has_category) {
            (true, true) => ColumnKind::Mixed,
            (false, true) => ColumnKind::Categorical,
            _ => ColumnKind::Numeric,
        }
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }
}

/// Binary target: 1 = event, 0 = non-event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    values: Vec<u8>,
}

impl Target {
    pub fn new(values: Vec<u8>) -> Result<Self, ValidationError> {
        if let Some(pos) = values.iter().position(|&v| v > 1) {
            return Err(ValidationError::InvalidTarget {
                reason: format!("found value {} at row {}", values[pos], pos),
            });
        }
        Ok(Self { values })
    }

    pub fn from_i32(values: &[i32]) -> Result<Self, ValidationError> {
        values
            .iter()
            .enumerate()
            .map(|(row, &v)| match v {
                0 => Ok(0u8),
                1 => Ok(1u8),
                other => Err(ValidationError::InvalidTarget {
                    reason: format!("found value {} at row {}", other, row),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|values| Self { values })
    }

    pub fn from_bools(values: &[bool]) -> Self {
        Self {
            values: values.iter().map(|&b| u8::from(b)).collect(),
        }
    }

    /// Accepts float-encoded targets with values within 1e-9 of 0.0 or 1.0
    pub fn from_f64(values: &[f64]) -> Result<Self, ValidationError> {
        values
            .iter()
            .enumerate()
            .map(|(row, &v)| {
                if (v - 0.0).abs() < TOLERANCE {
                    Ok(0u8)
                } else if (v - 1.0).abs() < TOLERANCE {
                    Ok(1u8)
                } else {
                    Err(ValidationError::InvalidTarget {
                        reason: format!("found value {} at row {}", v, row),
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|values| Self { values })
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_event(&self, row: usize) -> bool {
        self.values[row] == 1
    }

    pub fn events(&self) -> u64 {
        self.values.iter().filter(|&&v| v == 1).count() as u64
    }

    pub fn non_events(&self) -> u64 {
        self.values.len() as u64 - self.events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_detection() {
        assert_eq!(FeatureColumn::numeric("a", &[1.0, 2.0]).kind(), ColumnKind::Numeric);
        assert_eq!(FeatureColumn::categorical("b", &["x", "y"]).kind(), ColumnKind::Categorical);

        let mixed = FeatureColumn::new(
            "c",
            vec![FeatureValue::Numeric(1.0), FeatureValue::from("n/a-code")],
        );
        assert_eq!(mixed.kind(), ColumnKind::Mixed);

        let all_missing = FeatureColumn::numeric_opt("d", &[None, None]);
        assert_eq!(all_missing.kind(), ColumnKind::Numeric);
    }

    #[test]
    fn test_nan_counts_as_missing() {
        let col = FeatureColumn::numeric("a", &[1.0, f64::NAN, 3.0]);
        assert_eq!(col.missing_count(), 1);
    }

    #[test]
    fn test_target_rejects_non_binary() {
        assert!(Target::new(vec![0, 1, 2]).is_err());
        assert!(Target::from_i32(&[0, 1, -1]).is_err());
        let err = Target::from_f64(&[0.0, 0.5]).unwrap_err();
        assert!(err.to_string().contains("must be binary"));
    }

    #[test]
    fn test_target_from_float_with_tolerance() {
        let target = Target::from_f64(&[0.0, 1.0, 1.0 - 1e-12]).unwrap();
        assert_eq!(target.values(), &[0, 1, 1]);
        assert_eq!(target.events(), 2);
        assert_eq!(target.non_events(), 1);
    }
}
