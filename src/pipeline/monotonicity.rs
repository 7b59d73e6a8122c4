//! Monotonicity constraints for interval bins
//!
//! Defines the WoE trend that the binner can enforce across ordered
//! numeric intervals after the statistical merge pass.

use serde::{Deserialize, Serialize};

/// Monotonicity constraint for the WoE pattern of numeric intervals
///
/// Monotone WoE is a common regulatory requirement for credit scorecards.
/// Category groups and the missing bin are never constrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonotonicityConstraint {
    /// No monotonicity constraint - WoE can vary freely
    #[default]
    None,
    /// WoE must not decrease with feature value (higher values = higher risk)
    Ascending,
    /// WoE must not increase with feature value (higher values = lower risk)
    Descending,
    /// Pick ascending or descending from the trend between the outer intervals
    Auto,
}

/// Concrete direction once `Auto` has been resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Ascending,
    Descending,
}

impl MonotonicityConstraint {
    /// Resolve the direction to enforce given the per-interval WoE sequence.
    ///
    /// Returns `None` when no constraint applies.
    pub(crate) fn resolve(self, woes: &[f64]) -> Option<Direction> {
        match self {
            MonotonicityConstraint::None => None,
            MonotonicityConstraint::Ascending => Some(Direction::Ascending),
            MonotonicityConstraint::Descending => Some(Direction::Descending),
            MonotonicityConstraint::Auto => match (woes.first(), woes.last()) {
                (Some(first), Some(last)) if last < first => Some(Direction::Descending),
                (Some(_), Some(_)) => Some(Direction::Ascending),
                _ => None,
            },
        }
    }
}

impl Direction {
    /// True when `next` breaks the trend relative to `prev`
    pub(crate) fn violated_by(self, prev: f64, next: f64) -> bool {
        match self {
            Direction::Ascending => next < prev,
            Direction::Descending => next > prev,
        }
    }
}

impl std::fmt::Display for MonotonicityConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonotonicityConstraint::None => write!(f, "none"),
            MonotonicityConstraint::Ascending => write!(f, "ascending"),
            MonotonicityConstraint::Descending => write!(f, "descending"),
            MonotonicityConstraint::Auto => write!(f, "auto"),
        }
    }
}

impl std::str::FromStr for MonotonicityConstraint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(MonotonicityConstraint::None),
            "ascending" | "asc" => Ok(MonotonicityConstraint::Ascending),
            "descending" | "desc" => Ok(MonotonicityConstraint::Descending),
            "auto" => Ok(MonotonicityConstraint::Auto),
            _ => Err(format!(
                "Unknown monotonicity constraint: '{}'. Use 'none', 'ascending', 'descending', or 'auto'.",
                s
            )),
        }
    }
}
