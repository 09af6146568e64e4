//! Metric values
//!
//! A metric either has a finite value for a run or it is [`Unavailable`]
//! with a machine-readable reason. There is no NaN in between.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a metric could not be computed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    /// A required pattern matched no counter in the run
    NoMatches,
    /// A ratio denominator summed to exactly zero
    DivisionByZero,
    /// A matched counter (or the result) is not a finite number
    NonNumericValue,
}

impl Unavailable {
    /// Stable reason code, as written to exports.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoMatches => "no_matches",
            Self::DivisionByZero => "division_by_zero",
            Self::NonNumericValue => "non_numeric_value",
        }
    }

    /// Parse a reason code produced by [`Unavailable::code`].
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "no_matches" => Some(Self::NoMatches),
            "division_by_zero" => Some(Self::DivisionByZero),
            "non_numeric_value" => Some(Self::NonNumericValue),
            _ => None,
        }
    }
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Result of applying one rule to one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricValue {
    /// A finite derived value
    Value(f64),
    /// The metric could not be computed
    Unavailable(Unavailable),
}

impl MetricValue {
    /// The value, or `None` when unavailable.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Unavailable(_) => None,
        }
    }

    /// The reason, or `None` when a value is present.
    #[must_use]
    pub const fn unavailable(&self) -> Option<Unavailable> {
        match self {
            Self::Value(_) => None,
            Self::Unavailable(reason) => Some(*reason),
        }
    }

    /// Check if a value is present.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Value(_))
    }
}

impl From<std::result::Result<f64, Unavailable>> for MetricValue {
    fn from(result: std::result::Result<f64, Unavailable>) -> Self {
        match result {
            Ok(v) => Self::Value(v),
            Err(reason) => Self::Unavailable(reason),
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Unavailable(reason) => write!(f, "n/a({reason})"),
        }
    }
}
