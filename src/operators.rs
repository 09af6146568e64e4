//! Reduction operators
//!
//! An operator turns the resolved value-sets of a rule (one set per pattern,
//! in pattern order) into a single scalar. Operators are pure functions looked
//! up in an [`OperatorTable`] by [`OperatorKind`]; the engine invokes every
//! kind the same way.
//!
//! | kind       | patterns | result                                   |
//! |------------|----------|------------------------------------------|
//! | `identity` | >= 1     | mean of all matches                      |
//! | `ratio`    | 2        | sum(pattern 0) / sum(pattern 1)          |
//! | `sum`      | >= 1     | sum of all matches                       |
//! | `min`      | >= 1     | smallest match                           |
//! | `max`      | >= 1     | largest match                            |
//!
//! New kinds are added with [`OperatorTable::register`]:
//!
//! ```rust
//! use simstats::operators::{Arity, Operator, OperatorKind, OperatorTable};
//! use simstats::Unavailable;
//!
//! fn difference(sets: &[Vec<f64>]) -> Result<f64, Unavailable> {
//!     match sets {
//!         [a, b] => Ok(a.iter().sum::<f64>() - b.iter().sum::<f64>()),
//!         _ => Err(Unavailable::NoMatches),
//!     }
//! }
//!
//! let mut table = OperatorTable::builtin();
//! let kind: OperatorKind = "difference".parse()?;
//! table.register(kind.clone(), Operator::new(Arity::Exactly(2), difference))?;
//! assert_eq!(table.apply(&kind, &[vec![5.0], vec![2.0]]), Ok(3.0));
//! # Ok::<(), simstats::Error>(())
//! ```

use crate::{Error, Unavailable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Signature of a reduction: value-sets in pattern order to one scalar.
pub type ReduceFn = fn(&[Vec<f64>]) -> Result<f64, Unavailable>;

/// Reduction strategy named by a rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum OperatorKind {
    /// Mean of all matches
    Identity,
    /// Sum of numerator matches over sum of denominator matches
    Ratio,
    /// Sum of all matches
    Sum,
    /// Smallest match
    Min,
    /// Largest match
    Max,
    /// Caller-registered operator
    Custom(String),
}

impl OperatorKind {
    /// Name used in rule tables.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Identity => "identity",
            Self::Ratio => "ratio",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OperatorKind {
    type Err = Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        let s = s.trim();
        Ok(match s {
            "identity" => Self::Identity,
            "ratio" => Self::Ratio,
            "sum" => Self::Sum,
            "min" => Self::Min,
            "max" => Self::Max,
            "" => return Err(Error::Other("operator name cannot be empty".to_string())),
            other => Self::Custom(other.to_string()),
        })
    }
}

impl TryFrom<String> for OperatorKind {
    type Error = Error;

    fn try_from(value: String) -> crate::Result<Self> {
        value.parse()
    }
}

impl From<OperatorKind> for String {
    fn from(kind: OperatorKind) -> Self {
        kind.name().to_string()
    }
}

/// Number of patterns an operator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many patterns
    Exactly(usize),
    /// At least this many patterns
    AtLeast(usize),
}

impl Arity {
    /// Check whether `count` patterns satisfy this arity.
    #[must_use]
    pub const fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exactly(n) => count == n,
            Self::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "exactly {n}"),
            Self::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// A registered reduction.
#[derive(Debug, Clone, Copy)]
pub struct Operator {
    arity: Arity,
    reduce: ReduceFn,
}

impl Operator {
    /// Create an operator from its arity and reduction.
    #[must_use]
    pub const fn new(arity: Arity, reduce: ReduceFn) -> Self {
        Self { arity, reduce }
    }

    /// Accepted pattern count.
    #[must_use]
    pub const fn arity(&self) -> Arity {
        self.arity
    }
}

/// Lookup table from operator kind to reduction.
#[derive(Debug, Clone)]
pub struct OperatorTable {
    operators: HashMap<OperatorKind, Operator>,
}

impl Default for OperatorTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl OperatorTable {
    /// Table with the built-in kinds.
    #[must_use]
    pub fn builtin() -> Self {
        let operators = HashMap::from([
            (OperatorKind::Identity, Operator::new(Arity::AtLeast(1), identity)),
            (OperatorKind::Ratio, Operator::new(Arity::Exactly(2), ratio)),
            (OperatorKind::Sum, Operator::new(Arity::AtLeast(1), sum)),
            (OperatorKind::Min, Operator::new(Arity::AtLeast(1), min)),
            (OperatorKind::Max, Operator::new(Arity::AtLeast(1), max)),
        ]);
        Self { operators }
    }

    /// Register (or replace) a custom operator. Returns the previous entry.
    ///
    /// Built-in kinds keep their reduction and arity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if `kind` is not [`OperatorKind::Custom`].
    pub fn register(
        &mut self,
        kind: OperatorKind,
        operator: Operator,
    ) -> crate::Result<Option<Operator>> {
        if !matches!(kind, OperatorKind::Custom(_)) {
            return Err(Error::Other(format!(
                "cannot replace built-in operator '{kind}'"
            )));
        }
        Ok(self.operators.insert(kind, operator))
    }

    /// Look up an operator.
    #[must_use]
    pub fn get(&self, kind: &OperatorKind) -> Option<&Operator> {
        self.operators.get(kind)
    }

    /// Apply the operator for `kind` to resolved value-sets.
    ///
    /// Unknown kinds and non-finite results are reported as
    /// [`Unavailable::NonNumericValue`]; rules are validated against the table
    /// at registry load, so the first only happens with a mismatched table.
    ///
    /// # Errors
    ///
    /// Returns the [`Unavailable`] reason when the reduction cannot produce a
    /// finite value.
    pub fn apply(&self, kind: &OperatorKind, sets: &[Vec<f64>]) -> Result<f64, Unavailable> {
        let operator = self.get(kind).ok_or(Unavailable::NonNumericValue)?;
        if sets.iter().any(Vec::is_empty) {
            return Err(Unavailable::NoMatches);
        }

        let value = (operator.reduce)(sets)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Unavailable::NonNumericValue)
        }
    }
}

fn all_values(sets: &[Vec<f64>]) -> impl Iterator<Item = f64> + '_ {
    sets.iter().flatten().copied()
}

/// Arithmetic mean of every match of every pattern.
///
/// # Errors
///
/// [`Unavailable::NoMatches`] when there are no values.
#[allow(clippy::cast_precision_loss)]
pub fn identity(sets: &[Vec<f64>]) -> Result<f64, Unavailable> {
    let count = sets.iter().map(Vec::len).sum::<usize>();
    if count == 0 {
        return Err(Unavailable::NoMatches);
    }
    Ok(all_values(sets).sum::<f64>() / count as f64)
}

/// Sum of the first set divided by the sum of the second.
///
/// # Errors
///
/// [`Unavailable::NoMatches`] when either side is empty (or the sets are not
/// a numerator/denominator pair), [`Unavailable::DivisionByZero`] when the
/// denominator sums to exactly zero.
pub fn ratio(sets: &[Vec<f64>]) -> Result<f64, Unavailable> {
    let [numerator, denominator] = sets else {
        return Err(Unavailable::NoMatches);
    };
    if numerator.is_empty() || denominator.is_empty() {
        return Err(Unavailable::NoMatches);
    }

    let denominator: f64 = denominator.iter().sum();
    if denominator == 0.0 {
        return Err(Unavailable::DivisionByZero);
    }
    Ok(numerator.iter().sum::<f64>() / denominator)
}

/// Sum of every match.
///
/// # Errors
///
/// [`Unavailable::NoMatches`] when there are no values.
pub fn sum(sets: &[Vec<f64>]) -> Result<f64, Unavailable> {
    if sets.iter().all(Vec::is_empty) {
        return Err(Unavailable::NoMatches);
    }
    Ok(all_values(sets).sum())
}

/// Smallest match.
///
/// # Errors
///
/// [`Unavailable::NoMatches`] when there are no values.
pub fn min(sets: &[Vec<f64>]) -> Result<f64, Unavailable> {
    all_values(sets).reduce(f64::min).ok_or(Unavailable::NoMatches)
}

/// Largest match.
///
/// # Errors
///
/// [`Unavailable::NoMatches`] when there are no values.
pub fn max(sets: &[Vec<f64>]) -> Result<f64, Unavailable> {
    all_values(sets).reduce(f64::max).ok_or(Unavailable::NoMatches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_mean() {
        assert_eq!(identity(&[vec![1.2, 0.8]]), Ok(1.0));
        assert_eq!(identity(&[vec![1.0], vec![2.0, 3.0]]), Ok(2.0));
        assert_eq!(identity(&[vec![]]), Err(Unavailable::NoMatches));
        assert_eq!(identity(&[]), Err(Unavailable::NoMatches));
    }

    #[test]
    fn test_ratio_of_sums() {
        assert_eq!(ratio(&[vec![30.0, 50.0], vec![100.0]]), Ok(0.8));
        assert_eq!(ratio(&[vec![1.0], vec![]]), Err(Unavailable::NoMatches));
        assert_eq!(ratio(&[vec![1.0]]), Err(Unavailable::NoMatches));
    }

    #[test]
    fn test_ratio_zero_denominator() {
        assert_eq!(ratio(&[vec![5.0], vec![0.0]]), Err(Unavailable::DivisionByZero));
        assert_eq!(ratio(&[vec![0.0], vec![2.0, -2.0]]), Err(Unavailable::DivisionByZero));
    }

    #[test]
    fn test_sum_min_max() {
        let sets = [vec![3.0, -1.0], vec![7.0]];
        assert_eq!(sum(&sets), Ok(9.0));
        assert_eq!(min(&sets), Ok(-1.0));
        assert_eq!(max(&sets), Ok(7.0));
        assert_eq!(max(&[]), Err(Unavailable::NoMatches));
    }

    #[test]
    fn test_operator_kind_parsing() {
        assert_eq!("ratio".parse::<OperatorKind>().unwrap(), OperatorKind::Ratio);
        assert_eq!(
            "geomean".parse::<OperatorKind>().unwrap(),
            OperatorKind::Custom("geomean".to_string())
        );
        assert!("  ".parse::<OperatorKind>().is_err());
        assert_eq!(serde_json::to_string(&OperatorKind::Identity).unwrap(), r#""identity""#);
    }

    #[test]
    fn test_arity() {
        assert!(Arity::Exactly(2).accepts(2));
        assert!(!Arity::Exactly(2).accepts(3));
        assert!(Arity::AtLeast(1).accepts(4));
        assert!(!Arity::AtLeast(1).accepts(0));
    }

    #[test]
    fn test_table_apply_rejects_non_finite() {
        let table = OperatorTable::builtin();
        assert_eq!(
            table.apply(&OperatorKind::Sum, &[vec![f64::MAX, f64::MAX]]),
            Err(Unavailable::NonNumericValue)
        );
        assert_eq!(
            table.apply(&OperatorKind::Custom("nope".to_string()), &[vec![1.0]]),
            Err(Unavailable::NonNumericValue)
        );
        assert_eq!(
            table.apply(&OperatorKind::Identity, &[vec![2.0], vec![]]),
            Err(Unavailable::NoMatches)
        );
    }
}
