//! Metric rules
//!
//! A rule names a derived metric and says how to compute it: which counters
//! to pick (regular expressions, in order) and which reduction to apply.
//!
//! ```text
//! RuleDefinition (declarative, serde) ──compile──> MetricRule (validated)
//!                                                        │
//!                           RuleRegistry (name-addressed, read-only) ──< MetricRule
//! ```
//!
//! ## Rule table format (JSON)
//!
//! ```json
//! [
//!   {
//!     "name": "L3_cache_hit_rate",
//!     "patterns": ["^L3CacheMemory\\.m_demand_hits$", "^L3CacheMemory\\.m_demand_accesses$"],
//!     "op": "ratio",
//!     "description": "L3 cache hit rate",
//!     "scale": 100.0
//!   }
//! ]
//! ```

mod registry;
pub mod resolver;

pub use registry::RuleRegistry;
pub use resolver::{resolve, Match};

use crate::operators::OperatorKind;
use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

const fn default_scale() -> f64 {
    1.0
}

#[allow(clippy::trivially_copy_pass_by_ref, clippy::float_cmp)]
fn is_default_scale(scale: &f64) -> bool {
    *scale == default_scale()
}

/// Declarative form of a rule, as found in rule tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    /// Unique metric name
    pub name: String,
    /// Counter-name patterns, in operator order
    pub patterns: Vec<String>,
    /// Reduction to apply
    pub op: OperatorKind,
    /// Human-readable documentation
    #[serde(default, alias = "desc")]
    pub description: String,
    /// Multiplier applied to the reduced value
    #[serde(default = "default_scale", skip_serializing_if = "is_default_scale")]
    pub scale: f64,
}

impl RuleDefinition {
    /// Create a rule definition with a scale of 1.
    #[must_use]
    pub fn new<I, S>(
        name: impl Into<String>,
        patterns: I,
        op: OperatorKind,
        description: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            op,
            description: description.into(),
            scale: default_scale(),
        }
    }

    /// Set the multiplier applied to the reduced value.
    #[must_use]
    pub const fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }
}

/// A validated rule with compiled patterns.
#[derive(Debug, Clone)]
pub struct MetricRule {
    definition: RuleDefinition,
    patterns: Vec<Regex>,
}

impl MetricRule {
    /// Compile the patterns of a definition.
    ///
    /// Patterns match from the start of a counter name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] for an empty name, an empty pattern
    /// list, a non-finite scale, or a pattern that is not a valid regex.
    /// Arity is checked by the registry, which owns the operator table.
    pub fn compile(definition: RuleDefinition) -> Result<Self> {
        if definition.name.trim().is_empty() {
            return Err(Error::invalid_rule("", "name cannot be empty"));
        }
        if definition.patterns.is_empty() {
            return Err(Error::invalid_rule(&definition.name, "no patterns"));
        }
        if !definition.scale.is_finite() {
            return Err(Error::invalid_rule(
                &definition.name,
                format!("scale {} is not finite", definition.scale),
            ));
        }

        let patterns = definition
            .patterns
            .iter()
            .map(|p| {
                Regex::new(&format!("^(?:{p})")).map_err(|e| {
                    Error::invalid_rule(&definition.name, format!("bad pattern '{p}': {e}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            definition,
            patterns,
        })
    }

    /// Metric name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Compiled patterns, in operator order.
    #[must_use]
    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    /// Reduction kind.
    #[must_use]
    pub const fn op(&self) -> &OperatorKind {
        &self.definition.op
    }

    /// Documentation string.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.definition.description
    }

    /// Multiplier applied to the reduced value.
    #[must_use]
    pub const fn scale(&self) -> f64 {
        self.definition.scale
    }

    /// The declarative form this rule was compiled from.
    #[must_use]
    pub const fn definition(&self) -> &RuleDefinition {
        &self.definition
    }
}
