//! Rule registry: validated, name-addressed, read-only after load

use super::{MetricRule, RuleDefinition};
use crate::operators::{OperatorKind, OperatorTable};
use crate::{Error, Result};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Immutable table of metric rules.
///
/// Built once from rule definitions; every definition is checked against
/// the operator table it is loaded with. Safe to share across threads.
///
/// ```rust
/// use simstats::rules::RuleRegistry;
///
/// let registry = RuleRegistry::builtin();
/// assert!(registry.get("cpu_ipc").is_some());
/// assert_eq!(registry.names()[0], "L3_cache_hit_rate");
/// ```
#[derive(Debug, Clone)]
pub struct RuleRegistry {
    rules: Vec<MetricRule>,
    index: HashMap<String, usize>,
    operators: OperatorTable,
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleRegistry {
    /// Load rules using the built-in operators.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] for the first malformed definition.
    pub fn new<I>(definitions: I) -> Result<Self>
    where
        I: IntoIterator<Item = RuleDefinition>,
    {
        Self::with_operators(definitions, OperatorTable::builtin())
    }

    /// Load rules against a caller-supplied operator table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] when a definition names an operator the
    /// table lacks, has a pattern count the operator does not accept, reuses
    /// a name, or fails to compile.
    pub fn with_operators<I>(definitions: I, operators: OperatorTable) -> Result<Self>
    where
        I: IntoIterator<Item = RuleDefinition>,
    {
        let mut rules = Vec::new();
        let mut index = HashMap::new();

        for definition in definitions {
            let Some(operator) = operators.get(&definition.op) else {
                return Err(Error::invalid_rule(
                    &definition.name,
                    format!("unknown operator '{}'", definition.op),
                ));
            };

            let arity = operator.arity();
            if !arity.accepts(definition.patterns.len()) {
                return Err(Error::invalid_rule(
                    &definition.name,
                    format!(
                        "operator '{}' takes {arity} patterns, got {}",
                        definition.op,
                        definition.patterns.len()
                    ),
                ));
            }

            if index.contains_key(&definition.name) {
                return Err(Error::invalid_rule(&definition.name, "duplicate rule name"));
            }

            let rule = MetricRule::compile(definition)?;
            index.insert(rule.name().to_string(), rules.len());
            rules.push(rule);
        }

        tracing::debug!(rules = rules.len(), "loaded rule registry");
        Ok(Self {
            rules,
            index,
            operators,
        })
    }

    /// The rules shipped with simstats.
    ///
    /// # Panics
    ///
    /// Never: the built-in definitions are valid.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin_definitions()).expect("built-in rules are valid")
    }

    /// Load rules from a JSON array of definitions.
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is malformed or a rule is invalid.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let definitions: Vec<RuleDefinition> = serde_json::from_str(json)?;
        Self::new(definitions)
    }

    /// Load rules from a JSON reader.
    ///
    /// # Errors
    ///
    /// Returns error if reading fails, the JSON is malformed, or a rule is invalid.
    pub fn from_json_reader<R: Read>(reader: R) -> Result<Self> {
        let definitions: Vec<RuleDefinition> = serde_json::from_reader(reader)?;
        Self::new(definitions)
    }

    /// Load rules from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be opened or its rules are invalid.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Self::from_json_reader(std::io::BufReader::new(file))
    }

    /// Look up a rule by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MetricRule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    /// Check if a rule exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// All rule names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.iter().map(MetricRule::name).collect();
        names.sort_unstable();
        names
    }

    /// Rules in load order.
    pub fn iter(&self) -> impl Iterator<Item = &MetricRule> {
        self.rules.iter()
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if the registry has no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Operators the rules were validated against.
    #[must_use]
    pub const fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    /// Serialize the rule table back to JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        let definitions: Vec<&RuleDefinition> = self.rules.iter().map(MetricRule::definition).collect();
        Ok(serde_json::to_string_pretty(&definitions)?)
    }
}

fn builtin_definitions() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition::new(
            "cpu_ipc",
            [r"^system\.cpu\d+\.ipc$"],
            OperatorKind::Identity,
            "mean IPC across CPU cores",
        ),
        RuleDefinition::new(
            "cpu_committed_ipc",
            [r"^system\.cpu\d+\.commitStats\d+\.ipc$"],
            OperatorKind::Identity,
            "mean committed IPC across CPU cores",
        ),
        RuleDefinition::new(
            "gpu_ipc",
            [r"^system\.cpu\d+\.CUs\d+\.ipc$"],
            OperatorKind::Identity,
            "mean IPC across GPU compute units",
        ),
        RuleDefinition::new(
            "L3_cache_hit_rate",
            [
                r"^L3CacheMemory\.m_demand_hits$",
                r"^L3CacheMemory\.m_demand_accesses$",
            ],
            OperatorKind::Ratio,
            "L3 cache hit rate",
        ),
    ]
}
