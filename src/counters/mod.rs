//! Raw counter data for simulation runs
//!
//! ## Model
//!
//! ```text
//! RunSet ──< (RunKey, CounterStore)
//!                      │
//!                      └──< (counter name, CounterValue)
//! ```
//!
//! A [`CounterStore`] is a read-only snapshot of one run. It is built once,
//! either by hand or by the [`parser`] collaborator, and never mutated by the
//! engine.
//!
//! ## Usage
//!
//! ```rust
//! use simstats::counters::{CounterStore, CounterValue, RunKey};
//!
//! let store = CounterStore::from_iter([
//!     ("system.cpu0.ipc", 1.2),
//!     ("system.cpu1.ipc", 0.8),
//! ]);
//! assert_eq!(store.len(), 2);
//! assert_eq!(store.get("system.cpu0.ipc"), Some(&CounterValue::Number(1.2)));
//!
//! let key = RunKey::new("mcf", "o3_l3_4MB");
//! assert_eq!(key.benchmark(), "mcf");
//! ```

pub mod discovery;
pub mod parser;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

pub use discovery::{discover_runs, load_runs, split_run_name, RunEntry};
pub use parser::StatsParser;

/// All runs of an analysis, ordered by [`RunKey`].
pub type RunSet = BTreeMap<RunKey, CounterStore>;

/// Identifies one simulation run.
///
/// Both parts are opaque strings. Ordering is lexicographic on the
/// benchmark, then the configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunKey {
    benchmark: String,
    configuration: String,
}

impl RunKey {
    /// Create a run key.
    #[must_use]
    pub fn new(benchmark: impl Into<String>, configuration: impl Into<String>) -> Self {
        Self {
            benchmark: benchmark.into(),
            configuration: configuration.into(),
        }
    }

    /// Get the benchmark name.
    #[must_use]
    pub fn benchmark(&self) -> &str {
        &self.benchmark
    }

    /// Get the configuration name.
    #[must_use]
    pub fn configuration(&self) -> &str {
        &self.configuration
    }
}

impl fmt::Display for RunKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.benchmark, self.configuration)
    }
}

/// Value of a single counter as handed over by the raw parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CounterValue {
    /// A numeric value
    Number(f64),
    /// A token that could not be read as a number (e.g. `nan`)
    Raw(String),
}

impl CounterValue {
    /// Coerce to a float, `None` for raw tokens.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Raw(_) => None,
        }
    }
}

impl From<f64> for CounterValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CounterValue {
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_string())
    }
}

impl From<String> for CounterValue {
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

/// Counters recorded for one run, iterated in counter-name order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CounterStore {
    counters: BTreeMap<String, CounterValue>,
}

impl CounterStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of counters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    /// Check if the store has no counters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Look up a counter by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CounterValue> {
        self.counters.get(name)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CounterValue)> {
        self.counters.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Insert a counter while the snapshot is being built.
    ///
    /// A later insert for the same name replaces the earlier one.
    pub(crate) fn insert(&mut self, name: impl Into<String>, value: CounterValue) {
        self.counters.insert(name.into(), value);
    }
}

/// Shared empty store, standing in for runs that are selected but were never loaded.
pub(crate) fn empty_store() -> &'static CounterStore {
    static EMPTY: OnceLock<CounterStore> = OnceLock::new();
    EMPTY.get_or_init(CounterStore::new)
}

impl<K, V> FromIterator<(K, V)> for CounterStore
where
    K: Into<String>,
    V: Into<CounterValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            counters: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_key_ordering() {
        let a = RunKey::new("bfs", "zz");
        let b = RunKey::new("mcf", "aa");
        let c = RunKey::new("mcf", "bb");
        assert!(a < b);
        assert!(b < c);
        assert_eq!(c.to_string(), "mcf_bb");
    }

    #[test]
    fn test_store_iterates_in_name_order() {
        let store = CounterStore::from_iter([("b.x", 2.0), ("a.x", 1.0), ("c.x", 3.0)]);
        let names: Vec<&str> = store.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a.x", "b.x", "c.x"]);
    }

    #[test]
    fn test_counter_value_coercion() {
        assert_eq!(CounterValue::Number(2.5).as_f64(), Some(2.5));
        assert_eq!(CounterValue::from("nan").as_f64(), None);
    }

    #[test]
    fn test_store_json_shape() {
        let store = CounterStore::from_iter([("sim_ticks", CounterValue::Number(10.0))]);
        let json = serde_json::to_string(&store).unwrap();
        assert_eq!(json, r#"{"sim_ticks":10.0}"#);
        let back: CounterStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back, store);
    }
}
