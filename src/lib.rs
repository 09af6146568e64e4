//! # simstats: Rule-Driven Metrics for Simulator Counter Dumps
//!
//! simstats turns raw per-run performance counters (gem5 `stats.txt` dumps)
//! into a tidy dataset of derived metrics keyed by (benchmark, configuration).
//!
//! ## Pipeline
//!
//! ```text
//! stats.txt ──parser──> CounterStore ──resolve──> matches ──reduce──> MetricValue
//!                                        ▲                   ▲
//!                                   MetricRule.patterns   OperatorTable
//!                                        └──── RuleRegistry ───┘
//!
//! (RunKey x MetricRule) cells ──MetricEngine──> AggregatedDataset
//! ```
//!
//! ## Design Principles
//!
//! - **Rules are data**: a metric is a `(patterns, operator)` entry in a
//!   validated [`rules::RuleRegistry`]; adding one never touches engine code
//! - **Missing is not zero**: cells that cannot be computed carry an explicit
//!   [`Unavailable`] reason instead of NaN
//! - **Deterministic**: rows are ordered by metric, benchmark, configuration,
//!   and identical inputs give identical output, parallel or not
//!
//! ## Example Usage
//!
//! ```rust
//! use simstats::counters::{CounterStore, RunKey, RunSet};
//! use simstats::{Analyzer, MetricValue, Unavailable};
//!
//! let analyzer = Analyzer::builder().build()?;
//!
//! let mut runs = RunSet::new();
//! runs.insert(
//!     RunKey::new("mcf", "l3_4MB"),
//!     CounterStore::from_iter([
//!         ("L3CacheMemory.m_demand_hits", 80.0),
//!         ("L3CacheMemory.m_demand_accesses", 100.0),
//!     ]),
//! );
//!
//! let dataset = analyzer.analyze(&runs);
//! let hit_rate = dataset.get("mcf", "l3_4MB", "L3_cache_hit_rate").unwrap();
//! assert_eq!(hit_rate.value, MetricValue::Value(0.8));
//!
//! let ipc = dataset.get("mcf", "l3_4MB", "cpu_ipc").unwrap();
//! assert_eq!(ipc.value, MetricValue::Unavailable(Unavailable::NoMatches));
//! # Ok::<(), simstats::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod counters;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod operators;
pub mod rules;
pub mod value;

pub use dataset::{AggregatedDataset, DatasetRow, Selection};
pub use error::{Error, Result};
pub use value::{MetricValue, Unavailable};

use counters::{RunKey, RunSet, StatsParser};
use engine::{EngineConfig, MetricEngine};
use rules::RuleRegistry;
use std::path::{Path, PathBuf};

/// Analysis front door: a rule registry, a stats parser and an engine.
#[derive(Debug, Clone)]
pub struct Analyzer {
    registry: RuleRegistry,
    parser: StatsParser,
    known_benchmarks: Vec<String>,
    engine: MetricEngine,
}

impl Analyzer {
    /// Create an analyzer builder
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::default()
    }

    /// Rules in effect.
    #[must_use]
    pub const fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Discover and parse every run under `raw_dir`.
    ///
    /// # Errors
    ///
    /// Returns error if `raw_dir` exists but cannot be listed.
    pub fn load_runs<P: AsRef<Path>>(&self, raw_dir: P) -> Result<RunSet> {
        counters::load_runs(raw_dir, &self.parser, &self.known_benchmarks)
    }

    /// Compute every registered metric for every run.
    #[must_use]
    pub fn analyze(&self, runs: &RunSet) -> AggregatedDataset {
        self.engine.compute_all(runs, &self.registry)
    }

    /// Compute selected metrics for selected runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMetric`] if a metric is not registered.
    pub fn compute<'r, M, S, R>(
        &self,
        runs: &RunSet,
        selected_metrics: M,
        selected_runs: R,
    ) -> Result<AggregatedDataset>
    where
        M: IntoIterator<Item = S>,
        S: AsRef<str>,
        R: IntoIterator<Item = &'r RunKey>,
    {
        self.engine
            .compute(runs, &self.registry, selected_metrics, selected_runs)
    }
}

/// Analyzer builder
#[derive(Debug, Default)]
pub struct AnalyzerBuilder {
    registry: Option<RuleRegistry>,
    rules_file: Option<PathBuf>,
    known_benchmarks: Vec<String>,
    interest: Vec<String>,
    interest_file: Option<PathBuf>,
    config: EngineConfig,
}

impl AnalyzerBuilder {
    /// Use an already loaded rule registry (default: built-in rules).
    ///
    /// Conflicts with [`rules_file`](Self::rules_file).
    #[must_use]
    pub fn registry(mut self, registry: RuleRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Load rules from a JSON file at build time.
    ///
    /// Conflicts with [`registry`](Self::registry).
    #[must_use]
    pub fn rules_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.rules_file = Some(path.into());
        self
    }

    /// Benchmark names used to split run directory names
    #[must_use]
    pub fn known_benchmarks<I, S>(mut self, benchmarks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_benchmarks = benchmarks.into_iter().map(Into::into).collect();
        self
    }

    /// Keep only counters whose name contains one of these strings
    #[must_use]
    pub fn interest<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interest = names.into_iter().map(Into::into).collect();
        self
    }

    /// Load the interest filter from a CSV file with a `name` column
    #[must_use]
    pub fn interest_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.interest_file = Some(path.into());
        self
    }

    /// Enable or disable parallel cell evaluation
    #[must_use]
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.config = self.config.parallel(parallel);
        self
    }

    /// Build the analyzer
    ///
    /// # Errors
    ///
    /// Returns error if both a registry and a rules file were given, the
    /// rules file or interest file cannot be loaded, or a rule is invalid.
    pub fn build(self) -> Result<Analyzer> {
        let registry = match (self.registry, self.rules_file) {
            (Some(_), Some(path)) => {
                return Err(Error::Other(format!(
                    "both a registry and a rules file ({}) were given; pick one",
                    path.display()
                )));
            }
            (None, Some(path)) => RuleRegistry::from_json_file(path)?,
            (Some(registry), None) => registry,
            (None, None) => RuleRegistry::builtin(),
        };

        let mut interest = self.interest;
        let mut parser = StatsParser::new();
        if let Some(path) = self.interest_file {
            parser = parser.with_interest_file(path)?;
            interest.extend(parser.interest().iter().cloned());
        }
        let parser = parser.with_interest(interest);

        Ok(Analyzer {
            registry,
            parser,
            known_benchmarks: self.known_benchmarks,
            engine: MetricEngine::with_config(self.config),
        })
    }
}
