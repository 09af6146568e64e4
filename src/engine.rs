//! Metric engine
//!
//! Evaluates every (run, rule) cell of a request and collects the results
//! into an [`AggregatedDataset`]. Each cell reads one immutable
//! [`CounterStore`] and one immutable [`MetricRule`], so cells are evaluated
//! independently, in parallel when the `rayon` feature is enabled.
//!
//! Per-cell problems become [`Unavailable`] rows; they never fail the batch.
//!
//! ```rust
//! use simstats::counters::{CounterStore, RunKey, RunSet};
//! use simstats::engine::MetricEngine;
//! use simstats::rules::RuleRegistry;
//! use simstats::MetricValue;
//!
//! let mut runs = RunSet::new();
//! runs.insert(
//!     RunKey::new("mcf", "o3"),
//!     CounterStore::from_iter([("system.cpu0.ipc", 1.2), ("system.cpu1.ipc", 0.8)]),
//! );
//!
//! let registry = RuleRegistry::builtin();
//! let dataset = MetricEngine::new().compute_all(&runs, &registry);
//! let row = dataset.get("mcf", "o3", "cpu_ipc").unwrap();
//! assert_eq!(row.value, MetricValue::Value(1.0));
//! ```

use crate::counters::{empty_store, CounterStore, RunKey, RunSet};
use crate::dataset::{AggregatedDataset, DatasetRow};
use crate::rules::resolver::{numeric_values, resolve};
use crate::rules::{MetricRule, RuleRegistry};
use crate::{Error, MetricValue, Result, Unavailable};
use std::collections::BTreeSet;

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel: cfg!(feature = "rayon"),
        }
    }
}

impl EngineConfig {
    /// Default settings (parallel when built with `rayon`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable parallel cell evaluation.
    ///
    /// Has no effect without the `rayon` feature.
    #[must_use]
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Whether cells are evaluated in parallel.
    #[must_use]
    pub const fn is_parallel(&self) -> bool {
        self.parallel && cfg!(feature = "rayon")
    }
}

/// Stateless orchestrator of pattern resolution and reduction.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricEngine {
    config: EngineConfig,
}

/// One cell of the (metric x run) cross product.
struct Cell<'a> {
    rule: &'a MetricRule,
    run: &'a RunKey,
    store: &'a CounterStore,
}

impl MetricEngine {
    /// Create an engine with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with explicit settings.
    #[must_use]
    pub const fn with_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Engine settings.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute the selected metrics for the selected runs.
    ///
    /// Rows are ordered by metric name, then benchmark, then configuration.
    /// Duplicate selections are collapsed. A selected run missing from `runs`
    /// is treated as a run without counters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMetric`] if a selected metric is not in the
    /// registry. No cell is evaluated in that case.
    pub fn compute<'r, M, S, R>(
        &self,
        runs: &RunSet,
        registry: &RuleRegistry,
        selected_metrics: M,
        selected_runs: R,
    ) -> Result<AggregatedDataset>
    where
        M: IntoIterator<Item = S>,
        S: AsRef<str>,
        R: IntoIterator<Item = &'r RunKey>,
    {
        let metric_names: BTreeSet<String> = selected_metrics
            .into_iter()
            .map(|m| m.as_ref().to_string())
            .collect();
        let rules = metric_names
            .iter()
            .map(|name| {
                registry
                    .get(name)
                    .ok_or_else(|| Error::UnknownMetric(name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let run_keys: BTreeSet<&RunKey> = selected_runs.into_iter().collect();
        let stores: Vec<(&RunKey, &CounterStore)> = run_keys
            .into_iter()
            .map(|run| {
                let store = runs.get(run).unwrap_or_else(|| {
                    tracing::warn!(run = %run, "selected run has no counters loaded");
                    empty_store()
                });
                (run, store)
            })
            .collect();

        let cells: Vec<Cell<'_>> = rules
            .iter()
            .flat_map(|&rule| {
                stores
                    .iter()
                    .map(move |&(run, store)| Cell { rule, run, store })
            })
            .collect();

        Ok(self.evaluate(registry, &cells))
    }

    /// Compute every registry metric for every run in `runs`.
    #[must_use]
    pub fn compute_all(&self, runs: &RunSet, registry: &RuleRegistry) -> AggregatedDataset {
        let cells: Vec<Cell<'_>> = {
            let mut rules: Vec<&MetricRule> = registry.iter().collect();
            rules.sort_by(|a, b| a.name().cmp(b.name()));
            rules
                .into_iter()
                .flat_map(|rule| runs.iter().map(move |(run, store)| Cell { rule, run, store }))
                .collect()
        };
        self.evaluate(registry, &cells)
    }

    fn evaluate(&self, registry: &RuleRegistry, cells: &[Cell<'_>]) -> AggregatedDataset {
        let eval = |cell: &Cell<'_>| DatasetRow {
            benchmark: cell.run.benchmark().to_string(),
            configuration: cell.run.configuration().to_string(),
            metric: cell.rule.name().to_string(),
            value: evaluate_cell(registry, cell.rule, cell.run, cell.store),
        };

        #[cfg(feature = "rayon")]
        let rows: Vec<DatasetRow> = if self.config.is_parallel() {
            use rayon::prelude::*;
            cells.par_iter().map(eval).collect()
        } else {
            cells.iter().map(eval).collect()
        };
        #[cfg(not(feature = "rayon"))]
        let rows: Vec<DatasetRow> = cells.iter().map(eval).collect();

        let dataset = AggregatedDataset::from_rows(rows);
        tracing::debug!(
            rows = dataset.len(),
            unavailable = dataset.len() - dataset.available().count(),
            parallel = self.config.is_parallel(),
            "computed metrics"
        );
        dataset
    }
}

/// Resolve a rule's patterns against one store and reduce them.
fn evaluate_cell(
    registry: &RuleRegistry,
    rule: &MetricRule,
    run: &RunKey,
    store: &CounterStore,
) -> MetricValue {
    let result = reduce_cell(registry, rule, store);
    tracing::trace!(metric = rule.name(), run = %run, ?result, "evaluated cell");
    result.into()
}

fn reduce_cell(
    registry: &RuleRegistry,
    rule: &MetricRule,
    store: &CounterStore,
) -> std::result::Result<f64, Unavailable> {
    let resolved: Vec<_> = rule
        .patterns()
        .iter()
        .map(|pattern| resolve(store, pattern))
        .collect();
    tracing::trace!(
        metric = rule.name(),
        matches = ?resolved.iter().map(Vec::len).collect::<Vec<_>>(),
        "resolved patterns"
    );

    if resolved.iter().any(Vec::is_empty) {
        return Err(Unavailable::NoMatches);
    }

    let sets = resolved
        .iter()
        .map(|matches| numeric_values(matches))
        .collect::<Option<Vec<_>>>()
        .ok_or(Unavailable::NonNumericValue)?;

    let value = registry.operators().apply(rule.op(), &sets)? * rule.scale();
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Unavailable::NonNumericValue)
    }
}
