//! Aggregated dataset: the tidy output handed to visualization
//!
//! One row per (benchmark, configuration, metric). Unavailable rows stay in
//! the dataset so consumers can tell "missing" from "zero"; the query helpers
//! omit them from series.
//!
//! ## Selection shapes
//!
//! | benchmarks | configurations | result                          |
//! |------------|----------------|---------------------------------|
//! | many       | one            | [`Selection::ByBenchmark`]      |
//! | one        | many           | [`Selection::ByConfiguration`]  |
//! | many       | many           | [`Selection::Pivot`]            |
//! | one        | one            | [`Selection::Single`]           |

pub mod export;

use crate::{Error, MetricValue, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One (benchmark, configuration, metric) result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetRow {
    /// Benchmark name
    pub benchmark: String,
    /// Configuration name
    pub configuration: String,
    /// Metric name
    pub metric: String,
    /// Derived value or unavailability reason
    pub value: MetricValue,
}

/// Ordered sequence of dataset rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregatedDataset {
    rows: Vec<DatasetRow>,
}

/// Values of one metric for a selection of runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Nothing matched the selection
    Empty,
    /// One benchmark, one configuration
    Single(Option<f64>),
    /// Several benchmarks under one configuration: `(benchmark, value)`
    ByBenchmark(Vec<(String, f64)>),
    /// One benchmark under several configurations: `(configuration, value)`
    ByConfiguration(Vec<(String, f64)>),
    /// Benchmarks (rows) by configurations (columns)
    Pivot {
        /// Row labels
        benchmarks: Vec<String>,
        /// Column labels
        configurations: Vec<String>,
        /// `cells[row][column]`, `None` where unavailable or absent
        cells: Vec<Vec<Option<f64>>>,
    },
}

impl AggregatedDataset {
    /// Wrap rows as produced by the engine (order is kept).
    #[must_use]
    pub fn from_rows(rows: Vec<DatasetRow>) -> Self {
        Self { rows }
    }

    /// All rows in order.
    #[must_use]
    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    /// Consume the dataset, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<DatasetRow> {
        self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the dataset has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find the row for one cell.
    #[must_use]
    pub fn get(&self, benchmark: &str, configuration: &str, metric: &str) -> Option<&DatasetRow> {
        self.rows.iter().find(|r| {
            r.benchmark == benchmark && r.configuration == configuration && r.metric == metric
        })
    }

    /// Rows carrying a value.
    pub fn available(&self) -> impl Iterator<Item = &DatasetRow> {
        self.rows.iter().filter(|r| r.value.is_available())
    }

    /// Distinct benchmarks, sorted.
    #[must_use]
    pub fn benchmarks(&self) -> Vec<&str> {
        self.distinct(|r| &r.benchmark)
    }

    /// Distinct configurations, sorted.
    #[must_use]
    pub fn configurations(&self) -> Vec<&str> {
        self.distinct(|r| &r.configuration)
    }

    /// Distinct metrics, sorted.
    #[must_use]
    pub fn metrics(&self) -> Vec<&str> {
        self.distinct(|r| &r.metric)
    }

    fn distinct<'a>(&'a self, field: impl Fn(&'a DatasetRow) -> &'a String) -> Vec<&'a str> {
        self.rows
            .iter()
            .map(field)
            .map(String::as_str)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Values of `metric` for the given benchmarks and configurations.
    ///
    /// Unavailable rows are left out of series; in a pivot they become `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownMetric`] if no row carries `metric`.
    pub fn select<B, C>(&self, metric: &str, benchmarks: &[B], configurations: &[C]) -> Result<Selection>
    where
        B: AsRef<str>,
        C: AsRef<str>,
    {
        if !self.rows.iter().any(|r| r.metric == metric) {
            return Err(Error::UnknownMetric(metric.to_string()));
        }

        let benchmarks: BTreeSet<&str> = benchmarks.iter().map(|b| b.as_ref()).collect();
        let configurations: BTreeSet<&str> = configurations.iter().map(|c| c.as_ref()).collect();

        let rows: Vec<&DatasetRow> = self
            .rows
            .iter()
            .filter(|r| {
                r.metric == metric
                    && benchmarks.contains(r.benchmark.as_str())
                    && configurations.contains(r.configuration.as_str())
            })
            .collect();
        if rows.is_empty() {
            return Ok(Selection::Empty);
        }

        let series = |by_benchmark: bool| -> Vec<(String, f64)> {
            rows.iter()
                .filter_map(|r| {
                    let label = if by_benchmark { &r.benchmark } else { &r.configuration };
                    r.value.value().map(|v| (label.clone(), v))
                })
                .collect()
        };

        Ok(match (benchmarks.len(), configurations.len()) {
            (1, 1) => Selection::Single(rows[0].value.value()),
            (_, 1) => Selection::ByBenchmark(series(true)),
            (1, _) => Selection::ByConfiguration(series(false)),
            _ => {
                let row_labels: Vec<String> = benchmarks
                    .iter()
                    .filter(|b| rows.iter().any(|r| r.benchmark == **b))
                    .map(|b| (*b).to_string())
                    .collect();
                let column_labels: Vec<String> = configurations
                    .iter()
                    .filter(|c| rows.iter().any(|r| r.configuration == **c))
                    .map(|c| (*c).to_string())
                    .collect();
                let cells = row_labels
                    .iter()
                    .map(|b| {
                        column_labels
                            .iter()
                            .map(|c| {
                                rows.iter()
                                    .find(|r| &r.benchmark == b && &r.configuration == c)
                                    .and_then(|r| r.value.value())
                            })
                            .collect()
                    })
                    .collect();
                Selection::Pivot {
                    benchmarks: row_labels,
                    configurations: column_labels,
                    cells,
                }
            }
        })
    }

    /// Serialize rows as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl IntoIterator for AggregatedDataset {
    type Item = DatasetRow;
    type IntoIter = std::vec::IntoIter<DatasetRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a AggregatedDataset {
    type Item = &'a DatasetRow;
    type IntoIter = std::slice::Iter<'a, DatasetRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Unavailable;

    fn row(benchmark: &str, configuration: &str, value: MetricValue) -> DatasetRow {
        DatasetRow {
            benchmark: benchmark.to_string(),
            configuration: configuration.to_string(),
            metric: "ipc".to_string(),
            value,
        }
    }

    fn dataset() -> AggregatedDataset {
        AggregatedDataset::from_rows(vec![
            row("bfs", "o3", MetricValue::Value(1.0)),
            row("bfs", "timing", MetricValue::Value(0.5)),
            row("mcf", "o3", MetricValue::Unavailable(Unavailable::NoMatches)),
            row("mcf", "timing", MetricValue::Value(0.25)),
        ])
    }

    #[test]
    fn test_distinct_labels() {
        let ds = dataset();
        assert_eq!(ds.benchmarks(), vec!["bfs", "mcf"]);
        assert_eq!(ds.configurations(), vec!["o3", "timing"]);
        assert_eq!(ds.metrics(), vec!["ipc"]);
        assert_eq!(ds.available().count(), 3);
    }

    #[test]
    fn test_select_by_benchmark_omits_unavailable() {
        let sel = dataset().select("ipc", &["bfs", "mcf"], &["o3"]).unwrap();
        assert_eq!(sel, Selection::ByBenchmark(vec![("bfs".to_string(), 1.0)]));
    }

    #[test]
    fn test_select_by_configuration() {
        let sel = dataset().select("ipc", &["mcf"], &["o3", "timing"]).unwrap();
        assert_eq!(
            sel,
            Selection::ByConfiguration(vec![("timing".to_string(), 0.25)])
        );
    }

    #[test]
    fn test_select_pivot() {
        let sel = dataset()
            .select("ipc", &["mcf", "bfs"], &["timing", "o3"])
            .unwrap();
        assert_eq!(
            sel,
            Selection::Pivot {
                benchmarks: vec!["bfs".to_string(), "mcf".to_string()],
                configurations: vec!["o3".to_string(), "timing".to_string()],
                cells: vec![vec![Some(1.0), Some(0.5)], vec![None, Some(0.25)]],
            }
        );
    }

    #[test]
    fn test_select_single_and_empty() {
        let ds = dataset();
        assert_eq!(
            ds.select("ipc", &["mcf"], &["o3"]).unwrap(),
            Selection::Single(None)
        );
        let none: [&str; 0] = [];
        assert_eq!(ds.select("ipc", &none, &["o3"]).unwrap(), Selection::Empty);
        assert!(matches!(
            ds.select("l2_miss", &["bfs"], &["o3"]),
            Err(Error::UnknownMetric(_))
        ));
    }
}
