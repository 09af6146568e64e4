//! gem5 `stats.txt` scanner
//!
//! Turns the first statistics block of a dump into a [`CounterStore`].
//! This is a collaborator of the metric engine, not part of it: the engine
//! only ever sees the resulting stores.
//!
//! Accepted stat lines:
//!
//! ```text
//! system.cpu0.ipc        1.234567    # IPC: instructions per cycle (Count/Cycle)
//! system.cpu0.numCycles  1000        (Unspecified)
//! ```
//!
//! Distribution rows (anything containing `|`) and unparseable lines are
//! skipped.

use super::{CounterStore, CounterValue};
use crate::{Error, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;

const BEGIN_MARKER: &str = "Begin Simulation Statistics";
const END_MARKER: &str = "End Simulation Statistics";

/// gem5 prints `inf` for unbounded ratios; it is pinned to this value.
pub const INF_SENTINEL: f64 = 1e99;

/// Parser for gem5 statistics dumps.
#[derive(Debug, Clone)]
pub struct StatsParser {
    commented: Regex,
    annotated: Regex,
    interest: Vec<String>,
}

#[derive(Deserialize)]
struct InterestRow {
    name: String,
}

impl Default for StatsParser {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsParser {
    /// Create a parser that keeps every counter.
    ///
    /// # Panics
    ///
    /// Never: the line patterns are constants.
    #[must_use]
    pub fn new() -> Self {
        Self {
            commented: Regex::new(r"^([\w.:\-+]+)\s+([-+]?[0-9.eE]+%?|nan|inf)\s+# (.*)")
                .expect("valid stat line pattern"),
            annotated: Regex::new(r"^([\w.:\-+]+)\s+([-+]?[0-9.eE]+%?)\s+\(.*\)")
                .expect("valid stat line pattern"),
            interest: Vec::new(),
        }
    }

    /// Keep only counters whose name contains one of `names`.
    #[must_use]
    pub fn with_interest<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.interest = names
            .into_iter()
            .map(Into::into)
            .map(|n: String| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        self
    }

    /// Load the interest filter from a CSV file with a `name` column.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or has no `name` column.
    pub fn with_interest_file<P: AsRef<Path>>(self, path: P) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path.as_ref()).map_err(|e| {
            Error::ParseError(format!(
                "Failed to open interest file {}: {e}",
                path.as_ref().display()
            ))
        })?;

        let mut names = Vec::new();
        for row in reader.deserialize::<InterestRow>() {
            let row = row.map_err(|e| Error::ParseError(format!("Bad interest row: {e}")))?;
            names.push(row.name);
        }

        Ok(self.with_interest(names))
    }

    /// Interest substrings in effect (empty means keep everything).
    #[must_use]
    pub fn interest(&self) -> &[String] {
        &self.interest
    }

    /// Parse a stats file from disk.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or has no statistics block.
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<CounterStore> {
        let text = std::fs::read_to_string(path.as_ref())?;
        self.parse_str(&text).map_err(|e| match e {
            Error::ParseError(msg) => {
                Error::ParseError(format!("{}: {msg}", path.as_ref().display()))
            }
            other => other,
        })
    }

    /// Parse the first statistics block of `text`.
    ///
    /// # Errors
    ///
    /// Returns error if no `Begin Simulation Statistics` marker is present.
    pub fn parse_str(&self, text: &str) -> Result<CounterStore> {
        let mut store = CounterStore::new();
        let mut in_block = false;
        let mut seen_block = false;

        for line in text.lines() {
            let trimmed = line.trim();
            if is_marker(trimmed, BEGIN_MARKER) {
                in_block = true;
                seen_block = true;
                store = CounterStore::new();
                continue;
            }
            if is_marker(trimmed, END_MARKER) {
                if in_block {
                    break;
                }
                continue;
            }
            if !in_block || trimmed.is_empty() {
                continue;
            }

            match self.parse_line(trimmed) {
                Some((name, value)) if self.is_interesting(name) => store.insert(name, value),
                Some(_) => {}
                None => tracing::trace!(line = trimmed, "skipping unparseable stat line"),
            }
        }

        if !seen_block {
            return Err(Error::ParseError(
                "no 'Begin Simulation Statistics' block found".to_string(),
            ));
        }

        Ok(store)
    }

    fn parse_line<'a>(&self, line: &'a str) -> Option<(&'a str, CounterValue)> {
        if line.contains('|') {
            return None;
        }

        let caps = self
            .commented
            .captures(line)
            .or_else(|| self.annotated.captures(line))?;
        let name = caps.get(1)?.as_str();
        let token = caps.get(2)?.as_str();
        Some((name, coerce(token)))
    }

    fn is_interesting(&self, name: &str) -> bool {
        self.interest.is_empty() || self.interest.iter().any(|i| name.contains(i.as_str()))
    }
}

fn is_marker(line: &str, marker: &str) -> bool {
    line.starts_with("----------")
        && line.ends_with("----------")
        && line
            .trim_matches('-')
            .split_whitespace()
            .eq(marker.split_whitespace())
}

/// Convert a raw value token into a counter value.
fn coerce(token: &str) -> CounterValue {
    match token {
        "nan" => CounterValue::Raw(token.to_string()),
        "inf" => CounterValue::Number(INF_SENTINEL),
        _ => token
            .trim_end_matches('%')
            .parse::<f64>()
            .map_or_else(|_| CounterValue::Raw(token.to_string()), CounterValue::Number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
---------- Begin Simulation Statistics ----------
simSeconds                                   0.000123                       # Number of seconds simulated (Second)
system.cpu0.ipc                              1.200000                       # IPC: instructions per cycle ((Count/Cycle))
system.cpu1.ipc                              0.800000                       # IPC: instructions per cycle ((Count/Cycle))
system.cpu0.numCycles                        1000                           (Unspecified)
system.cpu0.idleFraction                     nan                            # Idle fraction
system.cpu0.ratio                            inf                            # Unbounded
system.cpu0.fetch.rate                       12.5%                          # Fetch rate
system.cpu0.issued::samples                  100                            # dist | sample
this line is garbage
---------- End Simulation Statistics   ----------

---------- Begin Simulation Statistics ----------
system.cpu0.ipc                              9.0                            # second dump
---------- End Simulation Statistics   ----------
";

    #[test]
    fn test_parse_first_block_only() {
        let store = StatsParser::new().parse_str(SAMPLE).unwrap();
        assert_eq!(store.get("system.cpu0.ipc"), Some(&CounterValue::Number(1.2)));
        assert_eq!(store.get("system.cpu1.ipc"), Some(&CounterValue::Number(0.8)));
    }

    #[test]
    fn test_value_coercion() {
        let store = StatsParser::new().parse_str(SAMPLE).unwrap();
        assert_eq!(
            store.get("system.cpu0.numCycles"),
            Some(&CounterValue::Number(1000.0))
        );
        assert_eq!(
            store.get("system.cpu0.idleFraction"),
            Some(&CounterValue::Raw("nan".to_string()))
        );
        assert_eq!(
            store.get("system.cpu0.ratio"),
            Some(&CounterValue::Number(INF_SENTINEL))
        );
        assert_eq!(
            store.get("system.cpu0.fetch.rate"),
            Some(&CounterValue::Number(12.5))
        );
    }

    #[test]
    fn test_skips_distributions_and_garbage() {
        let store = StatsParser::new().parse_str(SAMPLE).unwrap();
        assert!(store.get("system.cpu0.issued::samples").is_none());
        assert!(store.get("this").is_none());
        assert_eq!(store.len(), 7);
    }

    #[test]
    fn test_interest_filter_is_substring_match() {
        let parser = StatsParser::new().with_interest(["ipc", " "]);
        assert_eq!(parser.interest(), &["ipc".to_string()]);
        let store = parser.parse_str(SAMPLE).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get("simSeconds").is_none());
    }

    #[test]
    fn test_missing_block_is_an_error() {
        let err = StatsParser::new().parse_str("system.cpu0.ipc 1.0 # x").unwrap_err();
        assert!(matches!(err, Error::ParseError(_)));
    }

    #[test]
    fn test_marker_whitespace_is_normalized() {
        assert!(is_marker(
            "---------- End Simulation Statistics   ----------",
            END_MARKER
        ));
        assert!(!is_marker("system.end 1 # x", END_MARKER));
    }
}
