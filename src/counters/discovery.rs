//! Run discovery over a directory of simulator outputs
//!
//! Layout:
//!
//! ```text
//! raw/
//! ├── mcf_o3_l3_4MB/stats.txt      -> (mcf, o3_l3_4MB)
//! ├── bfs_timing/stats.txt         -> (bfs, timing)
//! └── notes/                       -> ignored (no underscore, no stats.txt)
//! ```

use super::{RunKey, RunSet, StatsParser};
use crate::Result;
use std::path::{Path, PathBuf};

/// File name of the statistics dump inside each run directory.
pub const STATS_FILE_NAME: &str = "stats.txt";

/// One discovered run directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEntry {
    /// Benchmark/configuration identity of the run
    pub key: RunKey,
    /// Path to the run's `stats.txt`
    pub stats_file: PathBuf,
}

/// Split a `benchmark_configuration` directory name.
///
/// With a list of known benchmarks, the longest known name followed by an
/// underscore wins, so benchmarks that contain underscores themselves are
/// kept whole. Otherwise the name is split at the first underscore.
/// Returns `None` when no split is possible.
///
/// ```rust
/// use simstats::counters::split_run_name;
///
/// let key = split_run_name("mcf_o3_l3_4MB", &[]).unwrap();
/// assert_eq!((key.benchmark(), key.configuration()), ("mcf", "o3_l3_4MB"));
///
/// let known = ["pr_kron".to_string()];
/// let key = split_run_name("pr_kron_timing", &known).unwrap();
/// assert_eq!((key.benchmark(), key.configuration()), ("pr_kron", "timing"));
/// ```
#[must_use]
pub fn split_run_name(name: &str, known_benchmarks: &[String]) -> Option<RunKey> {
    let known = known_benchmarks
        .iter()
        .filter(|b| {
            name.len() > b.len() + 1
                && name.starts_with(b.as_str())
                && name[b.len()..].starts_with('_')
        })
        .max_by_key(|b| b.len());

    if let Some(benchmark) = known {
        return Some(RunKey::new(benchmark.as_str(), &name[benchmark.len() + 1..]));
    }

    let (benchmark, configuration) = name.split_once('_')?;
    if benchmark.is_empty() || configuration.is_empty() {
        return None;
    }
    Some(RunKey::new(benchmark, configuration))
}

/// Find every run directory under `raw_dir`, sorted by run key.
///
/// A missing `raw_dir` yields no runs.
///
/// # Errors
///
/// Returns error if `raw_dir` exists but cannot be listed.
pub fn discover_runs<P: AsRef<Path>>(raw_dir: P, known_benchmarks: &[String]) -> Result<Vec<RunEntry>> {
    let raw_dir = raw_dir.as_ref();
    if !raw_dir.exists() {
        tracing::warn!(dir = %raw_dir.display(), "raw results directory does not exist");
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    for item in std::fs::read_dir(raw_dir)? {
        let path = item?.path();
        if !path.is_dir() {
            continue;
        }

        let stats_file = path.join(STATS_FILE_NAME);
        if !stats_file.is_file() {
            continue;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(key) = split_run_name(name, known_benchmarks) else {
            tracing::debug!(dir = name, "skipping run directory without benchmark_config name");
            continue;
        };

        entries.push(RunEntry { key, stats_file });
    }

    entries.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(entries)
}

/// Discover and parse every run under `raw_dir`.
///
/// Stats files that fail to parse are logged and left out; one broken run
/// does not block the others.
///
/// # Errors
///
/// Returns error if `raw_dir` exists but cannot be listed.
pub fn load_runs<P: AsRef<Path>>(
    raw_dir: P,
    parser: &StatsParser,
    known_benchmarks: &[String],
) -> Result<RunSet> {
    let entries = discover_runs(raw_dir, known_benchmarks)?;
    let total = entries.len();

    let mut runs = RunSet::new();
    for entry in entries {
        match parser.parse_file(&entry.stats_file) {
            Ok(store) => {
                tracing::debug!(run = %entry.key, counters = store.len(), "parsed stats");
                runs.insert(entry.key, store);
            }
            Err(e) => {
                tracing::warn!(run = %entry.key, error = %e, "failed to parse stats file");
            }
        }
    }

    tracing::info!(loaded = runs.len(), discovered = total, "loaded runs");
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_at_first_underscore() {
        let key = split_run_name("bfs_o3_2core", &[]).unwrap();
        assert_eq!(key.benchmark(), "bfs");
        assert_eq!(key.configuration(), "o3_2core");
    }

    #[test]
    fn test_split_prefers_longest_known_benchmark() {
        let known = vec!["pr".to_string(), "pr_kron".to_string()];
        let key = split_run_name("pr_kron_o3", &known).unwrap();
        assert_eq!(key.benchmark(), "pr_kron");
        assert_eq!(key.configuration(), "o3");
    }

    #[test]
    fn test_split_falls_back_when_no_known_match() {
        let known = vec!["mcf".to_string()];
        let key = split_run_name("lbm_timing", &known).unwrap();
        assert_eq!(key.benchmark(), "lbm");
    }

    #[test]
    fn test_split_rejects_names_without_underscore() {
        assert!(split_run_name("notes", &[]).is_none());
        assert!(split_run_name("_config", &[]).is_none());
        assert!(split_run_name("bench_", &[]).is_none());
    }

    #[test]
    fn test_discover_missing_dir_is_empty() {
        let entries = discover_runs("/nonexistent/simstats/raw", &[]).unwrap();
        assert!(entries.is_empty());
    }
}
