//! Metric computation benchmarks
//!
//! Sequential vs parallel cell evaluation over a synthetic run set.
//!
//! Run with: cargo bench --bench compute

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use simstats::counters::{CounterStore, RunKey, RunSet};
use simstats::engine::{EngineConfig, MetricEngine};
use simstats::rules::RuleRegistry;

const CORES: usize = 8;
const FILLER_COUNTERS: usize = 2_000;

/// Runs shaped like real dumps: per-core IPC, L3 counters and many unrelated stats
fn synthetic_runs(benchmarks: usize, configurations: usize) -> RunSet {
    let mut runs = RunSet::new();
    for b in 0..benchmarks {
        for c in 0..configurations {
            let mut counters: Vec<(String, f64)> = (0..CORES)
                .map(|core| (format!("system.cpu{core}.ipc"), (b + core) as f64 * 0.1))
                .collect();
            counters.push(("L3CacheMemory.m_demand_hits".to_string(), (b * 10 + c) as f64));
            counters.push(("L3CacheMemory.m_demand_accesses".to_string(), 1000.0));
            counters.extend(
                (0..FILLER_COUNTERS).map(|i| (format!("system.ruby.filler{i}.count"), i as f64)),
            );
            runs.insert(
                RunKey::new(format!("bench{b}"), format!("cfg{c}")),
                CounterStore::from_iter(counters),
            );
        }
    }
    runs
}

fn bench_compute_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_all");
    let registry = RuleRegistry::builtin();

    for (benchmarks, configurations) in [(4, 4), (16, 8)] {
        let runs = synthetic_runs(benchmarks, configurations);
        let cells = runs.len() * registry.len();

        for (label, parallel) in [("sequential", false), ("parallel", true)] {
            let engine = MetricEngine::with_config(EngineConfig::new().parallel(parallel));
            group.bench_with_input(BenchmarkId::new(label, cells), &runs, |b, runs| {
                b.iter(|| engine.compute_all(black_box(runs), &registry));
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_compute_all);
criterion_main!(benches);
