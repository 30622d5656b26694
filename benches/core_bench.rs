//! Benchmarks for desplegar core operations.
//!
//! Run with: cargo bench
//!
//! Results include 95% confidence intervals via Criterion.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use desplegar::core::journal::Journal;
use desplegar::core::{parser, types::Value};

/// Linear chain of n contracts, each depending on the previous one.
fn chain_plan(n: usize) -> String {
    let mut yaml = String::from("contracts:\n");
    for i in 0..n {
        yaml.push_str(&format!("  - contract: C{i:04}\n"));
        if i > 0 {
            yaml.push_str(&format!("    args: [\"@C{:04}\"]\n", i - 1));
            yaml.push_str(&format!("    dependencies: [\"@C{:04}\"]\n", i - 1));
        }
    }
    yaml
}

fn bench_plan_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_parse");
    for n in [10, 50, 100] {
        let yaml = chain_plan(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &yaml, |b, yaml| {
            b.iter(|| {
                let plan = parser::parse_plan(black_box(yaml)).unwrap();
                black_box(plan);
            });
        });
    }
    group.finish();
}

fn bench_plan_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan_validate");
    for n in [10, 50, 100] {
        let plan = parser::parse_plan(&chain_plan(n)).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(n), &plan, |b, plan| {
            b.iter(|| {
                let errors = parser::validate_plan(black_box(plan));
                black_box(errors);
            });
        });
    }
    group.finish();
}

fn bench_journal_roundtrip(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();

    let mut group = c.benchmark_group("journal_roundtrip");
    for n in [10, 100] {
        let network = format!("bench{n}");
        let mut journal = Journal::load(dir.path(), &network).unwrap();
        for i in 0..n {
            let name = format!("C{i:04}");
            journal
                .record_deployed(&name, &format!("0x{i:040x}"), false)
                .unwrap();
            journal
                .mark_action_pending(&name, "initialize", &[Value::from(i)])
                .unwrap();
            journal
                .mark_action_completed(&name, "initialize", &[Value::from(i)])
                .unwrap();
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(n),
            dir.path(),
            |b, state_dir| {
                b.iter(|| {
                    let loaded = Journal::load(black_box(state_dir), &network).unwrap();
                    black_box(loaded);
                });
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_plan_parse,
    bench_plan_validate,
    bench_journal_roundtrip
);
criterion_main!(benches);
