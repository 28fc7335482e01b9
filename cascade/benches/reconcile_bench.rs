//! Benchmarks for navigation and message merging.

use cascade::messages::deep_merge;
use cascade::testing::{MockModule, TestHarness};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::json;

fn harness() -> TestHarness {
    let harness = TestHarness::new();
    harness.module("main", MockModule::layout("<main>", 2));
    harness.module("main/a", MockModule::layout("<a>", 3));
    harness.module("main/a/b", MockModule::leaf("<b>"));
    harness.module("main/a/c", MockModule::leaf("<c>"));
    harness
}

fn navigation_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let harness = harness();
    runtime.block_on(harness.engine.navigate("a/b", false)).unwrap();

    c.bench_function("swap_leaf", |b| {
        let mut leaf = ["c", "b"].into_iter().cycle();
        b.iter(|| {
            let path = format!("a/{}", leaf.next().unwrap_or("b"));
            black_box(runtime.block_on(harness.engine.navigate(&path, false)).unwrap())
        });
    });

    c.bench_function("parameters_only", |b| {
        let mut counter = 0_u64;
        b.iter(|| {
            counter += 1;
            let path = format!("a/c/{counter}");
            black_box(runtime.block_on(harness.engine.navigate(&path, false)).unwrap())
        });
    });
}

fn merge_benchmark(c: &mut Criterion) {
    let overlay = json!({
        "title": "Users",
        "menu": {"users": "People", "settings": {"profile": "Profile"}},
        "labels": ["a", "b", "c"],
    });

    c.bench_function("deep_merge", |b| {
        b.iter(|| {
            let mut target = json!({
                "title": "App",
                "menu": {"home": "Home", "users": "Users", "settings": {"theme": "Theme"}},
            });
            deep_merge(&mut target, black_box(&overlay));
            target
        });
    });
}

criterion_group!(benches, navigation_benchmark, merge_benchmark);
criterion_main!(benches);
