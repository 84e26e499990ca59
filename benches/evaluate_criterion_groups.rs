mod evaluate_common;

use canopy_core::is_authorized;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use evaluate_common::{build_scenario, group_specs};
use std::hint::black_box;

/// Group scenarios go through the free function so the numbers exclude
/// snapshot locking and metrics.
fn benchmark_evaluate_groups(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_groups");
    group.sample_size(40);

    let scenarios: Vec<_> = group_specs().into_iter().map(build_scenario).collect();

    for scenario in &scenarios {
        let snapshot = scenario
            .engine
            .current_snapshot()
            .expect("fresh engine lock is not poisoned");
        group.bench_with_input(
            BenchmarkId::from_parameter(scenario.name),
            scenario,
            |b, s| {
                b.iter(|| {
                    let response =
                        is_authorized(black_box(&s.request), snapshot.policies(), &s.entities);
                    black_box(response.is_allowed());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_evaluate_groups);
criterion_main!(benches);
