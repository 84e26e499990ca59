mod evaluate_common;

use canopy_core::Response;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use evaluate_common::{baseline_specs, build_scenario};
use std::hint::black_box;

fn score(response: Response) -> usize {
    if response.is_allowed() {
        response.diagnostics.reasons.len()
    } else {
        0
    }
}

fn benchmark_evaluate_baseline(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate_baseline");
    group.sample_size(40);

    let scenarios: Vec<_> = baseline_specs().into_iter().map(build_scenario).collect();

    for scenario in &scenarios {
        group.bench_with_input(BenchmarkId::from_parameter(scenario.name), scenario, |b, s| {
            b.iter(|| {
                let response = s
                    .engine
                    .evaluate(black_box(&s.request), &s.entities)
                    .expect("benchmark requests are valid");
                black_box(score(response));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_evaluate_baseline);
criterion_main!(benches);
