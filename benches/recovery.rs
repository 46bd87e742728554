//! Benchmarks for illumination throughput and Gaussian Process refits.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use arm_recovery::{
    compute::evolution::{Archive, ControllerRng, IlluminationSearch},
    compute::{AdaptationEngine, Arm, Grid},
    schema::{AdaptationConfig, GridConfig, IlluminationConfig, MutationConfig},
};

const ITERATIONS: usize = 20_000;

fn illumination(batch_size: usize) -> IlluminationConfig {
    IlluminationConfig {
        iterations: ITERATIONS,
        bootstrap: 400,
        mutation: MutationConfig::default(),
        batch_size,
        report_interval: ITERATIONS,
    }
}

fn illuminated_archive() -> Archive {
    let mut archive = Archive::new(Grid::from_config(&GridConfig::default()));
    IlluminationSearch::with_parts(illumination(5_000), Arm::new(8, 0.62), ControllerRng::new(1))
        .run(&mut archive)
        .unwrap();
    archive
}

fn bench_illumination(c: &mut Criterion) {
    let mut group = c.benchmark_group("illumination");
    group.sample_size(10);

    for batch_size in [0, 1_000, 5_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("batch_{}", batch_size)),
            &batch_size,
            |b, &batch_size| {
                b.iter(|| {
                    let mut archive = Archive::new(Grid::from_config(&GridConfig::default()));
                    let mut search = IlluminationSearch::with_parts(
                        illumination(batch_size),
                        Arm::new(8, 0.62),
                        ControllerRng::new(7),
                    );
                    search.run(black_box(&mut archive)).unwrap()
                });
            },
        );
    }

    group.finish();
}

fn bench_refit(c: &mut Criterion) {
    let archive = illuminated_archive();
    let mut group = c.benchmark_group("gp_refit");

    for trials in [1, 5, 10, 20] {
        let mut engine = AdaptationEngine::new(&archive, AdaptationConfig::default()).unwrap();
        for (i, &cell) in archive.known_cells().iter().take(trials).enumerate() {
            engine.record_trial(cell, -0.1 * i as f64).unwrap();
        }

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_trials", trials)),
            &trials,
            |b, _| {
                b.iter(|| {
                    engine.refit().unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_illumination, bench_refit);
criterion_main!(benches);
