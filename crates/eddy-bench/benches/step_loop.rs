//! Criterion benchmarks for full timesteps through the driver.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use eddy_bench::{reference_profile, refined_layout, single_level_mesh, stress_profile};
use eddy_mesh::LocalMesh;
use eddy_sim::{Registries, Simulation};

/// Benchmark: one predictor-corrector step of the reference profile.
fn bench_reference_step(c: &mut Criterion) {
    let mut sim = Simulation::new(
        reference_profile(),
        Registries::defaults(),
        Box::new(single_level_mesh(32, 16).unwrap()),
    )
    .unwrap();
    sim.init().unwrap();
    c.bench_function("reference_step_32", |b| {
        b.iter(|| black_box(sim.advance().unwrap()));
    });
}

/// Benchmark: setup and initialization of the stress profile.
fn bench_stress_setup(c: &mut Criterion) {
    c.bench_function("stress_setup_64_two_level", |b| {
        b.iter_batched(
            || LocalMesh::new(refined_layout(64, 32).unwrap()).unwrap(),
            |mesh| {
                let mut sim =
                    Simulation::new(stress_profile(), Registries::defaults(), Box::new(mesh))
                        .unwrap();
                sim.init().unwrap();
                black_box(sim.step())
            },
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_reference_step, bench_stress_setup);
criterion_main!(benches);
