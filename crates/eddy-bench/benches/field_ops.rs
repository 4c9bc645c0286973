//! Criterion micro-benchmarks for field reductions, state shifts and regrid.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use eddy_bench::refined_layout;
use eddy_core::ParamTable;
use eddy_field::{field_minmax, SimCore, TimeState};
use eddy_mesh::LocalMesh;

/// A two-level core with a 3-component field holding a smooth profile.
fn filled_core(n: i32) -> SimCore {
    let mesh = LocalMesh::new(refined_layout(n, 16).unwrap()).unwrap();
    let mut core = SimCore::new(Box::new(mesh), ParamTable::new());
    let q = core.repo_mut().declare_field("q", 3, 2, 2).unwrap();
    for lev in 0..core.num_levels() {
        let arr = core.repo_mut().level_mut(q, TimeState::New, lev).unwrap();
        for comp in 0..3 {
            arr.for_each_valid_mut(comp, |iv, v| {
                *v = (iv[0] * 7 + iv[1] * 3 + iv[2] + comp as i32) as f64 * 0.01;
            });
        }
    }
    core
}

/// Benchmark: global min and max of one component over both levels.
fn bench_min_max_64(c: &mut Criterion) {
    let core = filled_core(64);
    c.bench_function("field_min_max_64", |b| {
        b.iter(|| {
            let lo = core.field_min("q", 1).unwrap();
            let hi = core.field_max("q", 1).unwrap();
            black_box((lo, hi));
        });
    });
}

/// Benchmark: fused min/max of every component.
fn bench_minmax_all_components_64(c: &mut Criterion) {
    let core = filled_core(64);
    let q = core.repo().require("q").unwrap();
    c.bench_function("field_minmax_3comp_64", |b| {
        b.iter(|| {
            let view = core.repo().view(q, TimeState::New).unwrap();
            for comp in 0..3 {
                black_box(field_minmax(&view, core.collective(), comp).unwrap());
            }
        });
    });
}

/// Benchmark: 1000 probes on the fine level.
fn bench_probe_1k(c: &mut Criterion) {
    let core = filled_core(64);
    c.bench_function("field_probe_1k", |b| {
        b.iter(|| {
            for i in 0..1000i32 {
                let iv = [32 + i % 64, 32 + (i / 64) % 64, 32 + i % 17];
                black_box(core.field_probe("q", 1, iv, 0).unwrap());
            }
        });
    });
}

/// Benchmark: shift New -> Old for every field.
fn bench_advance_states_64(c: &mut Criterion) {
    let mut core = filled_core(64);
    c.bench_function("advance_all_states_64", |b| {
        b.iter(|| core.repo_mut().advance_all_states());
    });
}

/// Benchmark: regrid a 32^3 two-level hierarchy onto its own layout.
fn bench_regrid_32(c: &mut Criterion) {
    let mut core = filled_core(32);
    let layout = core.mesh().layout().clone();
    c.bench_function("regrid_same_layout_32", |b| {
        b.iter(|| black_box(core.regrid(layout.clone()).unwrap()));
    });
}

criterion_group!(
    benches,
    bench_min_max_64,
    bench_minmax_all_components_64,
    bench_probe_1k,
    bench_advance_states_64,
    bench_regrid_32
);
criterion_main!(benches);
