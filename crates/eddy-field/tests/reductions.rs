//! Cross-level reductions over a two-level hierarchy.

use std::sync::Arc;

use proptest::prelude::*;

use eddy_core::{IntVect, ParamTable};
use eddy_field::{field_max, field_min, field_probe, field_sum, SimCore, TimeState};
use eddy_test_utils::fixtures::{core_on, distributed, rank_core, two_level_layout};
use eddy_test_utils::RecordingCollective;

/// Level 0 cycles through {1, 2, 3} along x, level 1 alternates {0.5, 4}.
fn pressure_core() -> SimCore {
    let mut core = core_on(two_level_layout(), ParamTable::new());
    fill_pressure(&mut core);
    core
}

fn fill_pressure(core: &mut SimCore) {
    let p = core.repo_mut().declare_field("pressure", 1, 2, 1).unwrap();
    core.repo_mut()
        .level_mut(p, TimeState::New, 0)
        .unwrap()
        .for_each_valid_mut(0, |iv, v| *v = (iv[0] % 3 + 1) as f64);
    core.repo_mut()
        .level_mut(p, TimeState::New, 1)
        .unwrap()
        .for_each_valid_mut(0, |iv, v| *v = if iv[0] % 2 == 0 { 0.5 } else { 4.0 });
}

#[test]
fn two_level_min_and_max() {
    let core = pressure_core();
    assert_eq!(core.field_min("pressure", 0).unwrap(), 0.5);
    assert_eq!(core.field_max("pressure", 0).unwrap(), 4.0);
    let p = core.repo().require("pressure").unwrap();
    assert_eq!(core.repo().info(p).unwrap().nghost, 2);
}

#[test]
fn probe_reads_the_owning_level() {
    let core = pressure_core();
    assert_eq!(core.field_probe("pressure", 0, [0, 0, 0], 0).unwrap(), 1.0);
    assert_eq!(core.field_probe("pressure", 0, [5, 7, 1], 0).unwrap(), 3.0);
    assert_eq!(core.field_probe("pressure", 1, [4, 4, 4], 0).unwrap(), 0.5);
    assert_eq!(core.field_probe("pressure", 1, [5, 9, 11], 0).unwrap(), 4.0);
}

#[test]
fn probe_outside_valid_region_is_zero() {
    let core = pressure_core();
    assert_eq!(core.field_probe("pressure", 0, [20, 0, 0], 0).unwrap(), 0.0);
    assert_eq!(core.field_probe("pressure", 0, [-1, 0, 0], 0).unwrap(), 0.0);
    // Inside the level-1 domain but outside its patch.
    assert_eq!(core.field_probe("pressure", 1, [0, 0, 0], 0).unwrap(), 0.0);
}

#[test]
fn every_rank_issues_the_same_collectives() {
    let layout = distributed(&two_level_layout(), 2);
    let mut ops = Vec::new();
    for rank in 0..2 {
        let comm = RecordingCollective::new(rank, 2);
        let mut core = rank_core(layout.clone(), Arc::new(comm.clone()));
        fill_pressure(&mut core);
        let p = core.repo().require("pressure").unwrap();
        let view = core.repo().view(p, TimeState::New).unwrap();
        field_min(&view, core.collective(), 0).unwrap();
        field_max(&view, core.collective(), 0).unwrap();
        field_sum(&view, core.collective(), 0).unwrap();
        field_probe(&view, core.collective(), 1, [4, 4, 4], 0).unwrap();
        ops.push(comm.ops());
    }
    // The single level-1 box lives on rank 0; rank 1 still participates.
    assert_eq!(ops[0], ops[1]);
    assert_eq!(ops[0], ["min", "min", "max", "max", "sum", "sum", "sum"]);
}

#[test]
fn argument_errors_issue_no_collectives() {
    let comm = RecordingCollective::new(0, 1);
    let mut core = rank_core(two_level_layout(), Arc::new(comm.clone()));
    fill_pressure(&mut core);
    let p = core.repo().require("pressure").unwrap();
    let view = core.repo().view(p, TimeState::New).unwrap();
    assert!(field_min(&view, core.collective(), 1).is_err());
    assert!(field_probe(&view, core.collective(), 2, [0, 0, 0], 0).is_err());
    assert!(comm.ops().is_empty());
}

fn level0_cell() -> impl Strategy<Value = IntVect> {
    [0..8i32, 0..8i32, 0..8i32]
}

fn level1_cell() -> impl Strategy<Value = IntVect> {
    [4..12i32, 4..12i32, 4..12i32]
}

proptest! {
    #[test]
    fn probe_lies_between_min_and_max(
        coarse in prop::collection::vec(-1.0e3..1.0e3f64, 512),
        fine in prop::collection::vec(-1.0e3..1.0e3f64, 512),
        c in level0_cell(),
        f in level1_cell(),
    ) {
        let mut core = core_on(two_level_layout(), ParamTable::new());
        let q = core.repo_mut().declare_field("q", 1, 1, 1).unwrap();
        core.repo_mut().level_mut(q, TimeState::New, 0).unwrap().for_each_valid_mut(0, |iv, v| {
            *v = coarse[(iv[0] + 8 * (iv[1] + 8 * iv[2])) as usize];
        });
        core.repo_mut().level_mut(q, TimeState::New, 1).unwrap().for_each_valid_mut(0, |iv, v| {
            *v = fine[((iv[0] - 4) + 8 * ((iv[1] - 4) + 8 * (iv[2] - 4))) as usize];
        });
        let lo = core.field_min("q", 0).unwrap();
        let hi = core.field_max("q", 0).unwrap();
        for (lev, iv) in [(0, c), (1, f)] {
            let v = core.field_probe("q", lev, iv, 0).unwrap();
            prop_assert!(lo <= v && v <= hi, "{lo} <= {v} <= {hi} at level {lev} {iv:?}");
        }
    }
}
