//! Test utilities and mock types for Eddy development.
//!
//! Provides a [`RecordingPhysics`] that logs every lifecycle hook into a
//! shared [`CallLog`], a [`FailingPhysics`], a [`RecordingCollective`]
//! that logs reduction calls, a [`ThreadCollective`] for multi-rank runs
//! inside one process, the [`MockMomentum`] PDE bundle, and mesh fixtures
//! in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::fmt;
use std::sync::{Arc, Barrier, Mutex, MutexGuard};

use eddy_core::{ConstructResult, FieldError, Geometry, Registered, RegistryBuilder, RegistryError};
use eddy_equation::{PdeTraits, ScalarTransport, Upwind};
use eddy_field::SimCore;
use eddy_mesh::Collective;
use eddy_physics::{Physics, PhysicsCategory};

/// A shared, ordered log of hook calls.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry.into());
    }

    /// A copy of every entry so far.
    pub fn entries(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Entries whose hook part (after the `:`) equals `hook`.
    pub fn for_hook(&self, hook: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.split_once(':').is_some_and(|(_, h)| h.starts_with(hook)))
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn len(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Logs `"<name>:<hook>"` for every lifecycle hook it receives.
///
/// `initialize_fields` is logged as `"<name>:initialize_fields(<lev>)"`
/// and `post_regrid_actions` as `"<name>:post_regrid_actions(<levels>)"`.
#[derive(Debug)]
pub struct RecordingPhysics {
    pub name: String,
    log: CallLog,
}

impl RecordingPhysics {
    pub fn new(name: impl Into<String>, log: CallLog) -> Self {
        Self {
            name: name.into(),
            log,
        }
    }

    fn record(&self, hook: &str) {
        self.log.push(format!("{}:{}", self.name, hook));
    }
}

impl Registered for RecordingPhysics {
    fn identifier() -> String {
        "Recording".to_string()
    }
}

impl Physics for RecordingPhysics {
    fn pre_init_actions(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        self.record("pre_init_actions");
        Ok(())
    }

    fn initialize_fields(
        &mut self,
        _core: &mut SimCore,
        lev: usize,
        _geom: &Geometry,
    ) -> Result<(), FieldError> {
        self.record(&format!("initialize_fields({lev})"));
        Ok(())
    }

    fn post_init_actions(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        self.record("post_init_actions");
        Ok(())
    }

    fn post_regrid_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.record(&format!("post_regrid_actions({})", core.num_levels()));
        Ok(())
    }

    fn pre_advance_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        self.record("pre_advance_work");
        Ok(())
    }

    fn pre_predictor_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        self.record("pre_predictor_work");
        Ok(())
    }

    fn pre_pressure_correction_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        self.record("pre_pressure_correction_work");
        Ok(())
    }

    fn post_pressure_correction_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        self.record("post_pressure_correction_work");
        Ok(())
    }

    fn post_advance_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        self.record("post_advance_work");
        Ok(())
    }
}

/// Register a [`RecordingPhysics`] under each of `names`, all sharing `log`.
pub fn register_recording(
    builder: &mut RegistryBuilder<PhysicsCategory>,
    names: &[&str],
    log: &CallLog,
) -> Result<(), RegistryError> {
    for name in names {
        let (name, log) = (name.to_string(), log.clone());
        builder.register(name.clone(), move |_core: &mut SimCore| -> ConstructResult<dyn Physics> {
            Ok(Box::new(RecordingPhysics::new(name.clone(), log.clone())))
        })?;
    }
    Ok(())
}

/// Fails `post_advance_work` once it has succeeded `fail_after` times.
#[derive(Debug)]
pub struct FailingPhysics {
    pub field: String,
    pub fail_after: usize,
    calls: usize,
}

impl FailingPhysics {
    /// The error names `field` as an unknown field.
    pub fn new(field: impl Into<String>, fail_after: usize) -> Self {
        Self {
            field: field.into(),
            fail_after,
            calls: 0,
        }
    }
}

impl Registered for FailingPhysics {
    fn identifier() -> String {
        "Failing".to_string()
    }
}

impl Physics for FailingPhysics {
    fn initialize_fields(
        &mut self,
        _core: &mut SimCore,
        _lev: usize,
        _geom: &Geometry,
    ) -> Result<(), FieldError> {
        Ok(())
    }

    fn post_init_actions(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        Ok(())
    }

    fn post_regrid_actions(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        Ok(())
    }

    fn pre_advance_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        Ok(())
    }

    fn post_advance_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        if self.calls >= self.fail_after {
            return Err(FieldError::UnknownField {
                name: self.field.clone(),
            });
        }
        self.calls += 1;
        Ok(())
    }
}

/// A serial collective that logs every reduction it performs.
///
/// Reports `rank` of `size` but reduces like a single rank, so each
/// instance sees only its local contribution. Compare the [`ops`]
/// sequences of two instances to check that every rank issues the same
/// collectives.
///
/// [`ops`]: RecordingCollective::ops
#[derive(Clone, Debug, Default)]
pub struct RecordingCollective {
    rank: usize,
    size: usize,
    ops: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingCollective {
    pub fn new(rank: usize, size: usize) -> Self {
        Self {
            rank,
            size,
            ops: Arc::default(),
        }
    }

    /// The reductions issued so far, oldest first.
    pub fn ops(&self) -> Vec<&'static str> {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn log(&self, op: &'static str) {
        self.ops.lock().unwrap_or_else(|e| e.into_inner()).push(op);
    }
}

impl Collective for RecordingCollective {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.size.max(1)
    }

    fn sum(&self, local: f64) -> f64 {
        self.log("sum");
        local
    }

    fn min(&self, local: f64) -> f64 {
        self.log("min");
        local
    }

    fn max(&self, local: f64) -> f64 {
        self.log("max");
        local
    }

    fn sum_all(&self, _values: &mut [f64]) {
        self.log("sum_all");
    }
}

/// One rank of a group of collectives that really reduce across ranks.
///
/// Each rank must be driven from its own thread: every reduction blocks
/// until all ranks of the group have contributed.
#[derive(Clone)]
pub struct ThreadCollective {
    rank: usize,
    shared: Arc<Exchange>,
}

struct Exchange {
    barrier: Barrier,
    slots: Mutex<Vec<Vec<f64>>>,
}

impl ThreadCollective {
    /// `size` connected ranks, in rank order.
    pub fn group(size: usize) -> Vec<Self> {
        let shared = Arc::new(Exchange {
            barrier: Barrier::new(size),
            slots: Mutex::new(vec![Vec::new(); size]),
        });
        (0..size)
            .map(|rank| Self {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }

    fn slots(&self) -> MutexGuard<'_, Vec<Vec<f64>>> {
        self.shared.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn reduce(&self, values: &mut [f64], op: fn(f64, f64) -> f64) {
        self.slots()[self.rank] = values.to_vec();
        self.shared.barrier.wait();
        {
            let slots = self.slots();
            for (n, v) in values.iter_mut().enumerate() {
                *v = slots.iter().map(|s| s[n]).reduce(op).unwrap_or(*v);
            }
        }
        // Nobody overwrites a slot until every rank has read them all.
        self.shared.barrier.wait();
    }

    fn reduce_one(&self, local: f64, op: fn(f64, f64) -> f64) -> f64 {
        let mut v = [local];
        self.reduce(&mut v, op);
        v[0]
    }
}

impl fmt::Debug for ThreadCollective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadCollective")
            .field("rank", &self.rank)
            .field("size", &self.size())
            .finish()
    }
}

impl Collective for ThreadCollective {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.slots().len()
    }

    fn sum(&self, local: f64) -> f64 {
        self.reduce_one(local, |a, b| a + b)
    }

    fn min(&self, local: f64) -> f64 {
        self.reduce_one(local, f64::min)
    }

    fn max(&self, local: f64) -> f64 {
        self.reduce_one(local, f64::max)
    }

    fn sum_all(&self, values: &mut [f64]) {
        self.reduce(values, |a, b| a + b);
    }
}

/// Momentum-like bundle: the 3-component flow velocity, density-weighted
/// and diffusive.
#[derive(Debug)]
pub struct MockMomentum;

impl PdeTraits for MockMomentum {
    const PDE_NAME: &'static str = "MockMomentum";
    const VAR_NAME: &'static str = "velocity";
    const NCOMP: usize = 3;
    const MULTIPLY_RHO: bool = true;
    const HAS_DIFFUSION: bool = true;
    const DEFAULT_BC_VALUE: f64 = 0.0;
}

/// [`MockMomentum`] with upwind advection, registered as `"MockMomentum-Upwind"`.
pub type MockMomentumUpwind = ScalarTransport<MockMomentum, Upwind>;
