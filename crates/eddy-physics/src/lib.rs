//! Physics family for the Eddy AMR solver core.
//!
//! A [`Physics`] module is driven through a fixed sequence of lifecycle
//! [`Phase`]s: construction, per-level initialization, post-init, and
//! then per timestep the pre-advance, pre-predictor, pressure-correction
//! and post-advance hooks, with post-regrid between timesteps. The
//! [`PhysicsMgr`] owns the active modules and broadcasts each phase to
//! them in registration order.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod builtin;
pub mod mgr;
pub mod physics;

pub use builtin::{
    register_builtins, FieldMonitor, FreeStream, MonitorRecord, MultiPhase, Perturbation,
    VofSphere,
};
pub use mgr::PhysicsMgr;
pub use physics::{Phase, Physics, PhysicsCategory};
