//! Simulation driver for the Eddy AMR solver core.
//!
//! [`Simulation`] builds the active PDEs and physics named in a
//! [`SimConfig`] from explicit [`Registries`], then sequences the
//! lifecycle phases: setup, timesteps and regrids. A [`PhaseTracker`]
//! rejects out-of-order driver calls with a [`LifecycleError`].
//!
//! Each timestep runs `pre_advance_work`, `pre_predictor_work`, one PDE
//! stage per [`Integrator`] stage with a bracketed [`PressureProjection`]
//! after each, and `post_advance_work`. Per-step timings are returned as
//! [`StepMetrics`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod metrics;
pub mod projection;
pub mod registries;
pub mod simulation;

pub use config::{Integrator, SimConfig};
pub use error::{ConfigError, LifecycleError, SimError};
pub use lifecycle::PhaseTracker;
pub use metrics::StepMetrics;
pub use projection::{NoProjection, PressureProjection};
pub use registries::{
    default_pde_registry, default_physics_registry, default_source_registry,
    register_builtin_pdes, Registries,
};
pub use simulation::{RegridPolicy, Simulation};
