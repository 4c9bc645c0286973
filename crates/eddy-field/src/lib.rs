//! Field repository and cross-level queries for the Eddy AMR solver core.
//!
//! A [`FieldRepo`] owns, for every declared field, one [`LevelArray`] per
//! active level and retained [`TimeState`]. Modules refer to fields by
//! name or [`FieldId`]; storage is never duplicated.
//!
//! [`SimCore`] bundles the repository with the mesh engine, the run-time
//! parameters and the simulation clock. It is the context every physics
//! and PDE module is constructed with and mutates through its hooks.
//!
//! [`LevelArray`]: eddy_mesh::LevelArray
//! [`FieldId`]: eddy_core::FieldId

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod reduce;
pub mod repo;
pub mod state;
pub mod view;

pub use context::{SimCore, SimTime};
pub use reduce::{field_max, field_min, field_minmax, field_probe, field_sum};
pub use repo::{FieldRepo, RegridReport};
pub use state::{FieldInfo, TimeState, MAX_STATES};
pub use view::{FieldView, LevelView, ScratchField};
