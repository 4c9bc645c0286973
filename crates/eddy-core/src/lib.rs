//! Core types and traits for the Eddy AMR solver core.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! abstractions everything else plugs into: identifiers, index-space
//! geometry, error types, the run-time parameter table, the per-category
//! [`Registry`] that maps string identifiers to constructors, and the
//! [`CollectionMgr`] that owns the active instances of one category.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod collection;
pub mod error;
pub mod geometry;
pub mod id;
pub mod params;
pub mod registry;

pub use collection::CollectionMgr;
pub use error::{FieldError, GeometryError, ParamError, RegistryError};
pub use geometry::{Geometry, IndexBox, IntVect, SPACEDIM};
pub use id::{FieldId, StepId};
pub use params::{ParamScope, ParamTable, ParamValue};
pub use registry::{Category, ConstructResult, Registered, Registry, RegistryBuilder};
