//! Mesh engine seam for the Eddy AMR solver core.
//!
//! The solver core never owns the distributed mesh. It talks to it through
//! the narrow [`MeshEngine`] trait: enumerate levels, describe their
//! geometry and box decomposition, allocate [`LevelArray`]s, fill ghost
//! cells, and run [`Collective`] reductions.
//!
//! [`LocalMesh`] is a single-process implementation that every test and
//! small run uses.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
pub mod collective;
pub mod engine;
pub mod error;
pub mod layout;
pub mod local;

pub use array::{Block, LevelArray};
pub use collective::{Collective, SerialCollective};
pub use engine::{parent_cell, MeshEngine};
pub use error::MeshError;
pub use layout::{LevelLayout, MeshLayout};
pub use local::LocalMesh;
