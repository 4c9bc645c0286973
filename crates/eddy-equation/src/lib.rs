//! PDE family for the Eddy AMR solver core.
//!
//! A transported quantity is described by a [`PdeTraits`] bundle: its
//! names, component count, whether it is density-weighted
//! (`MULTIPLY_RHO`), whether it diffuses (`HAS_DIFFUSION`) and its default
//! boundary value. [`ScalarTransport`] combines a bundle with an advection
//! scheme ([`Upwind`], [`Central`]) and implements the shared [`Pde`]
//! update for every quantity, so a new PDE is defined by its trait values
//! alone.
//!
//! Source terms plug into a PDE through their own registry category
//! ([`SourceCategory`]). The [`PdeMgr`] owns the active PDEs and
//! broadcasts stage operations to them in registration order.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod fields;
pub mod kinds;
pub mod mgr;
pub mod pde;
pub mod scheme;
pub mod source;
pub mod transport;

pub use fields::PdeFields;
pub use kinds::{declare_flow_fields, Density, Temperature, Vof, DENSITY, PRESSURE, VELOCITY};
pub use mgr::PdeMgr;
pub use pde::{Pde, PdeCategory, PdeTraits, Stage};
pub use scheme::{Central, SchemeTraits, Upwind};
pub use source::{ConstantSource, Relaxation, SourceCategory, SourceInput, SourceTerm};
pub use transport::{register_transport, ScalarTransport};
