//! Eddy: the plugin orchestration core of a block-structured AMR flow solver.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Eddy sub-crates. For most users, adding `eddy` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use eddy::prelude::*;
//!
//! let layout = MeshLayout::single_level(LevelLayout::chopped(Geometry::unit_cube(8), 4));
//! let mesh = LocalMesh::new(layout).unwrap();
//!
//! let config = SimConfig {
//!     pdes: vec!["VOF-Upwind".to_string()],
//!     physics: vec!["FreeStream".to_string(), "VofSphere".to_string()],
//!     dt: 0.01,
//!     max_steps: 2,
//!     params: ParamTable::new()
//!         .with("flow.velocity", [1.0, 0.0, 0.0])
//!         .with("VofSphere.center", [0.5, 0.5, 0.5])
//!         .with("VofSphere.radius", 0.25),
//!     ..SimConfig::default()
//! };
//! let mut sim = Simulation::new(config, Registries::defaults(), Box::new(mesh)).unwrap();
//! sim.init().unwrap();
//! sim.run(&mut |_: &Simulation| None).unwrap();
//!
//! assert_eq!(sim.step(), StepId(2));
//! assert!(sim.core().field_max("vof", 0).unwrap() <= 1.0 + 1e-12);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `eddy-core` | IDs, geometry, errors, parameters, `Registry`, `CollectionMgr` |
//! | [`mesh`] | `eddy-mesh` | Mesh engine seam, collectives, level arrays, `LocalMesh` |
//! | [`field`] | `eddy-field` | `FieldRepo`, time states, reductions, `SimCore` |
//! | [`equation`] | `eddy-equation` | PDE traits, `ScalarTransport`, source terms, `PdeMgr` |
//! | [`physics`] | `eddy-physics` | Physics hooks, `PhysicsMgr`, built-in physics |
//! | [`sim`] | `eddy-sim` | `Simulation` driver, configuration, default registries |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, registries and collection managers (`eddy-core`).
pub use eddy_core as types;

/// The mesh/array engine seam (`eddy-mesh`).
///
/// [`mesh::LocalMesh`] is the single-process implementation.
pub use eddy_mesh as mesh;

/// Field storage and cross-level reductions (`eddy-field`).
pub use eddy_field as field;

/// PDE family (`eddy-equation`).
///
/// A new transported quantity is a [`equation::PdeTraits`] bundle
/// registered through [`equation::register_transport`].
pub use eddy_equation as equation;

/// Physics family (`eddy-physics`).
pub use eddy_physics as physics;

/// Simulation driver (`eddy-sim`).
pub use eddy_sim as sim;

/// Common imports for typical Eddy usage.
///
/// ```rust
/// use eddy::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use eddy_core::{
        CollectionMgr, ConstructResult, FieldId, Geometry, IndexBox, IntVect, ParamTable,
        Registered, Registry, RegistryBuilder, StepId,
    };

    // Errors
    pub use eddy_core::{FieldError, ParamError, RegistryError};

    // Mesh
    pub use eddy_mesh::{Collective, LevelLayout, LocalMesh, MeshEngine, MeshLayout};

    // Fields
    pub use eddy_field::{FieldRepo, SimCore, TimeState};

    // PDEs
    pub use eddy_equation::{Pde, PdeCategory, PdeMgr, PdeTraits, ScalarTransport, Stage};

    // Physics
    pub use eddy_physics::{Phase, Physics, PhysicsCategory, PhysicsMgr};

    // Driver
    pub use eddy_sim::{
        ConfigError, Integrator, Registries, SimConfig, SimError, Simulation, StepMetrics,
    };
}
