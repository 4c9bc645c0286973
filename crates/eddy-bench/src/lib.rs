//! Benchmark profiles for the Eddy AMR solver core.
//!
//! - [`reference_profile`]: 32^3 base level, two-phase VOF setup
//! - [`stress_profile`]: the same setup on 64^3 with a refined patch
//! - [`refined_layout`]: a base level plus one centered refined patch

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use eddy_core::{Geometry, IndexBox, ParamTable};
use eddy_mesh::{LevelLayout, LocalMesh, MeshError, MeshLayout};
use eddy_sim::{Integrator, SimConfig};

/// Base level of `n^3` cells in boxes of `max_box`, plus one refined
/// patch covering the middle half of the domain.
pub fn refined_layout(n: i32, max_box: usize) -> Result<MeshLayout, MeshError> {
    let base = LevelLayout::chopped(Geometry::unit_cube(n), max_box);
    // Fine-index box over coarse cells [n/4, 3n/4).
    let patch = IndexBox::new([n / 2; 3], [3 * n / 2 - 1; 3])?;
    Ok(MeshLayout::single_level(base).with_refined_level(patch.chop(max_box)))
}

/// A serial mesh over a single level of `n^3` cells.
pub fn single_level_mesh(n: i32, max_box: usize) -> Result<LocalMesh, MeshError> {
    LocalMesh::new(MeshLayout::single_level(LevelLayout::chopped(
        Geometry::unit_cube(n),
        max_box,
    )))
}

fn two_phase_config(max_steps: u64) -> SimConfig {
    SimConfig {
        physics: ["FreeStream", "VofSphere", "MultiPhase", "FieldMonitor"]
            .map(String::from)
            .to_vec(),
        pdes: vec!["VOF-Upwind".to_string(), "Temperature-Upwind".to_string()],
        dt: 1.0,
        cfl: Some(0.5),
        max_steps,
        integrator: Integrator::PredictorCorrector,
        regrid_interval: None,
        params: ParamTable::new()
            .with("flow.velocity", [1.0, 0.5, 0.0])
            .with("VofSphere.center", [0.5, 0.5, 0.5])
            .with("VofSphere.radius", 0.25)
            .with("Temperature.diffusivity", 1.0e-3)
            .with("FieldMonitor.fields", ["vof", "density"]),
    }
}

/// Reference profile: VOF and temperature transport with a sphere of
/// heavy fluid, 10 steps. Pair with [`single_level_mesh`]`(32, 16)`.
pub fn reference_profile() -> SimConfig {
    two_phase_config(10)
}

/// Stress profile: [`reference_profile`] settings for 50 steps. Pair
/// with a mesh over [`refined_layout`]`(64, 32)`.
pub fn stress_profile() -> SimConfig {
    two_phase_config(50)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_validate() {
        assert!(reference_profile().validate().is_ok());
        assert_eq!(stress_profile().max_steps, 50);
    }

    #[test]
    fn refined_layout_is_accepted() {
        let mesh = LocalMesh::new(refined_layout(16, 8).unwrap()).unwrap();
        assert_eq!(eddy_mesh::MeshEngine::num_levels(&mesh), 2);
    }
}
