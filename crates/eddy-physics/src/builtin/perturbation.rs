//! Seeded random perturbation of an initial field.
//!
//! Every cell draws from its own ChaCha8 stream seeded by
//! `(seed, level, cell index)`, so the perturbation is identical however
//! the level is split into boxes or distributed across ranks.

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use eddy_core::{FieldError, Geometry, IntVect, ParamError, Registered};
use eddy_equation::VELOCITY;
use eddy_field::{SimCore, TimeState};

use crate::physics::Physics;

/// Adds `amplitude * U(-1, 1)` to every component of one field at
/// initialization.
///
/// Parameters: `Perturbation.field` (default `velocity`),
/// `Perturbation.amplitude` (default 0.01), `Perturbation.seed`
/// (default 0).
#[derive(Clone, Debug, PartialEq)]
pub struct Perturbation {
    field: String,
    amplitude: f64,
    seed: u64,
}

/// SplitMix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn cell_seed(seed: u64, lev: usize, iv: IntVect) -> u64 {
    let mut h = mix(seed ^ 0x9e37_79b9_7f4a_7c15);
    h = mix(h ^ lev as u64);
    for i in iv {
        h = mix(h ^ (i as i64 as u64));
    }
    h
}

/// A uniform sample in `[-1, 1)` from the top 53 bits.
fn symmetric_unit(rng: &mut ChaCha8Rng) -> f64 {
    let u = (rng.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
    2.0 * u - 1.0
}

impl Perturbation {
    /// Read the perturbation parameters.
    pub fn new(core: &mut SimCore) -> Result<Self, ParamError> {
        let scope = core.params().scope("Perturbation");
        let field = scope.get_str_or("field", VELOCITY)?;
        let amplitude = scope.get_f64_or("amplitude", 0.01)?;
        if !amplitude.is_finite() {
            return Err(ParamError::Invalid {
                key: scope.key("amplitude"),
                reason: "must be finite".to_string(),
            });
        }
        let seed = scope.get_u64_or("seed", 0)?;
        Ok(Self {
            field,
            amplitude,
            seed,
        })
    }

    /// The perturbation of component `comp` at cell `iv` of level `lev`.
    pub fn sample(&self, lev: usize, iv: IntVect, comp: usize) -> f64 {
        let mut rng = ChaCha8Rng::seed_from_u64(cell_seed(self.seed, lev, iv));
        let mut value = 0.0;
        for _ in 0..=comp {
            value = symmetric_unit(&mut rng);
        }
        self.amplitude * value
    }
}

impl Registered for Perturbation {
    fn identifier() -> String {
        "Perturbation".to_string()
    }
}

impl Physics for Perturbation {
    fn initialize_fields(
        &mut self,
        core: &mut SimCore,
        lev: usize,
        _geom: &Geometry,
    ) -> Result<(), FieldError> {
        let id = core.repo().require(&self.field)?;
        let arr = core.repo_mut().level_mut(id, TimeState::New, lev)?;
        let ncomp = arr.ncomp();
        for block in arr.blocks_mut() {
            for iv in block.valid().cells() {
                let mut rng = ChaCha8Rng::seed_from_u64(cell_seed(self.seed, lev, iv));
                for comp in 0..ncomp {
                    let delta = self.amplitude * symmetric_unit(&mut rng);
                    if let Some(v) = block.get_mut(iv, comp) {
                        *v += delta;
                    }
                }
            }
        }
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
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eddy_core::ParamTable;
    use eddy_mesh::{LevelLayout, LocalMesh, MeshLayout};

    fn perturbed(max_box: usize, seed: i64) -> SimCore {
        let mesh = LocalMesh::new(MeshLayout::single_level(LevelLayout::chopped(
            Geometry::unit_cube(8),
            max_box,
        )))
        .unwrap();
        let params = ParamTable::new()
            .with("Perturbation.field", "q")
            .with("Perturbation.amplitude", 0.5)
            .with("Perturbation.seed", seed);
        let mut core = SimCore::new(Box::new(mesh), params);
        core.repo_mut().declare_field("q", 2, 1, 1).unwrap();
        let mut p = Perturbation::new(&mut core).unwrap();
        let geom = core.geometry(0);
        p.initialize_fields(&mut core, 0, &geom).unwrap();
        core
    }

    fn values(core: &SimCore) -> Vec<(IntVect, f64)> {
        let id = core.repo().require("q").unwrap();
        let arr = core.repo().level(id, TimeState::New, 0).unwrap();
        let mut out = Vec::new();
        arr.for_each_valid(1, |iv, v| out.push((iv, v)));
        out.sort_by_key(|(iv, _)| *iv);
        out
    }

    #[test]
    fn independent_of_box_decomposition() {
        assert_eq!(values(&perturbed(8, 7)), values(&perturbed(2, 7)));
    }

    #[test]
    fn bounded_by_amplitude_and_seed_dependent() {
        let a = values(&perturbed(4, 1));
        assert!(a.iter().all(|(_, v)| v.abs() <= 0.5));
        assert!(a.iter().any(|(_, v)| *v != 0.0));
        assert_ne!(a, values(&perturbed(4, 2)));
    }

    #[test]
    fn sample_matches_applied_value() {
        let core = perturbed(4, 3);
        let p = Perturbation::new(&mut perturbed(4, 3)).unwrap();
        let id = core.repo().require("q").unwrap();
        let arr = core.repo().level(id, TimeState::New, 0).unwrap();
        assert_eq!(arr.value_at([5, 1, 6], 1), Some(p.sample(0, [5, 1, 6], 1)));
    }
}
