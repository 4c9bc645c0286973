//! Two-phase density closure from the volume fraction.

use tracing::debug;

use eddy_core::{FieldError, FieldId, Geometry, ParamError, Registered};
use eddy_equation::{declare_flow_fields, DENSITY};
use eddy_field::{SimCore, TimeState};

use crate::builtin::vof_sphere::VOF;
use crate::physics::Physics;

/// Keeps `density = vof * rho1 + (1 - vof) * rho2`.
///
/// The density is refreshed after initialization, after every regrid and
/// after every timestep. Requires the `vof` field of the VOF PDE.
///
/// Parameters: `MultiPhase.density_fluid1` (default 1000),
/// `MultiPhase.density_fluid2` (default 1).
#[derive(Clone, Debug, PartialEq)]
pub struct MultiPhase {
    vof: FieldId,
    density: FieldId,
    rho1: f64,
    rho2: f64,
}

impl MultiPhase {
    /// Look up `vof`, declare the flow fields and read the phase densities.
    pub fn new(core: &mut SimCore) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let Some(vof) = core.repo().field_id(VOF) else {
            return Err("MultiPhase needs an active VOF PDE".into());
        };
        let (_, density) = declare_flow_fields(core.repo_mut())?;
        let scope = core.params().scope("MultiPhase");
        let rho1 = scope.get_f64_or("density_fluid1", 1000.0)?;
        let rho2 = scope.get_f64_or("density_fluid2", 1.0)?;
        for (name, rho) in [("density_fluid1", rho1), ("density_fluid2", rho2)] {
            if !(rho > 0.0 && rho.is_finite()) {
                return Err(ParamError::Invalid {
                    key: scope.key(name),
                    reason: format!("must be finite and positive, got {rho}"),
                }
                .into());
            }
        }
        Ok(Self {
            vof,
            density,
            rho1,
            rho2,
        })
    }

    /// Density of the fluid where `vof == 1`.
    pub fn rho1(&self) -> f64 {
        self.rho1
    }

    /// Density of the fluid where `vof == 0`.
    pub fn rho2(&self) -> f64 {
        self.rho2
    }

    fn set_density_level(&self, core: &mut SimCore, lev: usize) -> Result<(), FieldError> {
        let (rho, vof) = core.repo_mut().level_pair_mut(
            (self.density, TimeState::New),
            (self.vof, TimeState::New),
            lev,
        )?;
        for (rb, vb) in rho.blocks_mut().iter_mut().zip(vof.blocks()) {
            for iv in rb.valid().cells() {
                let f = vb.get(iv, 0).unwrap_or(0.0).clamp(0.0, 1.0);
                rb.set(iv, 0, f * self.rho1 + (1.0 - f) * self.rho2);
            }
        }
        Ok(())
    }

    fn set_density(&self, core: &mut SimCore) -> Result<(), FieldError> {
        for lev in 0..core.num_levels() {
            self.set_density_level(core, lev)?;
        }
        debug!(field = DENSITY, "density updated from volume fraction");
        Ok(())
    }
}

impl Registered for MultiPhase {
    fn identifier() -> String {
        "MultiPhase".to_string()
    }
}

impl Physics for MultiPhase {
    fn initialize_fields(
        &mut self,
        core: &mut SimCore,
        lev: usize,
        _geom: &Geometry,
    ) -> Result<(), FieldError> {
        self.set_density_level(core, lev)
    }

    fn post_init_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.set_density(core)
    }

    fn post_regrid_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.set_density(core)
    }

    fn pre_advance_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        Ok(())
    }

    fn post_advance_work(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.set_density(core)
    }
}
