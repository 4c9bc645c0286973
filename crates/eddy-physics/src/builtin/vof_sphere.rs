//! Spherical droplet initial condition for the volume fraction.

use eddy_core::{FieldError, FieldId, Geometry, ParamError, Registered, SPACEDIM};
use eddy_field::{SimCore, TimeState};

use crate::physics::Physics;

/// Name of the volume-fraction field the VOF PDE declares.
pub const VOF: &str = "vof";

/// Fills `vof` with the volume fraction of a sphere.
///
/// Each cell is sampled on a regular sub-grid of `samples^3` points, so
/// interface cells get fractional values. Requires the `vof` field.
///
/// Parameters: `VofSphere.center` (3 reals), `VofSphere.radius`,
/// `VofSphere.samples` (default 2).
#[derive(Clone, Debug, PartialEq)]
pub struct VofSphere {
    vof: FieldId,
    center: [f64; 3],
    radius: f64,
    samples: u64,
}

impl VofSphere {
    /// Read the sphere description; fails if no `vof` field is declared.
    pub fn new(core: &mut SimCore) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let vof = core.repo().require(VOF)?;
        let scope = core.params().scope("VofSphere");
        let center = scope.get_f64_array("center")?;
        if center.len() != SPACEDIM {
            return Err(ParamError::Invalid {
                key: scope.key("center"),
                reason: format!("expected {SPACEDIM} coordinates, got {}", center.len()),
            }
            .into());
        }
        let radius = scope.get_f64("radius")?;
        if !(radius > 0.0) {
            return Err(ParamError::Invalid {
                key: scope.key("radius"),
                reason: format!("must be positive, got {radius}"),
            }
            .into());
        }
        let samples = scope.get_u64_or("samples", 2)?.max(1);
        Ok(Self {
            vof,
            center: [center[0], center[1], center[2]],
            radius,
            samples,
        })
    }

    /// Fraction of the cell with lower corner `lo` and size `dx` inside the sphere.
    fn fraction(&self, lo: [f64; 3], dx: [f64; 3]) -> f64 {
        let n = self.samples;
        let mut inside = 0u64;
        for a in 0..n {
            for b in 0..n {
                for c in 0..n {
                    let sub = [a, b, c];
                    let mut r2 = 0.0;
                    for d in 0..SPACEDIM {
                        let x = lo[d] + (sub[d] as f64 + 0.5) / n as f64 * dx[d];
                        r2 += (x - self.center[d]).powi(2);
                    }
                    if r2 <= self.radius * self.radius {
                        inside += 1;
                    }
                }
            }
        }
        inside as f64 / (n * n * n) as f64
    }
}

impl Registered for VofSphere {
    fn identifier() -> String {
        "VofSphere".to_string()
    }
}

impl Physics for VofSphere {
    fn initialize_fields(
        &mut self,
        core: &mut SimCore,
        lev: usize,
        geom: &Geometry,
    ) -> Result<(), FieldError> {
        let dx = geom.cell_sizes();
        let arr = core.repo_mut().level_mut(self.vof, TimeState::New, lev)?;
        arr.for_each_valid_mut(0, |iv, v| {
            let center = geom.cell_center(iv);
            let mut lo = [0.0; 3];
            for d in 0..SPACEDIM {
                lo[d] = center[d] - 0.5 * dx[d];
            }
            *v = self.fraction(lo, dx);
        });
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

    fn core_with(params: ParamTable) -> SimCore {
        let mesh = LocalMesh::new(MeshLayout::single_level(LevelLayout::chopped(
            Geometry::unit_cube(8),
            4,
        )))
        .unwrap();
        SimCore::new(Box::new(mesh), params)
    }

    #[test]
    fn needs_a_vof_field() {
        let mut core = core_with(ParamTable::new());
        let err = VofSphere::new(&mut core).unwrap_err();
        assert_eq!(err.to_string(), "no field named 'vof'");
    }

    #[test]
    fn sphere_fills_centre_and_leaves_corners_empty() {
        let params = ParamTable::new()
            .with("VofSphere.center", [0.5, 0.5, 0.5])
            .with("VofSphere.radius", 0.3);
        let mut core = core_with(params);
        core.repo_mut().declare_field(VOF, 1, 2, 2).unwrap();
        let mut sphere = VofSphere::new(&mut core).unwrap();
        let geom = core.geometry(0);
        sphere.initialize_fields(&mut core, 0, &geom).unwrap();

        assert_eq!(core.field_probe(VOF, 0, [3, 3, 3], 0).unwrap(), 1.0);
        assert_eq!(core.field_probe(VOF, 0, [0, 0, 0], 0).unwrap(), 0.0);
        assert_eq!(core.field_max(VOF, 0).unwrap(), 1.0);
        assert_eq!(core.field_min(VOF, 0).unwrap(), 0.0);
    }

    #[test]
    fn interface_cells_are_fractional() {
        let sphere = VofSphere {
            vof: FieldId(0),
            center: [0.0; 3],
            radius: 1.0,
            samples: 2,
        };
        // Unit cell with the sphere centred on its corner: the sub-points
        // with at most one coordinate at 0.75 are inside.
        let f = sphere.fraction([0.0; 3], [1.0; 3]);
        assert_eq!(f, 0.5);
    }
}
