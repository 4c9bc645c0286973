//! Uniform free-stream initial condition.

use smallvec::SmallVec;
use tracing::{debug, warn};

use eddy_core::{FieldError, Geometry, ParamError, Registered};
use eddy_equation::{declare_flow_fields, DENSITY, VELOCITY};
use eddy_field::{SimCore, TimeState};

use crate::physics::Physics;

/// Sets velocity, density and any listed scalars to uniform values.
///
/// Parameters:
/// - `flow.velocity` (3 reals, default zero), `flow.density` (default 1).
/// - `FreeStream.fields` and `FreeStream.values`: extra scalars and their
///   values, in matching order.
#[derive(Clone, Debug, PartialEq)]
pub struct FreeStream {
    velocity: [f64; 3],
    density: f64,
    scalars: SmallVec<[(String, f64); 4]>,
}

impl FreeStream {
    /// Read the free-stream state and declare the flow fields.
    pub fn new(core: &mut SimCore) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        declare_flow_fields(core.repo_mut())?;
        let flow = core.params().scope("flow");
        if !flow.contains("velocity") {
            warn!(key = %flow.key("velocity"), "no free-stream velocity given, using 0");
        }
        let u = flow.get_f64_array_or("velocity", &[0.0, 0.0, 0.0])?;
        if u.len() != 3 {
            return Err(ParamError::Invalid {
                key: flow.key("velocity"),
                reason: format!("expected 3 components, got {}", u.len()),
            }
            .into());
        }
        let density = flow.get_f64_or("density", 1.0)?;

        let scope = core.params().scope("FreeStream");
        let names = scope.get_str_array_or_empty("fields")?;
        let values = scope.get_f64_array_or("values", &[])?;
        if names.len() != values.len() {
            return Err(ParamError::Invalid {
                key: scope.key("values"),
                reason: format!("{} values for {} fields", values.len(), names.len()),
            }
            .into());
        }
        Ok(Self {
            velocity: [u[0], u[1], u[2]],
            density,
            scalars: names.into_iter().zip(values).collect(),
        })
    }

    /// The free-stream velocity.
    pub fn velocity(&self) -> [f64; 3] {
        self.velocity
    }

    /// The free-stream density.
    pub fn density(&self) -> f64 {
        self.density
    }
}

impl Registered for FreeStream {
    fn identifier() -> String {
        "FreeStream".to_string()
    }
}

impl Physics for FreeStream {
    fn initialize_fields(
        &mut self,
        core: &mut SimCore,
        lev: usize,
        _geom: &Geometry,
    ) -> Result<(), FieldError> {
        let repo = core.repo_mut();
        let velocity = repo.require(VELOCITY)?;
        let arr = repo.level_mut(velocity, TimeState::New, lev)?;
        for (d, u) in self.velocity.iter().enumerate() {
            arr.fill_comp(d, *u);
        }
        let density = repo.require(DENSITY)?;
        repo.level_mut(density, TimeState::New, lev)?.fill(self.density);
        for (name, value) in &self.scalars {
            let id = repo.require(name)?;
            repo.level_mut(id, TimeState::New, lev)?.fill(*value);
        }
        debug!(lev, scalars = self.scalars.len(), "free-stream initialized level");
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
            Geometry::unit_cube(4),
            2,
        )))
        .unwrap();
        SimCore::new(Box::new(mesh), params)
    }

    #[test]
    fn fills_flow_and_scalars() {
        let params = ParamTable::new()
            .with("flow.velocity", [1.0, 2.0, 3.0])
            .with("flow.density", 1.5)
            .with("FreeStream.fields", ["tracer"])
            .with("FreeStream.values", [0.25]);
        let mut core = core_with(params);
        core.repo_mut().declare_field("tracer", 1, 1, 1).unwrap();
        let mut fs = FreeStream::new(&mut core).unwrap();
        let geom = core.geometry(0);
        fs.initialize_fields(&mut core, 0, &geom).unwrap();

        assert_eq!(core.field_min("velocity", 2).unwrap(), 3.0);
        assert_eq!(core.field_max("density", 0).unwrap(), 1.5);
        assert_eq!(core.field_probe("tracer", 0, [3, 0, 1], 0).unwrap(), 0.25);
    }

    #[test]
    fn mismatched_scalar_lists_are_rejected() {
        let params = ParamTable::new()
            .with("FreeStream.fields", ["a", "b"])
            .with("FreeStream.values", [1.0]);
        let mut core = core_with(params);
        let err = FreeStream::new(&mut core).unwrap_err();
        assert!(err.to_string().contains("FreeStream.values"));
    }

    #[test]
    fn unknown_scalar_fails_at_initialization() {
        let params = ParamTable::new()
            .with("FreeStream.fields", ["missing"])
            .with("FreeStream.values", [1.0]);
        let mut core = core_with(params);
        let mut fs = FreeStream::new(&mut core).unwrap();
        let geom = core.geometry(0);
        assert_eq!(
            fs.initialize_fields(&mut core, 0, &geom),
            Err(FieldError::UnknownField {
                name: "missing".to_string()
            })
        );
    }
}
