//! The shared simulation context modules are built with and run against.

use std::fmt;

use eddy_core::{FieldError, FieldId, Geometry, IntVect, ParamTable, StepId};
use eddy_mesh::{Collective, MeshEngine, MeshError, MeshLayout};

use crate::reduce::{field_max, field_min, field_probe};
use crate::repo::{FieldRepo, RegridReport};
use crate::state::TimeState;

/// The simulation clock.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimTime {
    /// Completed timesteps.
    pub step: StepId,
    /// Simulated time at the start of the current step.
    pub time: f64,
    /// Timestep size in use.
    pub dt: f64,
}

/// Field repository, mesh engine, parameters and clock of one simulation.
///
/// Physics and PDE constructors receive `&mut SimCore` so they can read
/// their parameters and declare their fields; lifecycle hooks receive it
/// again to read and write field data.
pub struct SimCore {
    repo: FieldRepo,
    mesh: Box<dyn MeshEngine>,
    params: ParamTable,
    time: SimTime,
}

impl SimCore {
    /// A core with an empty repository sized to `mesh`.
    pub fn new(mesh: Box<dyn MeshEngine>, params: ParamTable) -> Self {
        let repo = FieldRepo::new(mesh.as_ref());
        Self {
            repo,
            mesh,
            params,
            time: SimTime::default(),
        }
    }

    /// The field repository.
    pub fn repo(&self) -> &FieldRepo {
        &self.repo
    }

    /// Mutable field repository.
    pub fn repo_mut(&mut self) -> &mut FieldRepo {
        &mut self.repo
    }

    /// The mesh engine.
    pub fn mesh(&self) -> &dyn MeshEngine {
        self.mesh.as_ref()
    }

    /// Split borrow: mutable repository alongside the mesh engine.
    pub fn repo_and_mesh(&mut self) -> (&mut FieldRepo, &dyn MeshEngine) {
        (&mut self.repo, self.mesh.as_ref())
    }

    /// The collective reduction layer.
    pub fn collective(&self) -> &dyn Collective {
        self.mesh.collective()
    }

    /// Run-time parameters.
    pub fn params(&self) -> &ParamTable {
        &self.params
    }

    /// The simulation clock.
    pub fn time(&self) -> &SimTime {
        &self.time
    }

    /// Mutable simulation clock.
    pub fn time_mut(&mut self) -> &mut SimTime {
        &mut self.time
    }

    /// Number of active levels.
    pub fn num_levels(&self) -> usize {
        self.repo.num_active_levels()
    }

    /// Geometry of level `lev`.
    ///
    /// # Panics
    ///
    /// Panics if `lev >= num_levels()`.
    pub fn geometry(&self, lev: usize) -> Geometry {
        self.mesh.geometry(lev)
    }

    /// Fill the ghost cells of one state of a field on every level.
    pub fn fill_ghosts(&mut self, id: FieldId, state: TimeState, bc: &[f64]) -> Result<(), FieldError> {
        for lev in 0..self.repo.num_active_levels() {
            let array = self.repo.level_mut(id, state, lev)?;
            self.mesh.fill_boundary(lev, array, bc);
        }
        Ok(())
    }

    /// Apply a new hierarchy to the mesh and rebuild every field for it.
    ///
    /// On error nothing changes.
    pub fn regrid(&mut self, layout: MeshLayout) -> Result<RegridReport, MeshError> {
        self.mesh.apply_layout(layout)?;
        Ok(self.repo.regrid(self.mesh.as_ref()))
    }

    /// Global minimum of the current state of a named field.
    pub fn field_min(&self, name: &str, comp: usize) -> Result<f64, FieldError> {
        let view = self.repo.view(self.repo.require(name)?, TimeState::New)?;
        field_min(&view, self.collective(), comp)
    }

    /// Global maximum of the current state of a named field.
    pub fn field_max(&self, name: &str, comp: usize) -> Result<f64, FieldError> {
        let view = self.repo.view(self.repo.require(name)?, TimeState::New)?;
        field_max(&view, self.collective(), comp)
    }

    /// Point probe of the current state of a named field.
    pub fn field_probe(&self, name: &str, lev: usize, iv: IntVect, comp: usize) -> Result<f64, FieldError> {
        let view = self.repo.view(self.repo.require(name)?, TimeState::New)?;
        field_probe(&view, self.collective(), lev, iv, comp)
    }
}

impl fmt::Debug for SimCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimCore")
            .field("repo", &self.repo)
            .field("num_levels", &self.mesh.num_levels())
            .field("params", &self.params.len())
            .field("time", &self.time)
            .finish()
    }
}
