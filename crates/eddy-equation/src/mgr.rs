//! Owner of the active PDEs.

use tracing::{debug, trace};

use eddy_core::{CollectionMgr, FieldError, Registered, Registry, RegistryError};
use eddy_field::SimCore;

use crate::pde::{Pde, PdeCategory, Stage};
use crate::source::SourceCategory;

/// The active PDEs of one simulation, in registration order.
///
/// Every broadcast visits the PDEs in the order they were added and stops
/// at the first error.
#[derive(Debug, Default)]
pub struct PdeMgr {
    pdes: CollectionMgr<PdeCategory>,
}

impl PdeMgr {
    /// No active PDEs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct the PDE registered under `identifier` and activate it.
    pub fn add(
        &mut self,
        registry: &Registry<PdeCategory>,
        identifier: &str,
        core: &mut SimCore,
    ) -> Result<&mut dyn Pde, RegistryError> {
        let pde = self.pdes.add(registry, identifier, core)?;
        debug!(pde = identifier, "activated PDE");
        Ok(pde)
    }

    /// Attach a source term to the active PDE `pde`.
    pub fn add_source_term(
        &mut self,
        pde: &str,
        registry: &Registry<SourceCategory>,
        source: &str,
        core: &mut SimCore,
    ) -> Result<(), RegistryError> {
        let available = self.pdes.identifiers().map(str::to_string).collect();
        let Some(target) = self.pdes.by_identifier_mut(pde) else {
            return Err(RegistryError::UnknownIdentifier {
                category: "PDE",
                identifier: pde.to_string(),
                available,
            });
        };
        target.add_source_term(registry, source, core)
    }

    /// Whether a PDE is active under `identifier`.
    pub fn contains(&self, identifier: &str) -> bool {
        self.pdes.contains(identifier)
    }

    /// The active PDE of concrete type `T`.
    ///
    /// # Panics
    ///
    /// Panics if no `T` is active.
    #[track_caller]
    pub fn get<T: Pde + Registered>(&self) -> &T {
        self.pdes.get::<T>()
    }

    /// Mutable counterpart of [`get`](Self::get).
    #[track_caller]
    pub fn get_mut<T: Pde + Registered>(&mut self) -> &mut T {
        self.pdes.get_mut::<T>()
    }

    /// The active PDE of concrete type `T`, if any.
    pub fn try_get<T: Pde + Registered>(&self) -> Option<&T> {
        self.pdes.try_get::<T>()
    }

    /// The active PDE under `identifier`.
    pub fn by_identifier(&self, identifier: &str) -> Option<&dyn Pde> {
        self.pdes.by_identifier(identifier)
    }

    /// Number of active PDEs.
    pub fn len(&self) -> usize {
        self.pdes.len()
    }

    /// Whether no PDE is active.
    pub fn is_empty(&self) -> bool {
        self.pdes.is_empty()
    }

    /// Identifiers of the active PDEs, in registration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.pdes.identifiers()
    }

    /// Active PDEs with their identifiers, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Pde)> {
        self.pdes.iter()
    }

    fn broadcast<F>(&mut self, hook: &'static str, mut f: F) -> Result<(), FieldError>
    where
        F: FnMut(&mut dyn Pde) -> Result<(), FieldError>,
    {
        for (id, pde) in self.pdes.iter_mut() {
            trace!(pde = id, hook, "pde hook");
            f(pde)?;
        }
        Ok(())
    }

    /// [`Pde::initialize`] on level `lev` for every PDE.
    pub fn initialize(&mut self, core: &mut SimCore, lev: usize) -> Result<(), FieldError> {
        self.broadcast("initialize", |p| p.initialize(core, lev))
    }

    /// [`Pde::post_init_actions`] for every PDE.
    pub fn post_init_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.broadcast("post_init_actions", |p| p.post_init_actions(core))
    }

    /// [`Pde::post_regrid_actions`] for every PDE.
    pub fn post_regrid_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.broadcast("post_regrid_actions", |p| p.post_regrid_actions(core))
    }

    /// [`Pde::pre_advance_work`] for every PDE.
    pub fn pre_advance_work(&mut self, core: &mut SimCore) -> Result<(), FieldError> {
        self.broadcast("pre_advance_work", |p| p.pre_advance_work(core))
    }

    /// Run `stage` of every PDE.
    pub fn advance_stage(&mut self, core: &mut SimCore, stage: Stage, dt: f64) -> Result<(), FieldError> {
        self.broadcast(stage.name(), |p| p.advance_stage(core, stage, dt))
    }

    /// The most restrictive stable timestep over every PDE.
    ///
    /// `INFINITY` with no active PDEs.
    pub fn max_stable_dt(&self, core: &SimCore) -> Result<f64, FieldError> {
        let mut dt = f64::INFINITY;
        for (_, p) in self.pdes.iter() {
            dt = dt.min(p.max_stable_dt(core)?);
        }
        Ok(dt)
    }
}
