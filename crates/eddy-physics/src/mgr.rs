//! Owner of the active physics modules.

use tracing::{debug, trace};

use eddy_core::{CollectionMgr, FieldError, Registered, Registry, RegistryError};
use eddy_field::SimCore;

use crate::physics::{Phase, Physics, PhysicsCategory};

/// The active physics modules of one simulation, in registration order.
#[derive(Debug, Default)]
pub struct PhysicsMgr {
    physics: CollectionMgr<PhysicsCategory>,
}

impl PhysicsMgr {
    /// No active physics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct the physics registered under `identifier` and activate it.
    pub fn add(
        &mut self,
        registry: &Registry<PhysicsCategory>,
        identifier: &str,
        core: &mut SimCore,
    ) -> Result<&mut dyn Physics, RegistryError> {
        let physics = self.physics.add(registry, identifier, core)?;
        debug!(physics = identifier, "activated physics");
        Ok(physics)
    }

    /// Activate an already-constructed instance.
    pub fn insert(
        &mut self,
        identifier: impl Into<String>,
        physics: Box<dyn Physics>,
    ) -> Result<&mut dyn Physics, RegistryError> {
        self.physics.insert(identifier, physics)
    }

    /// Whether a physics is active under `identifier`.
    pub fn contains(&self, identifier: &str) -> bool {
        self.physics.contains(identifier)
    }

    /// The active physics of concrete type `T`.
    ///
    /// # Panics
    ///
    /// Panics if no `T` is active, naming the identifier and the type.
    #[track_caller]
    pub fn get<T: Physics + Registered>(&self) -> &T {
        self.physics.get::<T>()
    }

    /// Mutable counterpart of [`get`](Self::get).
    #[track_caller]
    pub fn get_mut<T: Physics + Registered>(&mut self) -> &mut T {
        self.physics.get_mut::<T>()
    }

    /// The active physics of concrete type `T`, if any.
    pub fn try_get<T: Physics + Registered>(&self) -> Option<&T> {
        self.physics.try_get::<T>()
    }

    /// Identifiers of the active physics, in registration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.physics.identifiers()
    }

    /// Number of active physics.
    pub fn len(&self) -> usize {
        self.physics.len()
    }

    /// Whether no physics is active.
    pub fn is_empty(&self) -> bool {
        self.physics.is_empty()
    }

    /// Run `phase` on every active instance, in registration order.
    ///
    /// Stops at the first error.
    pub fn broadcast(&mut self, phase: Phase, core: &mut SimCore) -> Result<(), FieldError> {
        for (id, physics) in self.physics.iter_mut() {
            trace!(physics = id, %phase, "physics hook");
            phase.dispatch(physics, core)?;
        }
        debug!(%phase, count = self.physics.len(), "broadcast physics phase");
        Ok(())
    }

    /// [`Physics::initialize_fields`] on one level, for a level created by
    /// a regrid.
    pub fn initialize_level(&mut self, core: &mut SimCore, lev: usize) -> Result<(), FieldError> {
        let geom = core.geometry(lev);
        for (id, physics) in self.physics.iter_mut() {
            trace!(physics = id, lev, "initialize_fields");
            physics.initialize_fields(core, lev, &geom)?;
        }
        Ok(())
    }
}
