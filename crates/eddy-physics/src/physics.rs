//! The [`Physics`] trait, lifecycle phases and the physics registry category.

use std::any::Any;
use std::fmt;

use eddy_core::{Category, FieldError, Geometry};
use eddy_field::SimCore;

/// A physics module driven through the simulation lifecycle.
///
/// Physics modules set initial conditions, apply forcing and keep
/// derived quantities consistent. They never advance a PDE themselves;
/// they read and write fields through the [`SimCore`] they are handed.
///
/// # Contract
///
/// - Every active instance receives every phase, in registration order.
///   Optional hooks default to no-ops so the call sequence is uniform.
/// - [`post_regrid_actions`](Self::post_regrid_actions) must rebuild any
///   cached state sized to the number of levels.
/// - Hooks must issue the same collective reductions on every rank.
///
/// # Object safety
///
/// This trait is object-safe; instances are stored as `Box<dyn Physics>`.
pub trait Physics: Any + Send {
    /// After PDEs and physics are constructed, before any level exists.
    fn pre_init_actions(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        Ok(())
    }

    /// Set initial values on level `lev`.
    ///
    /// Called for every level at start-up and for every level a regrid
    /// creates.
    fn initialize_fields(
        &mut self,
        core: &mut SimCore,
        lev: usize,
        geom: &Geometry,
    ) -> Result<(), FieldError>;

    /// Once, after every level has been initialized.
    fn post_init_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError>;

    /// After every regrid.
    fn post_regrid_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError>;

    /// Once per timestep, before any PDE update.
    fn pre_advance_work(&mut self, core: &mut SimCore) -> Result<(), FieldError>;

    /// Once per timestep, before the predictor.
    fn pre_predictor_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        Ok(())
    }

    /// Before each pressure projection.
    fn pre_pressure_correction_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        Ok(())
    }

    /// After each pressure projection.
    fn post_pressure_correction_work(&mut self, _core: &mut SimCore) -> Result<(), FieldError> {
        Ok(())
    }

    /// Once per timestep, after every PDE update and projection.
    fn post_advance_work(&mut self, core: &mut SimCore) -> Result<(), FieldError>;
}

impl dyn Physics {
    /// Downcast to a concrete physics type.
    pub fn downcast_ref<T: Physics>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    /// Mutable downcast to a concrete physics type.
    pub fn downcast_mut<T: Physics>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}

/// Registry category of physics modules.
#[derive(Debug)]
pub struct PhysicsCategory;

impl Category for PhysicsCategory {
    const BASE_IDENTIFIER: &'static str = "Physics";
    type Product = dyn Physics;
    type Context = SimCore;

    fn as_any(product: &dyn Physics) -> &dyn Any {
        product
    }

    fn as_any_mut(product: &mut dyn Physics) -> &mut dyn Any {
        product
    }
}

/// One lifecycle phase, in the order the driver runs them.
///
/// Within a timestep the order is `PreAdvance`, `PrePredictor`, then
/// `PrePressureCorrection`/`PostPressureCorrection` once per projection,
/// then `PostAdvance`. `PostRegrid` runs only between timesteps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// [`Physics::pre_init_actions`].
    PreInit,
    /// [`Physics::initialize_fields`] on every level.
    InitializeFields,
    /// [`Physics::post_init_actions`].
    PostInit,
    /// [`Physics::post_regrid_actions`].
    PostRegrid,
    /// [`Physics::pre_advance_work`].
    PreAdvance,
    /// [`Physics::pre_predictor_work`].
    PrePredictor,
    /// [`Physics::pre_pressure_correction_work`].
    PrePressureCorrection,
    /// [`Physics::post_pressure_correction_work`].
    PostPressureCorrection,
    /// [`Physics::post_advance_work`].
    PostAdvance,
}

impl Phase {
    /// Every phase, in lifecycle order.
    pub const ALL: [Phase; 9] = [
        Phase::PreInit,
        Phase::InitializeFields,
        Phase::PostInit,
        Phase::PostRegrid,
        Phase::PreAdvance,
        Phase::PrePredictor,
        Phase::PrePressureCorrection,
        Phase::PostPressureCorrection,
        Phase::PostAdvance,
    ];

    /// The hook name.
    pub fn name(self) -> &'static str {
        match self {
            Self::PreInit => "pre_init_actions",
            Self::InitializeFields => "initialize_fields",
            Self::PostInit => "post_init_actions",
            Self::PostRegrid => "post_regrid_actions",
            Self::PreAdvance => "pre_advance_work",
            Self::PrePredictor => "pre_predictor_work",
            Self::PrePressureCorrection => "pre_pressure_correction_work",
            Self::PostPressureCorrection => "post_pressure_correction_work",
            Self::PostAdvance => "post_advance_work",
        }
    }

    /// Run this phase's hook on one instance.
    pub fn dispatch(self, physics: &mut dyn Physics, core: &mut SimCore) -> Result<(), FieldError> {
        match self {
            Self::PreInit => physics.pre_init_actions(core),
            Self::InitializeFields => {
                for lev in 0..core.num_levels() {
                    let geom = core.geometry(lev);
                    physics.initialize_fields(core, lev, &geom)?;
                }
                Ok(())
            }
            Self::PostInit => physics.post_init_actions(core),
            Self::PostRegrid => physics.post_regrid_actions(core),
            Self::PreAdvance => physics.pre_advance_work(core),
            Self::PrePredictor => physics.pre_predictor_work(core),
            Self::PrePressureCorrection => physics.pre_pressure_correction_work(core),
            Self::PostPressureCorrection => physics.post_pressure_correction_work(core),
            Self::PostAdvance => physics.post_advance_work(core),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
