//! The [`Pde`] trait, PDE trait bundles and the PDE registry category.

use std::any::Any;

use eddy_core::{Category, FieldError, Registry, RegistryError};
use eddy_field::{SimCore, TimeState};

use crate::fields::PdeFields;
use crate::source::SourceCategory;

/// Compile-time description of one transported quantity.
///
/// Behavioural differences between PDEs are expressed only through these
/// values; the update algorithm itself is shared.
pub trait PdeTraits: Send + 'static {
    /// PDE name, used as the registry prefix and parameter namespace.
    const PDE_NAME: &'static str;
    /// Name of the transported field.
    const VAR_NAME: &'static str;
    /// Components of the transported field.
    const NCOMP: usize = 1;
    /// Ghost width of the transported field.
    const NGHOST: usize = 2;
    /// Time states retained by the transported field.
    const NUM_STATES: usize = 2;
    /// Whether the advective form transports `rho * q` rather than `q`.
    const MULTIPLY_RHO: bool;
    /// Whether the equation has a diffusive term.
    const HAS_DIFFUSION: bool;
    /// Value ghost cells take outside the physical domain.
    const DEFAULT_BC_VALUE: f64;
}

/// Sub-step of a timestep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// First sub-step: terms are evaluated on the `Old` state.
    Predictor,
    /// Second sub-step: terms are evaluated on the predicted `New` state.
    Corrector,
}

impl Stage {
    /// The time state the stage evaluates its terms on.
    pub fn state(self) -> TimeState {
        match self {
            Self::Predictor => TimeState::Old,
            Self::Corrector => TimeState::New,
        }
    }

    /// Lower-case name for logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Predictor => "predictor",
            Self::Corrector => "corrector",
        }
    }
}

/// A PDE instance bound to the fields of one simulation.
///
/// # Contract
///
/// - Hooks receive the shared [`SimCore`]; a PDE touches only the fields
///   in its [`PdeFields`] plus the flow fields it reads.
/// - Every hook has a body; the manager broadcasts each hook to every
///   active PDE without special cases.
///
/// # Object safety
///
/// This trait is object-safe; PDEs are stored as `Box<dyn Pde>`.
pub trait Pde: Any + Send {
    /// PDE name, e.g. `"VOF"`.
    fn pde_name(&self) -> &str;

    /// The fields this PDE declared.
    fn fields(&self) -> &PdeFields;

    /// Whether advection and sources are density-weighted.
    fn multiply_rho(&self) -> bool;

    /// Whether the equation diffuses.
    fn has_diffusion(&self) -> bool;

    /// Boundary value of the transported field.
    fn default_bc_value(&self) -> f64;

    /// Prepare auxiliary data on a level that was just initialized.
    fn initialize(&mut self, core: &mut SimCore, lev: usize) -> Result<(), FieldError>;

    /// After every level has been initialized.
    fn post_init_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError>;

    /// After a regrid has rebuilt every field.
    fn post_regrid_actions(&mut self, core: &mut SimCore) -> Result<(), FieldError>;

    /// Once per timestep, after the time states were shifted.
    fn pre_advance_work(&mut self, core: &mut SimCore) -> Result<(), FieldError>;

    /// Fill the ghost cells of one state of the transported field.
    fn fillpatch(&mut self, core: &mut SimCore, state: TimeState) -> Result<(), FieldError>;

    /// Write the advective term of `stage` into the convective-term field.
    fn compute_advection_term(&mut self, core: &mut SimCore, stage: Stage) -> Result<(), FieldError>;

    /// Write the diffusive term of `stage`. A no-op without diffusion.
    fn compute_diffusion_term(&mut self, core: &mut SimCore, stage: Stage) -> Result<(), FieldError>;

    /// Accumulate every attached source term, density-weighted iff
    /// [`multiply_rho`](Self::multiply_rho).
    fn compute_source_term(&mut self, core: &mut SimCore, stage: Stage) -> Result<(), FieldError>;

    /// Advance the transported field by one stage of size `dt`.
    fn apply_update(&mut self, core: &mut SimCore, stage: Stage, dt: f64) -> Result<(), FieldError>;

    /// Construct a source term by name and attach it to this PDE.
    fn add_source_term(
        &mut self,
        registry: &Registry<SourceCategory>,
        identifier: &str,
        core: &mut SimCore,
    ) -> Result<(), RegistryError>;

    /// Identifiers of the attached source terms, in attachment order.
    fn source_terms(&self) -> Vec<&str>;

    /// Largest stable timestep for a unit CFL number.
    ///
    /// Issues one collective reduction per level on every rank, after
    /// every field lookup has succeeded.
    fn max_stable_dt(&self, core: &SimCore) -> Result<f64, FieldError>;

    /// Run one full stage: ghost fill, all terms, then the update.
    fn advance_stage(&mut self, core: &mut SimCore, stage: Stage, dt: f64) -> Result<(), FieldError> {
        self.fillpatch(core, stage.state())?;
        self.compute_advection_term(core, stage)?;
        self.compute_diffusion_term(core, stage)?;
        self.compute_source_term(core, stage)?;
        self.apply_update(core, stage, dt)
    }
}

impl dyn Pde {
    /// Downcast to a concrete PDE type.
    pub fn downcast_ref<T: Pde>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }

    /// Mutable downcast to a concrete PDE type.
    pub fn downcast_mut<T: Pde>(&mut self) -> Option<&mut T> {
        (self as &mut dyn Any).downcast_mut::<T>()
    }
}

/// Registry category of PDEs.
#[derive(Debug)]
pub struct PdeCategory;

impl Category for PdeCategory {
    const BASE_IDENTIFIER: &'static str = "PDE";
    type Product = dyn Pde;
    type Context = SimCore;

    fn as_any(product: &dyn Pde) -> &dyn Any {
        product
    }

    fn as_any_mut(product: &mut dyn Pde) -> &mut dyn Any {
        product
    }
}
