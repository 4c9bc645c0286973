//! Built-in PDE kinds and the shared flow fields.

use eddy_core::{FieldError, FieldId};
use eddy_field::FieldRepo;

use crate::pde::PdeTraits;

/// Name of the flow velocity field (3 components).
pub const VELOCITY: &str = "velocity";
/// Name of the fluid density field.
pub const DENSITY: &str = "density";
/// Name of the pressure field.
pub const PRESSURE: &str = "pressure";

/// Declare velocity, density and pressure.
///
/// Every PDE and physics that reads the flow state calls this; repeated
/// declarations return the same IDs.
pub fn declare_flow_fields(repo: &mut FieldRepo) -> Result<(FieldId, FieldId), FieldError> {
    let velocity = repo.declare_field(VELOCITY, 3, 2, 2)?;
    let density = repo.declare_field(DENSITY, 1, 2, 2)?;
    repo.declare_field(PRESSURE, 1, 1, 1)?;
    Ok((velocity, density))
}

/// Volume-of-fluid indicator: plain advection, no density weighting.
#[derive(Debug)]
pub struct Vof;

impl PdeTraits for Vof {
    const PDE_NAME: &'static str = "VOF";
    const VAR_NAME: &'static str = "vof";
    const MULTIPLY_RHO: bool = false;
    const HAS_DIFFUSION: bool = false;
    const DEFAULT_BC_VALUE: f64 = 1.0;
}

/// Mass conservation for a variable-density flow.
#[derive(Debug)]
pub struct Density;

impl PdeTraits for Density {
    const PDE_NAME: &'static str = "Density";
    const VAR_NAME: &'static str = DENSITY;
    const MULTIPLY_RHO: bool = false;
    const HAS_DIFFUSION: bool = false;
    const DEFAULT_BC_VALUE: f64 = 1.0;
}

/// Temperature transport with conduction.
#[derive(Debug)]
pub struct Temperature;

impl PdeTraits for Temperature {
    const PDE_NAME: &'static str = "Temperature";
    const VAR_NAME: &'static str = "temperature";
    const MULTIPLY_RHO: bool = true;
    const HAS_DIFFUSION: bool = true;
    const DEFAULT_BC_VALUE: f64 = 300.0;
}
