//! Source terms and their registry category.
//!
//! A PDE lists its source terms under `"<PDE_NAME>.source_terms"`. Each one
//! is constructed from the source registry and adds its contribution to
//! the PDE's `<var>_src_term` accumulator before the update.

use std::any::Any;

use tracing::warn;

use eddy_core::{
    Category, ConstructResult, FieldError, FieldId, ParamError, Registered, RegistryBuilder,
    RegistryError,
};
use eddy_field::{SimCore, TimeState};
use eddy_mesh::LevelArray;

/// The quantity a source term is being evaluated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceInput {
    /// The transported field.
    pub field: FieldId,
    /// The state the current stage evaluates on.
    pub state: TimeState,
}

/// A contribution to the right-hand side of one PDE.
pub trait SourceTerm: Any + Send {
    /// Add this term on level `lev` into `src`, which has the transported
    /// field's components and this rank's boxes.
    fn add_to(
        &self,
        core: &SimCore,
        input: SourceInput,
        lev: usize,
        src: &mut LevelArray,
    ) -> Result<(), FieldError>;
}

impl dyn SourceTerm {
    /// Downcast to a concrete source type.
    pub fn downcast_ref<T: SourceTerm>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}

/// Registry category of source terms.
#[derive(Debug)]
pub struct SourceCategory;

impl Category for SourceCategory {
    const BASE_IDENTIFIER: &'static str = "SourceTerm";
    type Product = dyn SourceTerm;
    type Context = SimCore;

    fn as_any(product: &dyn SourceTerm) -> &dyn Any {
        product
    }

    fn as_any_mut(product: &mut dyn SourceTerm) -> &mut dyn Any {
        product
    }
}

fn per_comp(values: &[f64], comp: usize) -> f64 {
    values
        .get(comp)
        .or_else(|| values.last())
        .copied()
        .unwrap_or(0.0)
}

/// A spatially uniform forcing.
///
/// Reads `ConstantSource.value`, one entry per component or a single
/// value for all of them.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstantSource {
    value: Vec<f64>,
}

impl ConstantSource {
    /// Build from the run-time parameters.
    pub fn new(core: &SimCore) -> Result<Self, ParamError> {
        let scope = core.params().scope("ConstantSource");
        if !scope.contains("value") {
            warn!(key = %scope.key("value"), "no source value given, using 0");
        }
        Ok(Self {
            value: scope.get_f64_array_or("value", &[0.0])?,
        })
    }

    /// The configured value per component.
    pub fn value(&self) -> &[f64] {
        &self.value
    }
}

impl Registered for ConstantSource {
    fn identifier() -> String {
        "ConstantSource".to_string()
    }
}

impl SourceTerm for ConstantSource {
    fn add_to(
        &self,
        _core: &SimCore,
        _input: SourceInput,
        _lev: usize,
        src: &mut LevelArray,
    ) -> Result<(), FieldError> {
        for comp in 0..src.ncomp() {
            let v = per_comp(&self.value, comp);
            src.for_each_valid_mut(comp, |_, s| *s += v);
        }
        Ok(())
    }
}

/// Linear relaxation towards a target: `rate * (target - q)`.
///
/// Reads `Relaxation.target` (per component or single) and
/// `Relaxation.rate` in inverse time units.
#[derive(Clone, Debug, PartialEq)]
pub struct Relaxation {
    target: Vec<f64>,
    rate: f64,
}

impl Relaxation {
    /// Build from the run-time parameters.
    pub fn new(core: &SimCore) -> Result<Self, ParamError> {
        let scope = core.params().scope("Relaxation");
        let target = scope.get_f64_array("target")?;
        let rate = scope.get_f64("rate")?;
        if !(rate >= 0.0 && rate.is_finite()) {
            return Err(ParamError::Invalid {
                key: scope.key("rate"),
                reason: format!("must be finite and non-negative, got {rate}"),
            });
        }
        Ok(Self { target, rate })
    }
}

impl Registered for Relaxation {
    fn identifier() -> String {
        "Relaxation".to_string()
    }
}

impl SourceTerm for Relaxation {
    fn add_to(
        &self,
        core: &SimCore,
        input: SourceInput,
        lev: usize,
        src: &mut LevelArray,
    ) -> Result<(), FieldError> {
        let q = core.repo().level(input.field, input.state, lev)?;
        for comp in 0..src.ncomp() {
            let target = per_comp(&self.target, comp);
            for (block, qb) in src.blocks_mut().iter_mut().zip(q.blocks()) {
                for iv in block.valid().cells() {
                    let current = qb.get(iv, comp).unwrap_or(target);
                    if let Some(s) = block.get_mut(iv, comp) {
                        *s += self.rate * (target - current);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Register [`ConstantSource`] and [`Relaxation`].
pub fn register_builtin_sources(
    builder: &mut RegistryBuilder<SourceCategory>,
) -> Result<(), RegistryError> {
    builder.register_type::<ConstantSource, _>(|core: &mut SimCore| -> ConstructResult<dyn SourceTerm> {
        Ok(Box::new(ConstantSource::new(core)?))
    })?;
    builder.register_type::<Relaxation, _>(|core: &mut SimCore| -> ConstructResult<dyn SourceTerm> {
        Ok(Box::new(Relaxation::new(core)?))
    })?;
    Ok(())
}
